use std::ffi::OsStr;
use std::sync::{Arc, Mutex};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "process_scan";

use crate::{log_debug, log_warn};

/// Answers "is this application running" from the process table.
///
/// Unlike asking the application itself, this needs no automation
/// permission and can never launch the app.
#[derive(Clone)]
pub struct ProcessScanner {
    system: Arc<Mutex<System>>,
    own_pid: u32,
}

impl ProcessScanner {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            own_pid: std::process::id(),
        }
    }

    /// Blocking: refreshes the process list. Call from `spawn_blocking`.
    pub fn is_running_blocking(&self, process_name: &str) -> bool {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Names only; CPU and memory sampling is not needed here.
        system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::new());

        let wanted = OsStr::new(process_name);
        let found = system
            .processes()
            .iter()
            .any(|(pid, process)| pid.as_u32() != self.own_pid && process.name() == wanted);

        log_debug!(
            "{process_name} running={found} (scanned {} processes)",
            system.processes().len()
        );
        found
    }

    pub async fn is_running(&self, process_name: &str) -> bool {
        let scanner = self.clone();
        let name = process_name.to_string();
        match tokio::task::spawn_blocking(move || scanner.is_running_blocking(&name)).await {
            Ok(found) => found,
            Err(err) => {
                log_warn!("process scan worker failed: {err}");
                false
            }
        }
    }
}

impl Default for ProcessScanner {
    fn default() -> Self {
        Self::new()
    }
}
