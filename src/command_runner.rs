//! External process execution.
//!
//! Both the dock preference reader and the scripting bridge go through the
//! `CommandRunner` trait so their parsing logic can be exercised with a
//! scripted fake instead of real macOS tooling.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{PollError, PollResult};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "command_runner";

use crate::log_debug;

/// Marker osascript prints when the user has not granted automation access
/// (errAEEventNotPermitted).
const AUTOMATION_DENIED_CODE: &str = "(-1743)";
const AUTOMATION_DENIED_TEXT: &str = "Not authorized to send Apple events";

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `program` to completion and returns its trimmed stdout.
    ///
    /// Fails with `Network` when the process cannot start or outlives
    /// `timeout`, `PermissionDenied` when it reports an automation denial,
    /// `Decode` for non UTF-8 output and `NoData` for empty output or any
    /// other non-zero exit.
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> PollResult<String>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> PollResult<String> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must not leave the process behind.
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| PollError::Network(format!("failed to start {program}: {err}")))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(PollError::Network(format!("{program} did not complete: {err}")))
            }
            Err(_) => {
                return Err(PollError::Network(format!(
                    "{program} timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log_debug!(
                "{program} exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
            return Err(classify_failure(&stderr));
        }

        decode_stdout(output.stdout)
    }
}

fn classify_failure(stderr: &str) -> PollError {
    if stderr.contains(AUTOMATION_DENIED_CODE) || stderr.contains(AUTOMATION_DENIED_TEXT) {
        PollError::PermissionDenied
    } else {
        PollError::NoData
    }
}

fn decode_stdout(stdout: Vec<u8>) -> PollResult<String> {
    let text = String::from_utf8(stdout)
        .map_err(|err| PollError::Decode(format!("process output is not UTF-8: {err}")))?;
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return Err(PollError::NoData);
    }
    Ok(trimmed.to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission_denied() {
        let stderr = "0:42: execution error: Not authorized to send Apple events to Music. (-1743)";
        assert_eq!(classify_failure(stderr), PollError::PermissionDenied);
        assert_eq!(
            classify_failure("The domain/default pair of (com.apple.dock, tilesize) does not exist"),
            PollError::NoData
        );
    }

    #[test]
    fn test_decode_trims_trailing_whitespace_only() {
        assert_eq!(decode_stdout(b"  48\n\n".to_vec()).unwrap(), "  48");
        assert_eq!(decode_stdout(b" \n\t".to_vec()), Err(PollError::NoData));
        assert!(matches!(
            decode_stdout(vec![0xff, 0xfe]),
            Err(PollError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_network_error() {
        let result = SystemCommandRunner
            .run(
                "/definitely/not/a/real/binary",
                &[],
                Duration::from_secs(1),
            )
            .await;
        assert!(matches!(result, Err(PollError::Network(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout() {
        let result = SystemCommandRunner
            .run("echo", &["hello"], Duration::from_secs(5))
            .await;
        assert_eq!(result.unwrap(), "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let result = SystemCommandRunner
            .run("sleep", &["5"], Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(PollError::Network(msg)) if msg.contains("timed out")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_no_data() {
        let result = SystemCommandRunner
            .run("true", &[], Duration::from_secs(5))
            .await;
        assert_eq!(result, Err(PollError::NoData));
    }
}
