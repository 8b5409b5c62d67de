//! Module-gated, tag-prefixed logging macros.
//!
//! Every module that logs through these macros defines two consts:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! const LOG_TAG: &str = "media_watcher";
//! ```
//! Lines come out as `[media_watcher] message`, so a single `RUST_LOG` level
//! can still be narrowed by grepping the tag.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Errors are never gated: a module that silences its chatter still reports
/// failures.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!("[{}] {}", LOG_TAG, format_args!($($arg)*));
    };
}
