//! Conditional logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! Each module that logs through these macros defines two constants:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//! const LOG_TARGET: &str = "daytally::tracker";
//! ```
//! and then calls the macros exported at the crate root:
//! ```rust,ignore
//! use crate::{log_info, log_warn};
//!
//! log_info!("closed interval {id} for user {user_id}");
//! ```
//! Records are emitted under `LOG_TARGET`, so `RUST_LOG=daytally::tracker=debug`
//! narrows output to a single component.

/// Info-level record, emitted only when `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!(target: LOG_TARGET, $($arg)*);
        }
    };
}

/// Warn-level record, emitted only when `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!(target: LOG_TARGET, $($arg)*);
        }
    };
}

/// Error-level record. Errors are not gated: a storage failure is always reported.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!(target: LOG_TARGET, $($arg)*);
    };
}

/// Debug-level record for rejected input and other expected outcomes.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!(target: LOG_TARGET, $($arg)*);
        }
    };
}
