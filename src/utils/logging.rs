//! Logger bootstrap plus conditional logging macros gated on a module-level
//! `ENABLE_LOGS` flag.
//!
//! Frame-rate code (the scan loop, guidance frame processing) logs through
//! these macros so a module can be silenced without touching `RUST_LOG`:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("This will log if ENABLE_LOGS is true");
//! ```

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize `env_logger` (reads `RUST_LOG`, defaults to Info).
///
/// Safe to call from every host entry point; only the first call installs
/// the logger.
pub fn init_logging() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let result = env_logger::Builder::from_env(env).try_init();
        if result.is_err() {
            // Host already installed a logger
            log::debug!("logger already initialized by host");
        }
    });
}

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Macro for conditional error logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
