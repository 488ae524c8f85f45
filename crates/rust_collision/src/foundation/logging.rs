//! Logging utilities and structured logging support
//!
//! The library only emits through the `log` facade. Applications and tests
//! that want output call [`init`] (or [`try_init`]) once.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring the error if a logger is already installed
///
/// Useful from tests, where several test functions race to install the logger.
pub fn try_init() -> bool {
    env_logger::builder().is_test(true).try_init().is_ok()
}
