use tracing::{error, info, warn};

use crate::errors::WinlinkError;

/// `command` is the CLI subcommand (or host mode) being run.
pub fn log_app_startup(command: &str) {
    info!(
        event = "core.app.startup_completed",
        command = command,
        version = env!("CARGO_PKG_VERSION")
    );
}

pub fn log_app_shutdown(command: &str) {
    info!(event = "core.app.shutdown_started", command = command);
}

/// User errors (bad input, bad config) are warnings; everything else is an error.
pub fn log_app_error(err: &dyn WinlinkError) {
    if err.is_user_error() {
        warn!(
            event = "core.app.error_occurred",
            error = %err,
            error_code = err.error_code()
        );
    } else {
        error!(
            event = "core.app.error_occurred",
            error = %err,
            error_code = err.error_code()
        );
    }
}
