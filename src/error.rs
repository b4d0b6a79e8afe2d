//! Lifecycle errors and socket error reporting
//!
//! Only subsystem startup can fail hard; that is what [`InitError`] covers.
//! Every other failure in this crate is reported through a return value plus,
//! where it helps the operator, an error line built by [`report_last_error`].

use crate::config::Version;
use crate::provider::{SocketProvider, System};
use std::io;
use thiserror::Error;

/// Fatal socket subsystem initialization failure
///
/// Nothing socket-related can proceed after one of these; the caller decides
/// whether that means exiting the process.
#[derive(Debug, Error)]
pub enum InitError {
    /// The socket provider could not be started
    #[error("could not initialize the socket subsystem")]
    Startup(#[source] io::Error),
    /// The provider started but granted a different protocol version.
    /// The provider has already been released when this is returned.
    #[error("could not find a usable socket subsystem version (requested {requested}, granted {granted})")]
    UnsupportedVersion { requested: Version, granted: Version },
}

/// Message text for the calling thread's last socket error
pub fn describe_last_error() -> Option<String> {
    describe_last_error_with(&System)
}

/// [`describe_last_error`] against a specific provider
pub fn describe_last_error_with<P: SocketProvider>(provider: &P) -> Option<String> {
    let code = provider.last_error();
    provider.format_message(code)
}

/// Logs `"<label>: <message>"` for the calling thread's last socket error
///
/// Call it right after the failing socket call, before anything else can
/// overwrite the thread's error code. Logs nothing if the OS has no message
/// for the code.
pub fn report_last_error(label: &str) {
    report_last_error_with(&System, label)
}

/// [`report_last_error`] against a specific provider
pub fn report_last_error_with<P: SocketProvider>(provider: &P, label: &str) {
    if let Some(msg) = describe_last_error_with(provider) {
        log::error!("{}: {}", label, msg);
    }
}

/// Logs `"<label>: <message>"` for an error already returned by a socket call
///
/// The message is expanded from the error's own OS code, not from the
/// thread's last error. Errors without an OS code are logged as they display.
pub fn report_error_with<P: SocketProvider>(provider: &P, label: &str, err: &io::Error) {
    match err.raw_os_error() {
        Some(code) => {
            if let Some(msg) = provider.format_message(code) {
                log::error!("{}: {}", label, msg);
            }
        }
        None => log::error!("{}: {}", label, err),
    }
}
