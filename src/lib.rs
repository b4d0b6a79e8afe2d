#![deny(unsafe_op_in_unsafe_fn)]


pub mod config;
pub mod error;
pub mod extension;
pub mod lifecycle;
pub mod posix;
pub mod provider;
pub mod raw; // OS-Level socket helpers (Unix/Windows)

#[cfg(test)]
mod testing;

/// Convenience re-exports
pub use config::{ShimConfig, Version};
pub use error::{InitError, report_last_error};
pub use extension::FastOpen;
pub use lifecycle::Subsystem;
pub use posix::{inet_ntop, set_nonblocking, strnlen};
