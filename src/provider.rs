//! The seam between the compatibility logic and the operating system
//!
//! Lifecycle, extension loading and error reporting are written against
//! [`SocketProvider`] rather than calling [`raw`](crate::raw) directly. [`System`]
//! is the real provider; anything else (a provider that refuses to create
//! sockets, or grants an unexpected version) can be plugged in through
//! [`Subsystem::initialize_with`](crate::lifecycle::Subsystem::initialize_with).

use crate::config::Version;
use crate::raw::{self, OsSocket};
use std::fmt;
use std::io;

/// OS socket-subsystem primitives used by the compatibility layer
pub trait SocketProvider {
    /// Handle to the resolved fast-open entry point
    type Entry: Copy + fmt::Debug;

    /// Starts the provider, returning the version actually granted
    fn startup(&self, requested: Version) -> io::Result<Version>;
    /// Releases the provider
    fn cleanup(&self);
    /// Opens a throwaway stream socket for capability probing
    fn open_probe(&self) -> io::Result<OsSocket>;
    fn close(&self, os: OsSocket) -> io::Result<()>;
    /// Resolves the fast-open entry point using a live socket
    fn query_fast_open(&self, os: OsSocket) -> io::Result<Self::Entry>;
    /// Last socket error code recorded for the calling thread
    fn last_error(&self) -> i32;
    /// Human-readable text for an error code, if the OS has one
    fn format_message(&self, code: i32) -> Option<String>;
}

/// The host operating system's socket provider
#[derive(Copy, Clone, Debug, Default)]
pub struct System;

impl SocketProvider for System {
    type Entry = raw::FastOpenEntry;

    fn startup(&self, requested: Version) -> io::Result<Version> {
        raw::startup(requested.to_word()).map(Version::from_word)
    }

    fn cleanup(&self) {
        raw::cleanup()
    }

    fn open_probe(&self) -> io::Result<OsSocket> {
        raw::probe_socket()
    }

    fn close(&self, os: OsSocket) -> io::Result<()> {
        raw::close(os)
    }

    fn query_fast_open(&self, os: OsSocket) -> io::Result<Self::Entry> {
        raw::query_fast_open(os)
    }

    fn last_error(&self) -> i32 {
        raw::last_error()
    }

    fn format_message(&self, code: i32) -> Option<String> {
        raw::format_message(code)
    }
}

impl<P: SocketProvider + ?Sized> SocketProvider for &P {
    type Entry = P::Entry;

    fn startup(&self, requested: Version) -> io::Result<Version> { (**self).startup(requested) }
    fn cleanup(&self) { (**self).cleanup() }
    fn open_probe(&self) -> io::Result<OsSocket> { (**self).open_probe() }
    fn close(&self, os: OsSocket) -> io::Result<()> { (**self).close(os) }
    fn query_fast_open(&self, os: OsSocket) -> io::Result<Self::Entry> { (**self).query_fast_open(os) }
    fn last_error(&self) -> i32 { (**self).last_error() }
    fn format_message(&self, code: i32) -> Option<String> { (**self).format_message(code) }
}
