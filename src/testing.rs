//! Test support: a scriptable socket provider and a log capture sink

use crate::config::Version;
use crate::provider::SocketProvider;
use crate::raw::OsSocket;
use std::cell::RefCell;
use std::io;
use std::sync::Once;

/// Handle the mock returns for its probe socket
pub const PROBE_SOCKET: OsSocket = 42;
/// Entry point the mock resolves for fast open
pub const MOCK_ENTRY: u32 = 0xC0FFEE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Startup(Version),
    Cleanup,
    Open,
    Close(OsSocket),
    Query(OsSocket),
    LastError,
    Format(i32),
}

/// Provider whose every answer is set up by the test; records the calls made
#[derive(Debug)]
pub struct MockProvider {
    /// `Err(code)` makes startup fail with that OS code
    pub granted: Result<Version, i32>,
    pub deny_socket: bool,
    /// `Some(code)` makes the extension query fail with that OS code
    pub deny_query: Option<i32>,
    pub deny_close: bool,
    pub error_code: i32,
    pub message: Option<String>,
    pub recorded: RefCell<Vec<Call>>,
}

impl MockProvider {
    pub fn granting(version: Version) -> Self {
        Self {
            granted: Ok(version),
            deny_socket: false,
            deny_query: None,
            deny_close: false,
            error_code: 0,
            message: None,
            recorded: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_startup(code: i32) -> Self {
        Self { granted: Err(code), ..Self::granting(Version::V1_1) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorded.borrow().clone()
    }

    fn record(&self, call: Call) {
        self.recorded.borrow_mut().push(call);
    }
}

impl SocketProvider for MockProvider {
    type Entry = u32;

    fn startup(&self, requested: Version) -> io::Result<Version> {
        self.record(Call::Startup(requested));
        self.granted.map_err(io::Error::from_raw_os_error)
    }

    fn cleanup(&self) {
        self.record(Call::Cleanup);
    }

    fn open_probe(&self) -> io::Result<OsSocket> {
        self.record(Call::Open);
        if self.deny_socket {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "socket creation denied"));
        }
        Ok(PROBE_SOCKET)
    }

    fn close(&self, os: OsSocket) -> io::Result<()> {
        self.record(Call::Close(os));
        if self.deny_close {
            return Err(io::Error::new(io::ErrorKind::Other, "close denied"));
        }
        Ok(())
    }

    fn query_fast_open(&self, os: OsSocket) -> io::Result<u32> {
        self.record(Call::Query(os));
        if let Some(code) = self.deny_query {
            return Err(io::Error::from_raw_os_error(code));
        }
        Ok(MOCK_ENTRY)
    }

    fn last_error(&self) -> i32 {
        self.record(Call::LastError);
        self.error_code
    }

    fn format_message(&self, code: i32) -> Option<String> {
        self.record(Call::Format(code));
        self.message.clone()
    }
}

thread_local! {
    static CAPTURED: RefCell<Vec<(log::Level, String)>> = RefCell::new(Vec::new());
}

struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

/// Starts capturing log records emitted on the current thread
pub fn capture_logs() {
    INSTALL.call_once(|| {
        // another logger already installed means nothing is captured; tests will say so
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
    });
    CAPTURED.with(|c| c.borrow_mut().clear());
}

/// Records captured on the current thread since [`capture_logs`]
pub fn take_logs() -> Vec<(log::Level, String)> {
    CAPTURED.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

/// Starts the host socket stack for tests that call the OS directly and
/// keeps it up for the rest of the test run
pub fn ensure_socket_stack() {
    static START: Once = Once::new();
    START.call_once(|| {
        let _ = crate::raw::startup(Version::new(2, 2).to_word());
    });
}
