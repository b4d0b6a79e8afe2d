//! POSIX primitives the proxy assumes exist
//!
//! The connection-handling code is written against POSIX socket semantics.
//! These are the few library functions it needs that some platforms lack or
//! implement differently: switching a socket to non-blocking mode, turning a
//! binary address into text, and a bounded string length scan.
//!
//! # Examples
//!
//! ```rust
//! use horizon_netcompat::posix::{inet_ntop, strnlen};
//! use horizon_netcompat::raw::AF_INET;
//!
//! let mut buf = [0u8; 46];
//! assert_eq!(inet_ntop(AF_INET, &[10, 0, 0, 1], &mut buf), Some("10.0.0.1"));
//! assert_eq!(strnlen(b"abc\0def", 16), 3);
//! ```

use crate::raw::{self, Domain, OsSocket};
use std::io;
use std::str;

/// Switches a socket into non-blocking mode
///
/// Calling it on a socket that is already non-blocking succeeds and changes
/// nothing. On failure the OS error code is logged and returned; the handle is
/// left open for the caller to dispose of.
pub fn set_nonblocking(os: OsSocket) -> io::Result<()> {
    raw::set_nonblocking(os).map_err(|e| {
        log::error!("set_nonblocking failed with error: {}", e.raw_os_error().unwrap_or(-1));
        e
    })
}

/// Length of the NUL-terminated string in `s`, scanning at most `maxlen` bytes
///
/// Returns the offset of the first NUL, or the scan bound if there is none.
/// The bound is `maxlen` clamped to the slice length.
pub fn strnlen(s: &[u8], maxlen: usize) -> usize {
    let bound = maxlen.min(s.len());
    memchr::memchr(0, &s[..bound]).unwrap_or(bound)
}

/// Converts a binary IPv4/IPv6 address into its canonical text form
///
/// `af` is a native family tag ([`raw::AF_INET`] or [`raw::AF_INET6`]) and
/// `src` the address bytes in network order (4 or 16 of them). The text is
/// written NUL-terminated into `dst` and returned without the terminator.
///
/// Returns `None` when the family is unsupported (`dst` is left untouched),
/// when `src` has the wrong length for the family, or when the conversion
/// fails, including when `dst` is too small. The OS error code is not kept.
pub fn inet_ntop<'a>(af: i32, src: &[u8], dst: &'a mut [u8]) -> Option<&'a str> {
    let domain = Domain::from_raw(af)?;
    if src.len() != domain.addr_len() {
        return None;
    }
    raw::address_to_string(domain, src, dst).ok()?;
    let dst: &'a [u8] = dst;
    let len = strnlen(dst, dst.len());
    str::from_utf8(&dst[..len]).ok()
}
