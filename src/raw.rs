//! Platform boundary for the socket compatibility layer
//!
//! Every FFI call the crate makes lives in this module. The rest of the crate
//! talks to the operating system only through the functions below, which have
//! the same names and signatures on every platform.
//!
//! # Platform Support
//!
//! ## Windows
//! - The Winsock provider must be started with `WSAStartup` before any socket
//!   call and released with `WSACleanup` afterwards
//! - `ConnectEx` (connect-with-send) is only reachable through the
//!   `SIO_GET_EXTENSION_FUNCTION_POINTER` query on a live socket
//! - Error text comes from `FormatMessageA` and must be released with `LocalFree`
//!
//! ## Unix Systems (Linux, macOS, BSD, Android)
//! - The socket stack is always available, so startup and cleanup are no-ops
//! - Fast open is probed by enabling `TCP_FASTOPEN_CONNECT` (Linux/Android only)
//! - Error text comes from `strerror_r`
//!
//! # Safety
//!
//! This module contains `unsafe` code for:
//! - Raw socket system calls
//! - Zeroed socket address storage handed to the OS
//! - OS-allocated message buffers
//!
//! All `unsafe` operations are encapsulated within safe interfaces.

use std::io;

/// IP protocol domain for addresses
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Domain {
    /// IPv4 protocol
    Ipv4,
    /// IPv6 protocol
    Ipv6,
}

impl Domain {
    /// Maps a native address family tag to a domain, `None` for anything else
    pub fn from_raw(af: i32) -> Option<Domain> {
        match af {
            AF_INET => Some(Domain::Ipv4),
            AF_INET6 => Some(Domain::Ipv6),
            _ => None,
        }
    }

    /// Native address family tag
    pub fn raw(self) -> i32 {
        match self {
            Domain::Ipv4 => AF_INET,
            Domain::Ipv6 => AF_INET6,
        }
    }

    /// Size in bytes of a binary address in this domain
    pub fn addr_len(self) -> usize {
        match self {
            Domain::Ipv4 => 4,
            Domain::Ipv6 => 16,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::os::unix::io::RawFd;
        /// Unix socket handle type
        pub type OsSocket = RawFd;

        /// Native IPv4 family tag
        pub const AF_INET: i32 = libc::AF_INET;
        /// Native IPv6 family tag
        pub const AF_INET6: i32 = libc::AF_INET6;

        #[cfg(any(target_os = "linux", target_os = "android"))]
        use libc::TCP_FASTOPEN_CONNECT;

        extern "C" {
            fn inet_ntop(af: libc::c_int, src: *const libc::c_void, dst: *mut libc::c_char, size: libc::socklen_t) -> *const libc::c_char;
        }

        /// Resolved fast-open entry point
        ///
        /// On Linux the "entry point" is a socket option: setting `option` at
        /// `level` on a stream socket makes the next `connect` + first write
        /// go out as a SYN carrying data.
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub struct FastOpenEntry {
            /// Socket option level
            pub level: i32,
            /// Socket option name
            pub option: i32,
        }

        /// Starts the socket provider. POSIX stacks need no startup, so the
        /// requested version is granted as is.
        pub fn startup(requested: u16) -> io::Result<u16> { Ok(requested) }

        /// Releases the socket provider (no-op on Unix)
        pub fn cleanup() {}

        /// Opens a throwaway IPv4 stream socket
        pub fn probe_socket() -> io::Result<OsSocket> {
            #[cfg(any(target_os = "linux", target_os = "android"))]
            let ty = libc::SOCK_STREAM | libc::SOCK_CLOEXEC;
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            let ty = libc::SOCK_STREAM;
            let fd = unsafe { libc::socket(libc::AF_INET, ty, 0) };
            if fd < 0 { return Err(io::Error::last_os_error()); }
            Ok(fd)
        }

        /// Closes a socket handle
        pub fn close(os: OsSocket) -> io::Result<()> {
            if unsafe { libc::close(os) } != 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
        }

        /// Queries the fast-open capability on a live stream socket
        #[cfg(any(target_os = "linux", target_os = "android"))]
        pub fn query_fast_open(os: OsSocket) -> io::Result<FastOpenEntry> {
            setsockopt_int(os, libc::IPPROTO_TCP, TCP_FASTOPEN_CONNECT, 1)?;
            Ok(FastOpenEntry { level: libc::IPPROTO_TCP, option: TCP_FASTOPEN_CONNECT })
        }

        /// Queries the fast-open capability (not available on this platform)
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        pub fn query_fast_open(_os: OsSocket) -> io::Result<FastOpenEntry> {
            Err(io::Error::from_raw_os_error(libc::ENOPROTOOPT))
        }

        /// Set socket non-blocking mode
        pub fn set_nonblocking(os: OsSocket) -> io::Result<()> {
            unsafe {
                let flags = libc::fcntl(os, libc::F_GETFL);
                if flags < 0 { return Err(io::Error::last_os_error()); }
                if flags & libc::O_NONBLOCK != 0 { return Ok(()); }
                if libc::fcntl(os, libc::F_SETFL, flags | libc::O_NONBLOCK) != 0 { return Err(io::Error::last_os_error()); }
                Ok(())
            }
        }

        /// Last socket error code of the calling thread (`errno`)
        pub fn last_error() -> i32 {
            io::Error::last_os_error().raw_os_error().unwrap_or(0)
        }

        /// Expands an error code into its system message
        pub fn format_message(code: i32) -> Option<String> {
            let mut buf = [0u8; 256];
            let rc = unsafe { libc::strerror_r(code, buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
            if rc != 0 { return None; }
            let len = crate::posix::strnlen(&buf, buf.len());
            if len == 0 { return None; }
            Some(String::from_utf8_lossy(&buf[..len]).into_owned())
        }

        /// Writes the NUL-terminated text form of `src` into `dst`
        ///
        /// `src` must hold exactly `domain.addr_len()` bytes.
        pub fn address_to_string(domain: Domain, src: &[u8], dst: &mut [u8]) -> io::Result<()> {
            let size = dst.len().min(libc::socklen_t::MAX as usize) as libc::socklen_t;
            let out = dst.as_mut_ptr() as *mut libc::c_char;
            let rc = match domain {
                Domain::Ipv4 => {
                    let octets: [u8; 4] = src.try_into().map_err(|_| invalid_len())?;
                    let mut a: libc::in_addr = unsafe { std::mem::zeroed() };
                    a.s_addr = u32::from_ne_bytes(octets);
                    unsafe { inet_ntop(libc::AF_INET, &a as *const _ as *const libc::c_void, out, size) }
                }
                Domain::Ipv6 => {
                    let octets: [u8; 16] = src.try_into().map_err(|_| invalid_len())?;
                    let mut a: libc::in6_addr = unsafe { std::mem::zeroed() };
                    a.s6_addr = octets;
                    unsafe { inet_ntop(libc::AF_INET6, &a as *const _ as *const libc::c_void, out, size) }
                }
            };
            if rc.is_null() { Err(io::Error::last_os_error()) } else { Ok(()) }
        }

        #[cfg(any(target_os = "linux", target_os = "android"))]
        fn setsockopt_int(fd: RawFd, level: i32, opt: i32, val: i32) -> io::Result<()> {
            let v = val as libc::c_int;
            let rc = unsafe { libc::setsockopt(fd, level, opt, &v as *const _ as _, std::mem::size_of::<libc::c_int>() as _) };
            if rc != 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
        }

    } else {
        // Windows
        use std::ffi::c_void;
        use std::{fmt, mem, ptr, slice};
        use std::os::windows::io::RawSocket;
        use windows_sys::Win32::Foundation::LocalFree;
        use windows_sys::Win32::Networking::WinSock as ws;
        use windows_sys::Win32::System::Diagnostics::Debug::{
            FormatMessageA, FORMAT_MESSAGE_ALLOCATE_BUFFER, FORMAT_MESSAGE_FROM_SYSTEM,
            FORMAT_MESSAGE_IGNORE_INSERTS,
        };
        /// Windows socket handle type
        pub type OsSocket = RawSocket; // SOCKET

        /// Native IPv4 family tag
        pub const AF_INET: i32 = ws::AF_INET as i32;
        /// Native IPv6 family tag
        pub const AF_INET6: i32 = ws::AF_INET6 as i32;

        // MAKELANGID(LANG_NEUTRAL, SUBLANG_DEFAULT)
        const LANG_NEUTRAL_DEFAULT: u32 = 0x0400;

        /// Resolved `ConnectEx` entry point
        #[derive(Copy, Clone)]
        pub struct FastOpenEntry {
            connect_ex: ws::LPFN_CONNECTEX,
        }

        impl FastOpenEntry {
            /// The `ConnectEx` function pointer (never `None`)
            pub fn connect_ex(&self) -> ws::LPFN_CONNECTEX { self.connect_ex }
        }

        impl fmt::Debug for FastOpenEntry {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct("FastOpenEntry")
                    .field("connect_ex", &self.connect_ex.map(|p| p as usize))
                    .finish()
            }
        }

        fn last_wsa_error() -> io::Error {
            io::Error::from_raw_os_error(unsafe { ws::WSAGetLastError() })
        }

        /// Starts the Winsock provider and returns the granted version word
        pub fn startup(requested: u16) -> io::Result<u16> {
            let mut data: ws::WSADATA = unsafe { mem::zeroed() };
            let rc = unsafe { ws::WSAStartup(requested, &mut data) };
            if rc != 0 { return Err(io::Error::from_raw_os_error(rc)); }
            Ok(data.wVersion)
        }

        /// Releases the Winsock provider
        pub fn cleanup() {
            unsafe { ws::WSACleanup(); }
        }

        /// Opens a throwaway IPv4 stream socket
        pub fn probe_socket() -> io::Result<OsSocket> {
            let s = unsafe { ws::socket(ws::AF_INET as i32, ws::SOCK_STREAM, 0) };
            if s == ws::INVALID_SOCKET { return Err(last_wsa_error()); }
            Ok(s as _)
        }

        /// Closes a socket handle
        pub fn close(os: OsSocket) -> io::Result<()> {
            if unsafe { ws::closesocket(os as ws::SOCKET) } != 0 { Err(last_wsa_error()) } else { Ok(()) }
        }

        /// Resolves `ConnectEx` through the extension function pointer query
        pub fn query_fast_open(os: OsSocket) -> io::Result<FastOpenEntry> {
            let guid = ws::WSAID_CONNECTEX;
            let mut connect_ex: ws::LPFN_CONNECTEX = None;
            let mut bytes: u32 = 0;
            let rc = unsafe {
                ws::WSAIoctl(
                    os as ws::SOCKET,
                    ws::SIO_GET_EXTENSION_FUNCTION_POINTER,
                    &guid as *const _ as *const c_void,
                    mem::size_of_val(&guid) as u32,
                    &mut connect_ex as *mut _ as *mut c_void,
                    mem::size_of::<ws::LPFN_CONNECTEX>() as u32,
                    &mut bytes,
                    ptr::null_mut(),
                    None,
                )
            };
            if rc != 0 { return Err(last_wsa_error()); }
            match connect_ex {
                Some(_) => Ok(FastOpenEntry { connect_ex }),
                None => Err(io::Error::new(io::ErrorKind::Unsupported, "ConnectEx not provided")),
            }
        }

        /// Set socket non-blocking mode
        pub fn set_nonblocking(os: OsSocket) -> io::Result<()> {
            let mut nb: u32 = 1;
            if unsafe { ws::ioctlsocket(os as ws::SOCKET, ws::FIONBIO, &mut nb) } != 0 { return Err(last_wsa_error()); }
            Ok(())
        }

        /// Last socket error code of the calling thread (`WSAGetLastError`)
        pub fn last_error() -> i32 {
            unsafe { ws::WSAGetLastError() }
        }

        /// `FormatMessageA` buffer, released with `LocalFree` on drop
        struct LocalMessage(*mut u8);

        impl Drop for LocalMessage {
            fn drop(&mut self) {
                if !self.0.is_null() {
                    unsafe { LocalFree(self.0.cast()); }
                }
            }
        }

        /// Expands an error code into its system message
        pub fn format_message(code: i32) -> Option<String> {
            let mut msg = LocalMessage(ptr::null_mut());
            let len = unsafe {
                FormatMessageA(
                    FORMAT_MESSAGE_ALLOCATE_BUFFER | FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
                    ptr::null(),
                    code as u32,
                    LANG_NEUTRAL_DEFAULT,
                    // with ALLOCATE_BUFFER the OS writes the buffer address here
                    &mut msg.0 as *mut *mut u8 as *mut u8,
                    0,
                    ptr::null(),
                )
            };
            if msg.0.is_null() || len == 0 { return None; }
            let bytes = unsafe { slice::from_raw_parts(msg.0, len as usize) };
            Some(String::from_utf8_lossy(bytes).trim_end().to_owned())
        }

        /// Writes the NUL-terminated text form of `src` into `dst`
        ///
        /// `src` must hold exactly `domain.addr_len()` bytes.
        pub fn address_to_string(domain: Domain, src: &[u8], dst: &mut [u8]) -> io::Result<()> {
            let mut ss: ws::SOCKADDR_STORAGE = unsafe { mem::zeroed() };
            let len = match domain {
                Domain::Ipv4 => {
                    let octets: [u8; 4] = src.try_into().map_err(|_| invalid_len())?;
                    let sin = unsafe { &mut *(&mut ss as *mut _ as *mut ws::SOCKADDR_IN) };
                    sin.sin_family = ws::AF_INET;
                    sin.sin_addr = ws::IN_ADDR { S_un: ws::IN_ADDR_0 { S_addr: u32::from_ne_bytes(octets) } };
                    mem::size_of::<ws::SOCKADDR_IN>()
                }
                Domain::Ipv6 => {
                    let octets: [u8; 16] = src.try_into().map_err(|_| invalid_len())?;
                    let sin6 = unsafe { &mut *(&mut ss as *mut _ as *mut ws::SOCKADDR_IN6) };
                    sin6.sin6_family = ws::AF_INET6;
                    sin6.sin6_addr = ws::IN6_ADDR { u: ws::IN6_ADDR_0 { Byte: octets } };
                    mem::size_of::<ws::SOCKADDR_IN6>()
                }
            };
            let mut capacity = dst.len().min(u32::MAX as usize) as u32;
            let rc = unsafe {
                ws::WSAAddressToStringA(
                    &ss as *const _ as *const ws::SOCKADDR,
                    len as u32,
                    ptr::null(),
                    dst.as_mut_ptr(),
                    &mut capacity,
                )
            };
            if rc != 0 { return Err(last_wsa_error()); }
            Ok(())
        }
    }
}

fn invalid_len() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "address length does not match its family")
}
