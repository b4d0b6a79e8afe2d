//! Startup configuration for the socket subsystem
//!
//! `ShimConfig` is read once by [`Subsystem::initialize`](crate::lifecycle::Subsystem::initialize).
//! The subsystem keeps its own copy of the *effective* configuration: when a
//! requested optional capability turns out to be unavailable, the copy held by
//! the subsystem has that capability switched off.
//!
//! # Examples
//!
//! ```rust
//! use horizon_netcompat::{ShimConfig, Version};
//!
//! // Ask for fast open; the subsystem will drop it if the platform lacks it
//! let cfg = ShimConfig::fast_open();
//! assert!(cfg.fast_open);
//! assert_eq!(cfg.version, Version::new(1, 1));
//! ```

use std::fmt;

/// Socket provider protocol version
///
/// Packed into a 16-bit word the way Winsock does it: major version in the
/// low byte, minor version in the high byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version (low byte of the packed word)
    pub major: u8,
    /// Minor version (high byte of the packed word)
    pub minor: u8,
}

impl Version {
    /// Version 1.1, the version the proxy is written against
    pub const V1_1: Version = Version { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Unpacks a version word (`LOBYTE` = major, `HIBYTE` = minor)
    pub const fn from_word(word: u16) -> Self {
        Self { major: (word & 0xff) as u8, minor: (word >> 8) as u8 }
    }

    /// Packs the version into a word (`MAKEWORD(major, minor)`)
    pub const fn to_word(self) -> u16 {
        (self.major as u16) | ((self.minor as u16) << 8)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Socket subsystem configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShimConfig {
/// Request the accelerated connect-with-send (fast open) capability
///
/// Fast open is an optimization: if the platform cannot provide it the
/// subsystem still starts, with this flag cleared in its effective config.
///
/// **Default**: `false`
pub fast_open: bool,

/// Protocol version requested from the socket provider
///
/// The granted version must match exactly or initialization fails.
///
/// **Default**: `1.1`
pub version: Version,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            fast_open: false,
            version: Version::V1_1,
        }
    }
}

impl ShimConfig {
    /// Default configuration with fast open requested
    pub fn fast_open() -> Self {
        Self {
            fast_open: true,
            ..Default::default()
        }
    }
}
