//! Optional extension discovery (fast open)
//!
//! The accelerated connect-with-send primitive is not part of the stable socket
//! API. It has to be looked up at runtime on a live socket, and the lookup may
//! fail. [`load_fast_open`] does that lookup once and folds the outcome into a
//! [`FastOpen`] value that the connection-establishment path matches on.

use crate::error::report_error_with;
use crate::provider::SocketProvider;
use crate::raw;

/// Outcome of fast-open capability negotiation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FastOpen<E = raw::FastOpenEntry> {
    /// The platform does not provide the capability
    Unsupported,
    /// The capability is available through the resolved entry point
    Supported(E),
}

impl<E: Copy> FastOpen<E> {
    pub fn is_supported(&self) -> bool {
        matches!(self, FastOpen::Supported(_))
    }

    /// The resolved entry point, if any
    pub fn entry(&self) -> Option<E> {
        match *self {
            FastOpen::Supported(e) => Some(e),
            FastOpen::Unsupported => None,
        }
    }
}

impl<E> Default for FastOpen<E> {
    fn default() -> Self {
        FastOpen::Unsupported
    }
}

/// Resolves the fast-open entry point using a throwaway stream socket
///
/// The probe socket is closed on every path once it has been opened. A failed
/// extension query is logged; a failed socket creation or close is not, and
/// both still yield [`FastOpen::Unsupported`].
pub fn load_fast_open<P: SocketProvider>(provider: &P) -> FastOpen<P::Entry> {
    let os = match provider.open_probe() {
        Ok(os) => os,
        Err(e) => {
            log::debug!("fast open probe socket unavailable: {}", e);
            return FastOpen::Unsupported;
        }
    };

    let queried = provider.query_fast_open(os);
    if let Err(e) = &queried {
        report_error_with(provider, "fast open extension query", e);
    }

    if let Err(e) = provider.close(os) {
        log::debug!("closing fast open probe socket failed: {}", e);
        return FastOpen::Unsupported;
    }

    match queried {
        Ok(entry) => FastOpen::Supported(entry),
        Err(_) => FastOpen::Unsupported,
    }
}
