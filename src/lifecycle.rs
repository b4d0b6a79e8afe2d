//! Socket subsystem lifecycle
//!
//! [`Subsystem`] is the process-wide "socket stack is up" guard. Create it once
//! at startup, before the event loop accepts work, and hand it (or the
//! [`FastOpen`] it carries) to whatever establishes outbound connections.
//!
//! # Examples
//!
//! ```rust,no_run
//! use horizon_netcompat::{ShimConfig, Subsystem};
//!
//! fn main() -> Result<(), horizon_netcompat::InitError> {
//!     let subsystem = Subsystem::initialize(&ShimConfig::fast_open())?;
//!
//!     if subsystem.fast_open().is_supported() {
//!         // connect-with-send is available
//!     }
//!
//!     // ... run the proxy ...
//!
//!     subsystem.teardown();
//!     Ok(())
//! }
//! ```

use crate::config::{ShimConfig, Version};
use crate::error::InitError;
use crate::extension::{load_fast_open, FastOpen};
use crate::provider::{SocketProvider, System};

/// An initialized socket subsystem
///
/// Holds the effective configuration and the outcome of fast-open negotiation.
/// The provider is released exactly once: by [`Subsystem::teardown`], or when
/// the guard is dropped.
#[derive(Debug)]
pub struct Subsystem<P: SocketProvider = System> {
    provider: P,
    config: ShimConfig,
    granted: Version,
    fast_open: FastOpen<P::Entry>,
}

impl Subsystem<System> {
    /// Brings up the host socket subsystem
    ///
    /// # Errors
    ///
    /// - [`InitError::Startup`] if the provider cannot be started
    /// - [`InitError::UnsupportedVersion`] if it grants a version other than
    ///   `cfg.version` (the provider is released before returning)
    ///
    /// A fast-open request that cannot be honoured is not an error: the
    /// subsystem starts with `config().fast_open == false`.
    pub fn initialize(cfg: &ShimConfig) -> Result<Self, InitError> {
        Self::initialize_with(System, cfg)
    }
}

impl<P: SocketProvider> Subsystem<P> {
    /// Brings up the subsystem through a specific provider
    pub fn initialize_with(provider: P, cfg: &ShimConfig) -> Result<Self, InitError> {
        let granted = provider.startup(cfg.version).map_err(InitError::Startup)?;
        if granted != cfg.version {
            provider.cleanup();
            return Err(InitError::UnsupportedVersion { requested: cfg.version, granted });
        }

        let mut config = cfg.clone();
        let fast_open = if config.fast_open {
            let negotiated = load_fast_open(&provider);
            if !negotiated.is_supported() {
                log::warn!("fast open is not available on this system, disabling it");
                config.fast_open = false;
            }
            negotiated
        } else {
            FastOpen::Unsupported
        };

        log::debug!("socket subsystem {} up (fast open: {})", granted, config.fast_open);
        Ok(Self { provider, config, granted, fast_open })
    }

    /// Effective configuration after capability negotiation
    pub fn config(&self) -> &ShimConfig {
        &self.config
    }

    /// Protocol version granted by the provider
    pub fn version(&self) -> Version {
        self.granted
    }

    /// Fast-open capability for the connection-establishment path
    pub fn fast_open(&self) -> FastOpen<P::Entry> {
        self.fast_open
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Releases the socket provider. No socket operation is valid afterwards.
    pub fn teardown(self) {
        drop(self)
    }
}

impl<P: SocketProvider> Drop for Subsystem<P> {
    fn drop(&mut self) {
        self.provider.cleanup();
        log::debug!("socket subsystem released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockProvider, MOCK_ENTRY, PROBE_SOCKET};

    #[test]
    fn test_initialize_then_teardown() -> anyhow::Result<()> {
        let subsystem = Subsystem::initialize(&ShimConfig::default())?;
        assert_eq!(subsystem.version(), Version::V1_1);
        assert!(!subsystem.fast_open().is_supported());
        subsystem.teardown();
        Ok(())
    }

    #[test]
    fn test_initialize_with_fast_open_never_fails() {
        let subsystem = Subsystem::initialize(&ShimConfig::fast_open())
            .expect("fast open must not make initialization fail");
        assert_eq!(subsystem.version(), Version::V1_1);
        subsystem.teardown();
    }

    #[test]
    fn test_mock_lifecycle_calls() -> anyhow::Result<()> {
        let mock = MockProvider::granting(Version::V1_1);
        let subsystem = Subsystem::initialize_with(&mock, &ShimConfig::default())?;
        subsystem.teardown();
        assert_eq!(mock.calls(), vec![Call::Startup(Version::V1_1), Call::Cleanup]);
        Ok(())
    }

    #[test]
    fn test_fast_open_supported() -> anyhow::Result<()> {
        let mock = MockProvider::granting(Version::V1_1);
        let subsystem = Subsystem::initialize_with(&mock, &ShimConfig::fast_open())?;
        assert!(subsystem.config().fast_open);
        assert_eq!(subsystem.fast_open(), FastOpen::Supported(MOCK_ENTRY));
        drop(subsystem);
        assert_eq!(
            mock.calls(),
            vec![
                Call::Startup(Version::V1_1),
                Call::Open,
                Call::Query(PROBE_SOCKET),
                Call::Close(PROBE_SOCKET),
                Call::Cleanup,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_fast_open_downgraded_when_socket_denied() -> anyhow::Result<()> {
        let mock = MockProvider { deny_socket: true, ..MockProvider::granting(Version::V1_1) };
        let cfg = ShimConfig::fast_open();
        let subsystem = Subsystem::initialize_with(&mock, &cfg)?;
        assert!(!subsystem.config().fast_open);
        assert_eq!(subsystem.fast_open(), FastOpen::Unsupported);
        // the caller's copy is left as requested
        assert!(cfg.fast_open);
        Ok(())
    }

    #[test]
    fn test_fast_open_not_probed_unless_requested() -> anyhow::Result<()> {
        let mock = MockProvider::granting(Version::V1_1);
        let _subsystem = Subsystem::initialize_with(&mock, &ShimConfig::default())?;
        assert!(!mock.calls().contains(&Call::Open));
        Ok(())
    }

    #[test]
    fn test_startup_failure() {
        let mock = MockProvider::failing_startup(10091);
        let err = Subsystem::initialize_with(&mock, &ShimConfig::default()).unwrap_err();
        match err {
            InitError::Startup(e) => assert_eq!(e.raw_os_error(), Some(10091)),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.calls(), vec![Call::Startup(Version::V1_1)]);
    }

    #[test]
    fn test_version_mismatch_releases_provider() {
        let mock = MockProvider::granting(Version::new(2, 2));
        let err = Subsystem::initialize_with(&mock, &ShimConfig::fast_open()).unwrap_err();
        match err {
            InitError::UnsupportedVersion { requested, granted } => {
                assert_eq!(requested, Version::V1_1);
                assert_eq!(granted, Version::new(2, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.calls(), vec![Call::Startup(Version::V1_1), Call::Cleanup]);
    }
}
