//! Driver configuration types and builder

use core::time::Duration;

use crate::error::ConfigError;
use crate::panel::{PanelSpec, FALLBACK_PANEL};
use crate::profile::ProtocolProfile;

/// Largest payload the USB bridge reliably carries in one request
pub const DEFAULT_MAX_TRANSFER: usize = 60_800;

/// Default SG_IO timeout, long enough for a full-panel `Init` refresh
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Driver configuration
///
/// Use [`Builder`] to create a `DriverConfig`; the builder validates the
/// fields the upload and refresh paths divide by or wait on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DriverConfig {
    /// Wire encoding spoken by the controller firmware
    pub profile: ProtocolProfile,
    /// Transfer ceiling governing chunk height
    pub max_transfer_bytes: usize,
    /// Per-command SG_IO timeout
    #[cfg_attr(feature = "serde", serde(rename = "timeout_ms", with = "millis"))]
    pub timeout: Duration,
    /// Request that display commands block until the panel settles
    pub wait_for_ready: bool,
    /// Geometry used when the system-info query fails or is skipped
    pub fallback: PanelSpec,
    /// Image-buffer address used together with `fallback`
    pub fallback_image_buffer_address: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            profile: ProtocolProfile::default(),
            max_transfer_bytes: DEFAULT_MAX_TRANSFER,
            timeout: DEFAULT_TIMEOUT,
            wait_for_ready: true,
            fallback: FALLBACK_PANEL,
            fallback_image_buffer_address: 0,
        }
    }
}

impl DriverConfig {
    /// Re-run the builder checks on a config obtained another way
    /// (for example deserialised from a file)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_transfer_bytes == 0 {
            return Err(ConfigError::ZeroTransfer);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.fallback.width == 0 || self.fallback.height == 0 {
            return Err(ConfigError::EmptyFallback {
                width: self.fallback.width,
                height: self.fallback.height,
            });
        }
        Ok(())
    }
}

/// Timeouts are written as whole milliseconds in config files
#[cfg(feature = "serde")]
mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Builder for constructing driver configuration
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use it8951_usb::{Builder, ProtocolProfile};
///
/// let config = Builder::new()
///     .profile(ProtocolProfile::Vendor)
///     .timeout(Duration::from_secs(15))
///     .build()
///     .expect("valid configuration");
/// assert_eq!(config.max_transfer_bytes, 60_800);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: DriverConfig,
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Select the wire encoding
    pub fn profile(mut self, profile: ProtocolProfile) -> Self {
        self.config.profile = profile;
        self
    }

    /// Set the per-transfer byte ceiling
    pub fn max_transfer_bytes(mut self, bytes: usize) -> Self {
        self.config.max_transfer_bytes = bytes;
        self
    }

    /// Set the SG_IO timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Choose blocking (`true`) or fire-and-forget refreshes
    pub fn wait_for_ready(mut self, wait: bool) -> Self {
        self.config.wait_for_ready = wait;
        self
    }

    /// Set the geometry assumed when the info query fails
    pub fn fallback(mut self, panel: PanelSpec) -> Self {
        self.config.fallback = panel;
        self
    }

    /// Set the image-buffer address assumed when the info query fails
    pub fn fallback_image_buffer_address(mut self, address: u32) -> Self {
        self.config.fallback_image_buffer_address = address;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a zero transfer size, zero timeout or
    /// empty fallback panel.
    pub fn build(self) -> Result<DriverConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
