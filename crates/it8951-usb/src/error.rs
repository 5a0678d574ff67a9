//! Error types for the driver
//!
//! - [`DriverError`] - every runtime failure surfaced by the facade and the
//!   components below it
//! - [`SizeError`] - raster / rectangle validation, always raised before any
//!   byte reaches the device
//! - [`OpenFailure`] - why a device path could not become a handle
//! - [`ConfigError`] - rejected [`Builder`](crate::config::Builder) input
//!
//! No error is recovered locally. A failed chunk aborts the rest of the
//! upload, and a failed refresh leaves the panel showing stale content. The
//! handle stays open either way so the caller can retry.

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur when talking to the controller
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The device path could not be opened as a SCSI generic device
    #[error("cannot open {}: {reason}", path.display())]
    Open {
        /// Path passed to `open`
        path: PathBuf,
        /// Underlying cause
        reason: OpenFailure,
    },

    /// The SG_IO request failed or the device reported a non-success status
    #[error("transfer failed: {0}")]
    Io(#[from] IoFailure),

    /// No response within the configured deadline
    #[error("device did not answer within {}ms", timeout.as_millis())]
    Timeout {
        /// Deadline that was exceeded
        timeout: Duration,
    },

    /// The system-info response was short or implausible
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Raster or rectangle rejected before any transfer
    #[error(transparent)]
    Size(#[from] SizeError),

    /// The handle was closed; reopen before issuing commands
    #[error("device handle is closed")]
    Closed,

    /// The driver configuration was rejected at open time
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl DriverError {
    /// Fieldless classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Open { .. } => ErrorKind::Open,
            Self::Io(_) => ErrorKind::Io,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Size(_) => ErrorKind::Size,
            Self::Closed => ErrorKind::Closed,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Classification of [`DriverError`] without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`DriverError::Open`]
    Open,
    /// See [`DriverError::Io`]
    Io,
    /// See [`DriverError::Timeout`]
    Timeout,
    /// See [`DriverError::Protocol`]
    Protocol,
    /// See [`DriverError::Size`]
    Size,
    /// See [`DriverError::Closed`]
    Closed,
    /// See [`DriverError::Config`]
    Config,
}

/// Reason an open attempt was refused
#[derive(Debug, thiserror::Error)]
pub enum OpenFailure {
    /// `open(2)` itself failed (missing node, permissions, ...)
    #[error("{0}")]
    Io(#[source] std::io::Error),
    /// The path exists but is neither a block nor a character device
    #[error("not a block or character device")]
    NotDevice,
    /// The node rejected the SCSI bus-number probe
    #[error("not a SCSI device ({0})")]
    NotScsi(#[source] std::io::Error),
}

/// Details of a failed SG_IO transaction
#[derive(Debug, thiserror::Error)]
pub enum IoFailure {
    /// The ioctl returned an OS error
    #[error("SG_IO ioctl: {0}")]
    Ioctl(#[source] std::io::Error),
    /// The ioctl succeeded but the status block reports a failure
    #[error(
        "device status 0x{status:02x}, host 0x{host_status:04x}, driver 0x{driver_status:04x}"
    )]
    Status {
        /// SCSI status byte
        status: u8,
        /// Host adapter status
        host_status: u16,
        /// Driver status
        driver_status: u16,
    },
    /// Transport-level failure reported by a non-SG transport
    #[error("{0}")]
    Other(String),
}

/// Raster / rectangle validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeError {
    /// Raster byte count differs from `width * height`
    #[error("raster holds {actual} bytes, expected {expected}")]
    RasterLength {
        /// `width * height`
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
    /// Rectangle leaves the panel
    #[error("area {x},{y} {width}x{height} exceeds panel {panel_width}x{panel_height}")]
    OutOfBounds {
        /// Left edge
        x: u32,
        /// Top edge
        y: u32,
        /// Area width
        width: u32,
        /// Area height
        height: u32,
        /// Panel width
        panel_width: u32,
        /// Panel height
        panel_height: u32,
    },
    /// Zero-width or zero-height area
    #[error("area has zero width or height")]
    EmptyArea,
    /// A single row does not fit in one transfer
    #[error("row of {width} bytes exceeds the {max_transfer} byte transfer limit")]
    RowTooWide {
        /// Area width in bytes
        width: u32,
        /// Configured transfer ceiling
        max_transfer: usize,
    },
    /// A coordinate does not fit the wire field of the selected profile
    #[error("{field} = {value} does not fit a {bits}-bit field")]
    FieldOverflow {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u32,
        /// Wire field width
        bits: u8,
    },
}

/// Errors that can occur when building a [`DriverConfig`](crate::config::DriverConfig)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `max_transfer_bytes` must be non-zero
    #[error("max transfer size must be at least one byte")]
    ZeroTransfer,
    /// The SG_IO timeout must be non-zero
    #[error("timeout must be non-zero")]
    ZeroTimeout,
    /// Fallback panel dimensions must be non-zero
    #[error("fallback panel {width}x{height} is empty")]
    EmptyFallback {
        /// Fallback width
        width: u32,
        /// Fallback height
        height: u32,
    },
}
