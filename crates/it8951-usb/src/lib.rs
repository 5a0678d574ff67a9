//! Driver for IT8951 e-paper controllers behind a USB mass-storage bridge
//!
//! The controller enumerates as a SCSI disk and accepts vendor commands
//! (opcode `0xFE`) through SCSI generic passthrough. This crate builds those
//! commands, chunks raster uploads to the bridge's transfer ceiling and
//! triggers waveform refreshes.
//!
//! # Architecture Layers
//!
//! ```text
//! Driver facade  (It8951: open / close / clear / display / reset)
//!         ↓
//! Upload + Refresh (chunk planning, area descriptors)
//!         ↓
//! ProtocolProfile (Vendor payload encoding | Direct CDB encoding)
//!         ↓
//! Transport trait (SgTransport on Linux, mock transports for tests)
//! ```
//!
//! # Features
//!
//! - `serde`: (de)serialise [`DriverConfig`], [`ProtocolProfile`] and
//!   [`RefreshMode`]
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(target_os = "linux")]
//! # fn main() -> Result<(), it8951_usb::DriverError> {
//! use it8951_usb::{DriverConfig, It8951, RefreshMode};
//!
//! let mut display = It8951::open("/dev/sg0", DriverConfig::default())?;
//! display.clear(RefreshMode::Init)?;
//!
//! let gray = vec![0x80; display.full_rect().area()];
//! display.display_full(&gray, RefreshMode::Gc16)?;
//! display.close();
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::doc_markdown)] // opcodes and register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod area;
pub mod cdb;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod info;
pub mod mock;
pub mod mode;
pub mod panel;
pub mod profile;
pub mod refresh;
#[cfg(target_os = "linux")]
pub mod sg;
pub mod transport;
pub mod upload;

pub use config::{Builder, DriverConfig, DEFAULT_MAX_TRANSFER, DEFAULT_TIMEOUT};
pub use driver::{It8951, BLACK, WHITE};
pub use error::{ConfigError, DriverError, ErrorKind, IoFailure, OpenFailure, SizeError};
pub use geometry::Rect;
pub use info::{query_info, DeviceInfo, InfoSource};
pub use mode::RefreshMode;
pub use panel::{PanelSpec, FALLBACK_PANEL};
pub use profile::ProtocolProfile;
pub use refresh::refresh;
#[cfg(target_os = "linux")]
pub use sg::SgTransport;
pub use transport::{DataPhase, Direction, Reconnect, Transport};
pub use upload::{rows_per_chunk, upload, ChunkPlan};
