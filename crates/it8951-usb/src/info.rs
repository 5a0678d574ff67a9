//! Device info query
//!
//! The get-system-info command returns a fixed 112-byte record of
//! big-endian u32 words:
//!
//! | offset | field                     |
//! |--------|---------------------------|
//! | 0      | standard command count    |
//! | 4      | extended command count    |
//! | 8      | signature                 |
//! | 12     | version                   |
//! | 16     | width                     |
//! | 20     | height                    |
//! | 24     | update-buffer address     |
//! | 28     | image-buffer address      |
//! | 32     | temperature segment       |
//! | 36     | UI mode                   |
//! | 40     | frame counts (8 words)    |
//! | 72     | buffer count              |
//! | 76     | reserved (9 words)        |

use core::time::Duration;

use tracing::{debug, trace};

use crate::area::be_words;
use crate::cdb;
use crate::error::DriverError;
use crate::panel::{PanelSpec, MAX_PANEL_DIMENSION};
use crate::transport::{DataPhase, Transport};

/// Size of the system-info response
pub const INFO_RESPONSE_LEN: usize = 112;

/// Where a handle's geometry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoSource {
    /// Parsed from the controller's system-info response
    Queried,
    /// Static fallback after the query failed or was skipped
    Fallback,
}

/// Controller geometry and memory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
    /// Device-side staging buffer read by refreshes
    pub image_buffer_address: u32,
    /// Secondary buffer address reported by the firmware
    pub update_buffer_address: u32,
    /// Number of standard commands supported
    pub standard_cmd_count: u32,
    /// Number of extended commands supported
    pub extended_cmd_count: u32,
    /// Firmware signature word
    pub signature: u32,
    /// Firmware version word
    pub version: u32,
    /// Active temperature segment
    pub temperature_segment: u32,
    /// Current UI mode
    pub ui_mode: u32,
    /// Frame count per waveform mode
    pub frame_counts: [u32; 8],
    /// Number of image buffers
    pub buffer_count: u32,
}

impl DeviceInfo {
    /// Geometry assumed when the controller cannot be queried
    pub fn fallback(panel: &PanelSpec, image_buffer_address: u32) -> Self {
        Self {
            width: panel.width,
            height: panel.height,
            image_buffer_address,
            update_buffer_address: 0,
            standard_cmd_count: 0,
            extended_cmd_count: 0,
            signature: 0,
            version: 0,
            temperature_segment: 0,
            ui_mode: 0,
            frame_counts: [0; 8],
            buffer_count: 0,
        }
    }

    /// Parse a system-info response
    ///
    /// # Errors
    ///
    /// [`DriverError::Protocol`] when the response is short or reports a
    /// width/height outside `1..=MAX_PANEL_DIMENSION`.
    pub fn parse(response: &[u8]) -> Result<Self, DriverError> {
        if response.len() < INFO_RESPONSE_LEN {
            return Err(DriverError::Protocol(format!(
                "system info response is {} bytes, expected {INFO_RESPONSE_LEN}",
                response.len()
            )));
        }
        let words = be_words::<19>(response).ok_or_else(|| {
            DriverError::Protocol("system info response truncated".to_owned())
        })?;
        let [std_cmds, ext_cmds, signature, version, width, height, update_addr, image_addr, temp, ui_mode, f0, f1, f2, f3, f4, f5, f6, f7, buffer_count] =
            words;

        for (name, value) in [("width", width), ("height", height)] {
            if value == 0 || value > MAX_PANEL_DIMENSION {
                return Err(DriverError::Protocol(format!(
                    "implausible panel {name} {value}"
                )));
            }
        }

        Ok(Self {
            width,
            height,
            image_buffer_address: image_addr,
            update_buffer_address: update_addr,
            standard_cmd_count: std_cmds,
            extended_cmd_count: ext_cmds,
            signature,
            version,
            temperature_segment: temp,
            ui_mode,
            frame_counts: [f0, f1, f2, f3, f4, f5, f6, f7],
            buffer_count,
        })
    }

    /// Encode into the 112-byte response layout
    ///
    /// Used by simulated devices; reserved words are zero.
    pub fn encode(&self) -> [u8; INFO_RESPONSE_LEN] {
        let mut out = [0u8; INFO_RESPONSE_LEN];
        let [f0, f1, f2, f3, f4, f5, f6, f7] = self.frame_counts;
        let words = [
            self.standard_cmd_count,
            self.extended_cmd_count,
            self.signature,
            self.version,
            self.width,
            self.height,
            self.update_buffer_address,
            self.image_buffer_address,
            self.temperature_segment,
            self.ui_mode,
            f0,
            f1,
            f2,
            f3,
            f4,
            f5,
            f6,
            f7,
            self.buffer_count,
        ];
        for (slot, word) in out.chunks_exact_mut(4).zip(words) {
            slot.copy_from_slice(&word.to_be_bytes());
        }
        out
    }
}

/// Ask the controller for its geometry
///
/// # Errors
///
/// Transport errors pass through unchanged; a short or implausible response
/// yields [`DriverError::Protocol`].
pub fn query_info<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Duration,
) -> Result<DeviceInfo, DriverError> {
    let command = cdb::get_system_info();
    trace!(cdb = ?command, "get system info");

    let mut response = [0u8; INFO_RESPONSE_LEN];
    let received = transport.send(&command, DataPhase::FromDevice(&mut response), timeout)?;
    let valid = response.get(..received).unwrap_or(response.as_slice());
    let info = DeviceInfo::parse(valid)?;

    debug!(
        width = info.width,
        height = info.height,
        image_buffer = format_args!("0x{:08x}", info.image_buffer_address),
        "system info"
    );
    Ok(info)
}
