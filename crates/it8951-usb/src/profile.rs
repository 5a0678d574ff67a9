//! Protocol profiles
//!
//! Two firmware families answer to different encodings of the same
//! load/display operations. A handle picks one at open time and never mixes
//! them.
//!
//! | profile  | area travels in         | info query | wait flag |
//! |----------|-------------------------|------------|-----------|
//! | `Vendor` | big-endian payload      | yes        | honoured  |
//! | `Direct` | 16-bit CDB fields       | no         | n/a       |

use core::fmt;
use core::str::FromStr;

use crate::area::{DisplayArea, LoadArea, LOAD_AREA_LEN};
use crate::cdb::{self, AREA_CDB_LEN};
use crate::error::SizeError;
use crate::geometry::Rect;
use crate::mode::RefreshMode;

/// Wire encoding spoken by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProtocolProfile {
    /// Vendor passthrough: area descriptors in the payload, geometry queried
    #[default]
    Vendor,
    /// Area packed into the CDB, geometry from the static fallback
    Direct,
}

/// One fully encoded command ready for [`Transport::send`](crate::Transport::send)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command block
    pub cdb: [u8; AREA_CDB_LEN],
    /// Host-to-device payload (empty for direct-profile refreshes)
    pub payload: Vec<u8>,
}

impl ProtocolProfile {
    /// All profiles
    pub const ALL: [ProtocolProfile; 2] = [Self::Vendor, Self::Direct];

    /// Lower-case profile name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Direct => "direct",
        }
    }

    /// Whether `open` issues the get-system-info command
    pub const fn queries_info(self) -> bool {
        matches!(self, Self::Vendor)
    }

    /// Verify `rect` is representable in this profile's area fields
    ///
    /// Every strip of an encodable rectangle is encodable too, so uploads
    /// check once before the first transfer.
    pub fn check_encodable(self, rect: &Rect) -> Result<(), SizeError> {
        match self {
            Self::Vendor => Ok(()),
            Self::Direct => cdb::direct_load_image(rect).map(drop),
        }
    }

    /// Encode one image chunk
    ///
    /// `chunk` is the strip being written and `pixels` its raster bytes.
    pub fn load_request(
        self,
        address: u32,
        chunk: &Rect,
        pixels: &[u8],
    ) -> Result<Request, SizeError> {
        match self {
            Self::Vendor => {
                let header = LoadArea { address, rect: *chunk }.encode();
                let mut payload = Vec::with_capacity(LOAD_AREA_LEN.saturating_add(pixels.len()));
                payload.extend_from_slice(&header);
                payload.extend_from_slice(pixels);
                Ok(Request { cdb: cdb::load_image_area(), payload })
            }
            Self::Direct => Ok(Request {
                cdb: cdb::direct_load_image(chunk)?,
                payload: pixels.to_vec(),
            }),
        }
    }

    /// Encode a refresh of `rect`
    pub fn display_request(
        self,
        address: u32,
        rect: &Rect,
        mode: RefreshMode,
        wait_ready: bool,
    ) -> Result<Request, SizeError> {
        match self {
            Self::Vendor => {
                let area = DisplayArea {
                    address,
                    mode: mode.wire_value(),
                    rect: *rect,
                    wait_ready,
                };
                Ok(Request { cdb: cdb::display_area(), payload: area.encode().to_vec() })
            }
            Self::Direct => Ok(Request {
                cdb: cdb::direct_display(rect, mode.wire_value())?,
                payload: Vec::new(),
            }),
        }
    }
}

impl fmt::Display for ProtocolProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown profile name passed to [`ProtocolProfile::from_str`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown protocol profile `{0}` (expected vendor or direct)")]
pub struct ParseProfileError(pub String);

impl FromStr for ProtocolProfile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseProfileError(s.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn vendor_load_prefixes_descriptor() {
        let chunk = Rect::new(0, 64, 4, 2);
        let req = ProtocolProfile::Vendor
            .load_request(0x1234, &chunk, &[9; 8])
            .unwrap();
        assert_eq!(req.cdb, cdb::load_image_area());
        assert_eq!(req.payload.len(), LOAD_AREA_LEN + 8);
        let header = LoadArea::decode(&req.payload).unwrap();
        assert_eq!(header, LoadArea { address: 0x1234, rect: chunk });
        assert!(req.payload[LOAD_AREA_LEN..].iter().all(|&b| b == 9));
    }

    #[test]
    fn direct_load_sends_pixels_only() {
        let chunk = Rect::new(0, 64, 4, 2);
        let req = ProtocolProfile::Direct.load_request(0x1234, &chunk, &[7; 8]).unwrap();
        assert_eq!(req.cdb, cdb::direct_load_image(&chunk).unwrap());
        assert_eq!(req.payload, vec![7; 8]);
    }

    #[test]
    fn vendor_display_carries_wait_flag() {
        let rect = Rect::full(1872, 1404);
        let req = ProtocolProfile::Vendor
            .display_request(0xAB, &rect, RefreshMode::A2, false)
            .unwrap();
        let area = DisplayArea::decode(&req.payload).unwrap();
        assert_eq!(area.mode, 4);
        assert!(!area.wait_ready);
        assert_eq!(area.rect, rect);
    }

    #[test]
    fn direct_display_has_no_payload() {
        let req = ProtocolProfile::Direct
            .display_request(0, &Rect::full(1872, 1404), RefreshMode::Gc16, true)
            .unwrap();
        assert!(req.payload.is_empty());
        assert_eq!(req.cdb[15], 2);
    }

    #[test]
    fn only_vendor_queries_info() {
        assert!(ProtocolProfile::Vendor.queries_info());
        assert!(!ProtocolProfile::Direct.queries_info());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Direct".parse::<ProtocolProfile>().unwrap(), ProtocolProfile::Direct);
        assert!("usb".parse::<ProtocolProfile>().is_err());
    }
}
