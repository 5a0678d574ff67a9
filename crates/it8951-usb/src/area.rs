//! Area descriptors sent as the payload of load/display commands
//!
//! The controller is big-endian. Each field is written with `to_be_bytes`
//! one at a time; nothing here depends on host layout or struct padding.
//!
//! ```text
//! LoadArea     (20 bytes): address | x | y | width | height
//! DisplayArea  (28 bytes): address | mode | x | y | width | height | wait_ready
//! ```

use crate::geometry::Rect;

/// Encoded size of [`LoadArea`]
pub const LOAD_AREA_LEN: usize = 20;
/// Encoded size of [`DisplayArea`]
pub const DISPLAY_AREA_LEN: usize = 28;

/// Header prepended to every image chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadArea {
    /// Device image-buffer base address
    pub address: u32,
    /// Target rectangle of this chunk
    pub rect: Rect,
}

impl LoadArea {
    /// Serialise to wire order
    pub fn encode(&self) -> [u8; LOAD_AREA_LEN] {
        let mut out = [0u8; LOAD_AREA_LEN];
        let fields = [
            self.address,
            self.rect.x,
            self.rect.y,
            self.rect.width,
            self.rect.height,
        ];
        for (slot, field) in out.chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&field.to_be_bytes());
        }
        out
    }

    /// Parse the first [`LOAD_AREA_LEN`] bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let [address, x, y, width, height] = be_words::<5>(bytes)?;
        Some(Self {
            address,
            rect: Rect::new(x, y, width, height),
        })
    }
}

/// Payload of the display-area (refresh) command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayArea {
    /// Device image-buffer base address
    pub address: u32,
    /// Waveform wire value
    pub mode: u32,
    /// Region to refresh
    pub rect: Rect,
    /// Ask the controller to hold the command until the refresh finishes
    pub wait_ready: bool,
}

impl DisplayArea {
    /// Serialise to wire order
    pub fn encode(&self) -> [u8; DISPLAY_AREA_LEN] {
        let mut out = [0u8; DISPLAY_AREA_LEN];
        let fields = [
            self.address,
            self.mode,
            self.rect.x,
            self.rect.y,
            self.rect.width,
            self.rect.height,
            u32::from(self.wait_ready),
        ];
        for (slot, field) in out.chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&field.to_be_bytes());
        }
        out
    }

    /// Parse the first [`DISPLAY_AREA_LEN`] bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let [address, mode, x, y, width, height, wait] = be_words::<7>(bytes)?;
        Some(Self {
            address,
            mode,
            rect: Rect::new(x, y, width, height),
            wait_ready: wait != 0,
        })
    }
}

/// Read `N` consecutive big-endian u32 words
pub(crate) fn be_words<const N: usize>(bytes: &[u8]) -> Option<[u32; N]> {
    let mut words = [0u32; N];
    for (index, word) in words.iter_mut().enumerate() {
        let start = index.checked_mul(4)?;
        let raw: [u8; 4] = bytes.get(start..start.checked_add(4)?)?.try_into().ok()?;
        *word = u32::from_be_bytes(raw);
    }
    Some(words)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn load_area_is_big_endian() {
        let area = LoadArea {
            address: 0x0012_3456,
            rect: Rect::new(1, 0x0100, 1872, 32),
        };
        assert_eq!(
            area.encode(),
            [
                0x00, 0x12, 0x34, 0x56, // address
                0x00, 0x00, 0x00, 0x01, // x
                0x00, 0x00, 0x01, 0x00, // y
                0x00, 0x00, 0x07, 0x50, // width 1872
                0x00, 0x00, 0x00, 0x20, // height 32
            ]
        );
    }

    #[test]
    fn display_area_field_order() {
        let area = DisplayArea {
            address: 0xAABB_CCDD,
            mode: 2,
            rect: Rect::new(0, 0, 1872, 1404),
            wait_ready: true,
        };
        let bytes = area.encode();
        assert_eq!(&bytes[0..4], &[0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]);
        assert_eq!(&bytes[16..20], &1872u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &1404u32.to_be_bytes());
        assert_eq!(&bytes[24..28], &[0, 0, 0, 1]);
    }

    #[test]
    fn wait_ready_false_encodes_zero() {
        let area = DisplayArea {
            address: 0,
            mode: 4,
            rect: Rect::new(0, 0, 1, 1),
            wait_ready: false,
        };
        assert_eq!(&area.encode()[24..28], &[0, 0, 0, 0]);
    }

    #[test]
    fn decode_reads_encoded_descriptor() {
        let area = DisplayArea {
            address: 0x1234,
            mode: 1,
            rect: Rect::new(8, 16, 32, 64),
            wait_ready: true,
        };
        assert_eq!(DisplayArea::decode(&area.encode()), Some(area));
    }

    #[test]
    fn decode_rejects_short_input() {
        assert_eq!(LoadArea::decode(&[0u8; LOAD_AREA_LEN - 1]), None);
        assert_eq!(DisplayArea::decode(&[0u8; 20]), None);
    }
}
