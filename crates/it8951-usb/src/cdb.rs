//! SCSI command descriptor blocks for the IT8951 USB bridge
//!
//! Every command is a vendor-specific CDB (opcode `0xFE`). The sub-opcode
//! that selects the operation sits at byte 6 of the 16-byte commands; the
//! 12-byte system-info command additionally carries the ASCII chip
//! signature and a protocol version.
//!
//! ```text
//! get system info (12):  FE 00 '8' '9' '5' '1' 80 00 01 00 02 00
//! load image area (16):  FE 00 00 00 00 00 A2 00 00 00 00 00 00 00 00 00
//! display area    (16):  FE 00 00 00 00 00 94 00 00 00 00 00 00 00 00 00
//! ```
//!
//! The direct profile reuses the two 16-byte commands but packs the target
//! rectangle into bytes 7..15 instead of sending an area descriptor:
//!
//! ```text
//! byte  0    6     7..9   9..11  11..13  13..15  15
//!       FE   sub   x      y      w       h       mode (display only)
//! ```

use crate::error::SizeError;
use crate::geometry::Rect;

/// Vendor-specific SCSI opcode
pub const OPCODE_VENDOR: u8 = 0xFE;

/// ASCII chip signature carried by the system-info command
pub const SIGNATURE: [u8; 4] = *b"8951";

/// Get-system-info sub-opcode
pub const GET_SYSTEM_INFO: u8 = 0x80;
/// Load-image-area sub-opcode
pub const LOAD_IMAGE_AREA: u8 = 0xA2;
/// Display-area sub-opcode
pub const DISPLAY_AREA: u8 = 0x94;

/// Protocol version field of the system-info command
pub const PROTOCOL_VERSION: [u8; 4] = [0x01, 0x00, 0x02, 0x00];

/// Length of the system-info command
pub const INFO_CDB_LEN: usize = 12;
/// Length of the image and display commands
pub const AREA_CDB_LEN: usize = 16;

/// Byte offset of the sub-opcode in 16-byte commands
const SUB_OPCODE_OFFSET: usize = 6;

/// Build the 12-byte get-system-info command
pub const fn get_system_info() -> [u8; INFO_CDB_LEN] {
    [
        OPCODE_VENDOR,
        0x00,
        SIGNATURE[0],
        SIGNATURE[1],
        SIGNATURE[2],
        SIGNATURE[3],
        GET_SYSTEM_INFO,
        0x00,
        PROTOCOL_VERSION[0],
        PROTOCOL_VERSION[1],
        PROTOCOL_VERSION[2],
        PROTOCOL_VERSION[3],
    ]
}

/// Build a 16-byte area command carrying only the sub-opcode
const fn area_command(sub_opcode: u8) -> [u8; AREA_CDB_LEN] {
    let mut cdb = [0u8; AREA_CDB_LEN];
    cdb[0] = OPCODE_VENDOR;
    cdb[SUB_OPCODE_OFFSET] = sub_opcode;
    cdb
}

/// Load-image-area command; the area descriptor travels in the payload
pub const fn load_image_area() -> [u8; AREA_CDB_LEN] {
    area_command(LOAD_IMAGE_AREA)
}

/// Display-area command; the area descriptor travels in the payload
pub const fn display_area() -> [u8; AREA_CDB_LEN] {
    area_command(DISPLAY_AREA)
}

/// Direct-profile load-image command with the rectangle in the CDB
pub fn direct_load_image(rect: &Rect) -> Result<[u8; AREA_CDB_LEN], SizeError> {
    direct_command(LOAD_IMAGE_AREA, rect, 0)
}

/// Direct-profile display command with rectangle and mode in the CDB
pub fn direct_display(rect: &Rect, mode: u32) -> Result<[u8; AREA_CDB_LEN], SizeError> {
    let mode = u8::try_from(mode).map_err(|_| SizeError::FieldOverflow {
        field: "mode",
        value: mode,
        bits: 8,
    })?;
    direct_command(DISPLAY_AREA, rect, mode)
}

fn direct_command(sub_opcode: u8, rect: &Rect, mode: u8) -> Result<[u8; AREA_CDB_LEN], SizeError> {
    let [x0, x1] = be16("x", rect.x)?;
    let [y0, y1] = be16("y", rect.y)?;
    let [w0, w1] = be16("width", rect.width)?;
    let [h0, h1] = be16("height", rect.height)?;
    Ok([
        OPCODE_VENDOR,
        0x00,
        0x00,
        0x00,
        0x00,
        0x00,
        sub_opcode,
        x0,
        x1,
        y0,
        y1,
        w0,
        w1,
        h0,
        h1,
        mode,
    ])
}

fn be16(field: &'static str, value: u32) -> Result<[u8; 2], SizeError> {
    u16::try_from(value)
        .map(u16::to_be_bytes)
        .map_err(|_| SizeError::FieldOverflow { field, value, bits: 16 })
}
