//! Property-based tests for upload chunking.
//! Verifies the strip partition holds for ALL in-bounds rectangles, not just
//! the reference panel.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use it8951_usb::mock::RecordingTransport;
use it8951_usb::{
    rows_per_chunk, upload, ChunkPlan, DeviceInfo, DriverConfig, ProtocolProfile, Rect,
    SizeError, FALLBACK_PANEL,
};
use proptest::prelude::*;

const PANEL_W: u32 = 1872;
const PANEL_H: u32 = 1404;

fn info() -> DeviceInfo {
    DeviceInfo::fallback(&FALLBACK_PANEL, 0x0011_9F00)
}

/// In-bounds rectangle on the reference panel
fn rect_strategy() -> impl Strategy<Value = Rect> {
    (0..PANEL_W, 0..PANEL_H).prop_flat_map(|(x, y)| {
        (1..=PANEL_W - x, 1..=PANEL_H - y).prop_map(move |(w, h)| Rect::new(x, y, w, h))
    })
}

proptest! {
    /// Strips cover [y, y+h) exactly once, top to bottom, with no gaps.
    #[test]
    fn strips_partition_the_rectangle(rect in rect_strategy(), max in 1usize..=200_000) {
        prop_assume!(max >= rect.width as usize);
        let plan = ChunkPlan::new(rect, max).unwrap();
        let rows = plan.rows_per_chunk();
        let expected = plan.chunk_count();
        let chunks: Vec<_> = plan.collect();

        prop_assert_eq!(chunks.len() as u32, rect.height.div_ceil(rows));
        prop_assert_eq!(chunks.len() as u32, expected);

        let mut next_y = rect.y;
        let mut next_byte = 0usize;
        for chunk in &chunks {
            prop_assert_eq!(chunk.rect.x, rect.x);
            prop_assert_eq!(chunk.rect.width, rect.width);
            prop_assert_eq!(chunk.rect.y, next_y);
            prop_assert!(chunk.rect.height >= 1 && chunk.rect.height <= rows);
            prop_assert_eq!(chunk.bytes.start, next_byte);
            prop_assert!(chunk.bytes.len() <= max);
            next_y += chunk.rect.height;
            next_byte = chunk.bytes.end;
        }
        prop_assert_eq!(next_y, rect.y + rect.height);
        prop_assert_eq!(next_byte, rect.area());
    }

    /// rows_per_chunk is floor(max / width) and never zero.
    #[test]
    fn rows_per_chunk_is_floor_division(width in 1u32..=4096, max in 1usize..=1_000_000) {
        match rows_per_chunk(width, max) {
            Ok(rows) => {
                prop_assert!(rows >= 1);
                prop_assert_eq!(rows as usize, max / width as usize);
            }
            Err(SizeError::RowTooWide { .. }) => prop_assert!(max < width as usize),
            Err(other) => return Err(TestCaseError::fail(format!("unexpected error {other:?}"))),
        }
    }

    /// Raster content never changes the strips sent.
    #[test]
    fn content_does_not_affect_chunking(rect in rect_strategy(), fill_a: u8, fill_b: u8) {
        let config = DriverConfig { max_transfer_bytes: 60_800, ..DriverConfig::default() };
        let mut first = RecordingTransport::new();
        let mut second = RecordingTransport::new();
        let a = vec![fill_a; rect.area()];
        let b = vec![fill_b; rect.area()];

        upload(&mut first, ProtocolProfile::Vendor, &info(), &rect, &a, &config).unwrap();
        upload(&mut second, ProtocolProfile::Vendor, &info(), &rect, &b, &config).unwrap();

        let rects_a: Vec<_> = first.transfers().iter().map(|t| t.rect()).collect();
        let rects_b: Vec<_> = second.transfers().iter().map(|t| t.rect()).collect();
        prop_assert_eq!(rects_a, rects_b);
    }

    /// Out-of-bounds rectangles fail before any transfer.
    #[test]
    fn out_of_bounds_sends_nothing(x in 0u32..PANEL_W, w in 1u32..=PANEL_W) {
        prop_assume!(x + w > PANEL_W);
        let mut transport = RecordingTransport::new();
        let rect = Rect::new(x, 0, w, 1);
        let raster = vec![0u8; rect.area()];
        let err = upload(
            &mut transport,
            ProtocolProfile::Vendor,
            &info(),
            &rect,
            &raster,
            &DriverConfig::default(),
        )
        .unwrap_err();
        let out_of_bounds =
            matches!(err, it8951_usb::DriverError::Size(SizeError::OutOfBounds { .. }));
        prop_assert!(out_of_bounds, "unexpected error {:?}", err);
        prop_assert!(transport.transfers().is_empty());
    }
}
