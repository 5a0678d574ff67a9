//! Chunked image upload
//!
//! The USB bridge caps a single transfer at `max_transfer_bytes`. Rasters
//! are split into horizontal strips of whole rows:
//!
//! ```text
//! rows_per_chunk = max_transfer_bytes / width      (recomputed per call)
//! chunks         = ceil(height / rows_per_chunk)
//! ```
//!
//! Strips are sent top to bottom; the last one is clipped to the rows that
//! remain. A failing strip aborts the upload. Strips already sent stay in
//! the device's staging buffer.

use core::ops::Range;

use tracing::{debug, trace};

use crate::config::DriverConfig;
use crate::error::{DriverError, SizeError};
use crate::geometry::Rect;
use crate::info::DeviceInfo;
use crate::profile::ProtocolProfile;
use crate::transport::{DataPhase, Transport};

/// Rows of `width` bytes that fit in one transfer
///
/// # Errors
///
/// [`SizeError::RowTooWide`] when a single row exceeds `max_transfer`.
pub fn rows_per_chunk(width: u32, max_transfer: usize) -> Result<u32, SizeError> {
    let rows = max_transfer.checked_div(width as usize).unwrap_or(0);
    if rows == 0 {
        return Err(SizeError::RowTooWide { width, max_transfer });
    }
    Ok(u32::try_from(rows).unwrap_or(u32::MAX))
}

/// One strip of an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Panel rectangle covered by the strip
    pub rect: Rect,
    /// Byte range of the strip inside the caller's raster
    pub bytes: Range<usize>,
}

/// Iterator over the strips of a rectangle
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    rect: Rect,
    rows_per_chunk: u32,
    next_row: u32,
}

impl ChunkPlan {
    /// Plan strips for `rect` under a `max_transfer` byte ceiling
    ///
    /// # Errors
    ///
    /// [`SizeError::EmptyArea`] for a zero-sized rectangle and
    /// [`SizeError::RowTooWide`] when one row does not fit a transfer.
    pub fn new(rect: Rect, max_transfer: usize) -> Result<Self, SizeError> {
        if rect.width == 0 || rect.height == 0 {
            return Err(SizeError::EmptyArea);
        }
        Ok(Self {
            rect,
            rows_per_chunk: rows_per_chunk(rect.width, max_transfer)?,
            next_row: 0,
        })
    }

    /// Strip height used for every strip but possibly the last
    pub fn rows_per_chunk(&self) -> u32 {
        self.rows_per_chunk
    }

    /// Total number of strips
    pub fn chunk_count(&self) -> u32 {
        self.rect.height.div_ceil(self.rows_per_chunk)
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let remaining = self.rect.height.checked_sub(self.next_row).filter(|&r| r > 0)?;
        let rows = remaining.min(self.rows_per_chunk);
        let row_bytes = self.rect.width as usize;
        let start = (self.next_row as usize).checked_mul(row_bytes)?;
        let end = start.checked_add((rows as usize).checked_mul(row_bytes)?)?;
        let chunk = Chunk {
            rect: Rect::new(
                self.rect.x,
                self.rect.y.checked_add(self.next_row)?,
                self.rect.width,
                rows,
            ),
            bytes: start..end,
        };
        self.next_row = self.next_row.checked_add(rows)?;
        Some(chunk)
    }
}

/// Write `raster` into the device's image buffer at `rect`
///
/// Bounds, raster length, row width and profile field widths are all
/// checked before the first transfer.
///
/// # Errors
///
/// [`DriverError::Size`] for invalid input; otherwise the first transport
/// error, after which no further strips are sent.
pub fn upload<T: Transport + ?Sized>(
    transport: &mut T,
    profile: ProtocolProfile,
    info: &DeviceInfo,
    rect: &Rect,
    raster: &[u8],
    config: &DriverConfig,
) -> Result<(), DriverError> {
    rect.check_within(info.width, info.height)?;
    rect.check_raster(raster)?;
    profile.check_encodable(rect)?;
    let plan = ChunkPlan::new(*rect, config.max_transfer_bytes)?;

    debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        rows_per_chunk = plan.rows_per_chunk(),
        chunks = plan.chunk_count(),
        %profile,
        "upload"
    );

    for (index, chunk) in plan.enumerate() {
        let pixels = raster.get(chunk.bytes.clone()).ok_or(SizeError::RasterLength {
            expected: chunk.bytes.end,
            actual: raster.len(),
        })?;
        let request = profile.load_request(info.image_buffer_address, &chunk.rect, pixels)?;
        trace!(chunk = index, cdb = ?request.cdb, "load image area");
        transport.send(&request.cdb, DataPhase::ToDevice(&request.payload), config.timeout)?;
        debug!(chunk = index, y = chunk.rect.y, rows = chunk.rect.height, "chunk sent");
    }
    Ok(())
}
