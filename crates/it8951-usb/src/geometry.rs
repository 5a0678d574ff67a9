//! Panel-space rectangles

use crate::error::SizeError;

/// Rectangle in panel coordinates (pixels, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Create a rectangle; no validation happens until [`Rect::check_within`]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole `width` x `height` panel
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Number of pixels (and raster bytes) covered
    pub fn area(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Verify the rectangle is non-empty and lies inside the panel
    pub fn check_within(&self, panel_width: u32, panel_height: u32) -> Result<(), SizeError> {
        if self.width == 0 || self.height == 0 {
            return Err(SizeError::EmptyArea);
        }
        let fits_x = self.x.checked_add(self.width).is_some_and(|r| r <= panel_width);
        let fits_y = self.y.checked_add(self.height).is_some_and(|b| b <= panel_height);
        if fits_x && fits_y {
            Ok(())
        } else {
            Err(SizeError::OutOfBounds {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
                panel_width,
                panel_height,
            })
        }
    }

    /// Verify `raster` holds exactly one byte per pixel of this rectangle
    pub fn check_raster(&self, raster: &[u8]) -> Result<(), SizeError> {
        let expected = self.area();
        if raster.len() == expected {
            Ok(())
        } else {
            Err(SizeError::RasterLength { expected, actual: raster.len() })
        }
    }
}
