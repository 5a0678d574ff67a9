//! Raster loading: raw 8-bit grayscale files and decoded images

use std::path::Path;

use anyhow::{ensure, Context, Result};
use image::imageops::FilterType;
use it8951_usb::Rect;

/// Read a raw 8-bit grayscale raster that must cover exactly `rect`
pub fn load_raw(path: &Path, rect: &Rect) -> Result<Vec<u8>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    ensure!(
        bytes.len() == rect.area(),
        "{} holds {} bytes but a {}x{} area needs {}",
        path.display(),
        bytes.len(),
        rect.width,
        rect.height,
        rect.area()
    );
    Ok(bytes)
}

/// Decode `path`, convert to grayscale and scale to `width` x `height`
pub fn load_image(path: &Path, width: u32, height: u32) -> Result<Vec<u8>> {
    let decoded = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    let scaled = if decoded.width() == width && decoded.height() == height {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };
    Ok(scaled.to_luma8().into_raw())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn raw_length_must_match_area() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.raw");
        std::fs::write(&path, vec![0u8; 99]).unwrap();

        let err = load_raw(&path, &Rect::new(0, 0, 10, 10)).unwrap_err();
        assert!(err.to_string().contains("holds 99 bytes"));
        assert_eq!(load_raw(&path, &Rect::new(0, 0, 9, 11)).unwrap().len(), 99);
    }

    #[test]
    fn image_is_scaled_to_panel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        image::RgbImage::from_pixel(40, 30, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let raster = load_image(&path, 20, 10).unwrap();
        assert_eq!(raster.len(), 200);
        assert!(raster.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_image(Path::new("/nonexistent/photo.jpg"), 1, 1).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/photo.jpg"));
    }
}
