// Bounded-size image encoding for scoring requests
// Vision requests carry base64 JPEG payloads; full-resolution originals
// would blow past request size and token limits.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::constants::{THUMB_JPEG_QUALITY, THUMB_MAX_DIM};
use crate::error::Result;

/// Re-encode an image as a JPEG no larger than max_dim on either side.
/// Aspect ratio is preserved and images are never upscaled.
pub fn encode_jpeg(image_path: &Path, max_dim: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::open(image_path)?;

    let img = if img.width() > max_dim || img.height() > max_dim {
        img.resize(max_dim, max_dim, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

/// Base64-encoded thumbnail for embedding in a data URI.
pub fn to_base64(image_path: &Path) -> Result<String> {
    let bytes = encode_jpeg(image_path, THUMB_MAX_DIM, THUMB_JPEG_QUALITY)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use tempfile::TempDir;

    fn write_test_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_large_image_is_bounded() {
        let tmp = TempDir::new().unwrap();
        let path = write_test_png(tmp.path(), "big.png", 1200, 800);

        let bytes = encode_jpeg(&path, 512, 60).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert!(thumb.width() <= 512);
        assert!(thumb.height() <= 512);
        // Aspect ratio preserved (3:2)
        assert_eq!(thumb.width(), 512);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let path = write_test_png(tmp.path(), "small.png", 100, 60);

        let bytes = encode_jpeg(&path, 512, 60).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.width(), 100);
        assert_eq!(thumb.height(), 60);
    }

    #[test]
    fn test_to_base64_roundtrips_as_jpeg() {
        let tmp = TempDir::new().unwrap();
        let path = write_test_png(tmp.path(), "img.png", 64, 64);

        let encoded = to_base64(&path).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        let img = image::load_from_memory_with_format(&decoded, image::ImageFormat::Jpeg).unwrap();
        assert_eq!(img.width(), 64);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(encode_jpeg(&tmp.path().join("nope.jpg"), 512, 60).is_err());
    }
}
