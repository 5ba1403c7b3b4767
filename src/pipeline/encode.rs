//! Image encoding: `DynamicImage` → PNG bytes → base64.
//!
//! The generation API accepts images as base64 data embedded in the JSON
//! request body. PNG is chosen over JPEG because it is lossless — fine
//! detail in radiographs and scanned reports matters far more than file
//! size, and JPEG artefacts on rendered text degrade what the vision
//! model can read.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Re-encode a decoded bitmap as PNG bytes ready for transmission.
pub fn png_bytes(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded image → {} PNG bytes", buf.len());
    Ok(buf)
}

/// Base64-wrap PNG bytes for the request body (and for inline previews).
pub fn base64_png(png: &[u8]) -> String {
    STANDARD.encode(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let bytes = png_bytes(&img).expect("encode should succeed");
        // PNG magic bytes
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);

        let b64 = base64_png(&bytes);
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        assert_eq!(decoded, bytes);
    }
}
