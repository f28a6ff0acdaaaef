//! PNG data URL codec for image payloads.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::error::{BackendError, Result};

const PNG_PREFIX: &str = "data:image/png;base64,";

/// Encode an image as a lossless PNG data URL.
pub fn encode_png(image: &DynamicImage) -> Result<String> {
    let bytes = png_bytes(image)?;
    let mut url = String::with_capacity(PNG_PREFIX.len() + bytes.len() * 4 / 3 + 4);
    url.push_str(PNG_PREFIX);
    BASE64.encode_string(&bytes, &mut url);
    Ok(url)
}

/// Encode an image to raw PNG bytes.
pub fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Extract the raw bytes from a base64 data URL.
pub fn decode_bytes(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| BackendError::data_url("missing 'data:' scheme"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| BackendError::data_url("missing ',' separator"))?;
    if !header.ends_with(";base64") {
        return Err(BackendError::data_url(format!(
            "unsupported encoding in header '{}'",
            header
        )));
    }
    BASE64
        .decode(payload.trim())
        .map_err(|e| BackendError::data_url(e.to_string()))
}

/// Decode a data URL into an image.
pub fn decode_image(url: &str) -> Result<DynamicImage> {
    let bytes = decode_bytes(url)?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_encode_has_png_prefix() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(4, 3));
        let url = encode_png(&img).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_decode_preserves_pixels() {
        let mut gray = GrayImage::new(5, 5);
        gray.put_pixel(2, 3, Luma([255]));
        let url = encode_png(&DynamicImage::ImageLuma8(gray.clone())).unwrap();

        let decoded = decode_image(&url).unwrap().to_luma8();
        assert_eq!(decoded, gray);
    }

    #[test]
    fn test_decode_rejects_plain_base64() {
        assert!(matches!(
            decode_bytes("iVBORw0KGgo="),
            Err(BackendError::DataUrl(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_base64_header() {
        assert!(matches!(
            decode_bytes("data:text/plain,hello"),
            Err(BackendError::DataUrl(_))
        ));
    }
}
