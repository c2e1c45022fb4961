//! Payload validation.

use super::outcome::FetchFailure;
use image::ImageReader;
use std::io::Cursor;

/// Checks that `bytes` is a decodable raster image and returns its size.
///
/// Tile servers answer some missing tiles with 200 and an HTML or empty
/// body; decoding is the only reliable test.
pub fn validate_image(bytes: &[u8]) -> Result<(u32, u32), FetchFailure> {
    if bytes.is_empty() {
        return Err(FetchFailure::Decode("empty payload".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| FetchFailure::Decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(FetchFailure::Decode("unrecognised image format".to_string()));
    }

    let image = reader
        .decode()
        .map_err(|e| FetchFailure::Decode(e.to_string()))?;
    Ok((image.width(), image.height()))
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_png() {
        let bytes = sample_png(8, 4);
        assert_eq!(validate_image(&bytes).unwrap(), (8, 4));
    }

    #[test]
    fn test_empty_payload() {
        assert!(matches!(validate_image(&[]), Err(FetchFailure::Decode(_))));
    }

    #[test]
    fn test_html_payload() {
        let html = b"<html><body>quota exceeded</body></html>";
        assert!(matches!(validate_image(html), Err(FetchFailure::Decode(_))));
    }

    #[test]
    fn test_truncated_png() {
        let bytes = sample_png(16, 16);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(validate_image(truncated), Err(FetchFailure::Decode(_))));
    }
}
