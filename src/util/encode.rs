//! PNG encoding for saved clipboard images
//!
//! PNG is the only output format. Encoding keeps the source channel layout
//! (gray, RGB, RGBA, 8 or 16 bit) so the file decodes back to the exact pixels
//! that were compared against the last saved image. Float images, which PNG
//! cannot store, are widened to RGBA16 first.
//!
//! # Examples
//!
//! ```
//! use clipsave::{clipboard::RasterImage, util::encode::encode_png};
//!
//! let img = RasterImage::from_test_pattern(64, 64);
//! let png_bytes = encode_png(&img).unwrap();
//! assert_eq!(&png_bytes[..8], b"\x89PNG\r\n\x1a\n");
//! ```

use std::{borrow::Cow, io::Cursor};

use image::{
    ColorType, DynamicImage, ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{
    clipboard::RasterImage,
    error::{PersistError, PersistResult},
};

/// Encodes an image as PNG with default compression
pub fn encode_png(buffer: &RasterImage) -> PersistResult<Vec<u8>> {
    encode_png_with_compression(buffer, CompressionType::Default)
}

/// Encodes an image as PNG with specified compression level
///
/// Higher compression levels produce smaller files but take longer to encode.
/// Output is lossless at every level.
///
/// # Examples
///
/// ```
/// use clipsave::{clipboard::RasterImage, util::encode::encode_png_with_compression};
/// use image::codecs::png::CompressionType;
///
/// let img = RasterImage::from_test_pattern(100, 100);
///
/// let fast = encode_png_with_compression(&img, CompressionType::Fast).unwrap();
/// let best = encode_png_with_compression(&img, CompressionType::Best).unwrap();
/// assert_eq!(&fast[..4], &best[..4]);
/// ```
pub fn encode_png_with_compression(
    buffer: &RasterImage,
    compression: CompressionType,
) -> PersistResult<Vec<u8>> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return Err(PersistError::Encoding {
            format: "png".to_string(),
            reason: format!("image dimensions must be > 0, got {}x{}", width, height),
        });
    }

    let image = png_compatible(buffer.inner());
    let mut output = Vec::new();

    // Adaptive filtering picks the best filter per scanline
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    encoder
        .write_image(image.as_bytes(), width, height, image.color().into())
        .map_err(|e| PersistError::Encoding {
            format: "png".to_string(),
            reason: e.to_string(),
        })?;

    Ok(output)
}

/// Converts layouts PNG cannot hold into one it can
fn png_compatible(image: &DynamicImage) -> Cow<'_, DynamicImage> {
    match image.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => Cow::Borrowed(image),
        _ => Cow::Owned(DynamicImage::ImageRgba16(image.to_rgba16())),
    }
}
