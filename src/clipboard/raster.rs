//! Decoded raster images and their comparable pixel buffers
//!
//! [`RasterImage`] wraps `image::DynamicImage` so every clipboard backend hands
//! the watcher the same type regardless of how the pixels arrived (raw RGBA
//! from the native API, PNG bytes from PowerShell). [`PixelBuffer`] is the
//! owned snapshot of an image's raw pixels used for change detection.
//!
//! # Examples
//!
//! ```
//! use clipsave::clipboard::RasterImage;
//!
//! let a = RasterImage::solid(4, 4, [255, 0, 0, 255]);
//! let b = RasterImage::solid(4, 4, [0, 0, 255, 255]);
//!
//! assert_eq!(a.pixel_buffer(), a.clone().pixel_buffer());
//! assert_ne!(a.pixel_buffer(), b.pixel_buffer());
//! ```

use std::fmt;

use image::{ColorType, DynamicImage, GenericImageView};

use crate::error::{ClipboardError, ClipboardResult};

/// A decoded image: dimensions, channel layout and pixel data
#[derive(Clone, Debug)]
pub struct RasterImage {
    inner: DynamicImage,
}

impl RasterImage {
    /// Creates a new RasterImage from a DynamicImage
    pub fn new(image: DynamicImage) -> Self {
        Self { inner: image }
    }

    /// Builds an image from tightly packed RGBA8 bytes
    ///
    /// Returns `None` when `bytes` does not hold exactly
    /// `width * height * 4` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use clipsave::clipboard::RasterImage;
    ///
    /// let img = RasterImage::from_rgba8(2, 1, vec![0; 8]).unwrap();
    /// assert_eq!(img.dimensions(), (2, 1));
    ///
    /// assert!(RasterImage::from_rgba8(2, 2, vec![0; 8]).is_none());
    /// ```
    pub fn from_rgba8(width: u32, height: u32, bytes: Vec<u8>) -> Option<Self> {
        image::RgbaImage::from_raw(width, height, bytes)
            .map(|img| Self::new(DynamicImage::ImageRgba8(img)))
    }

    /// Decodes an encoded image (PNG, as produced by the clipboard helpers)
    pub fn decode(bytes: &[u8]) -> ClipboardResult<Self> {
        image::load_from_memory(bytes)
            .map(Self::new)
            .map_err(|e| ClipboardError::Decode(e.to_string()))
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Returns the image width in pixels
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Returns the image height in pixels
    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Channel layout of the pixel data
    pub fn color_type(&self) -> ColorType {
        self.inner.color()
    }

    /// Whether either dimension is zero
    pub fn is_empty(&self) -> bool {
        let (width, height) = self.dimensions();
        width == 0 || height == 0
    }

    /// Returns a reference to the raw pixel data as bytes
    ///
    /// The byte layout follows [`color_type`](Self::color_type).
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Copies the raw pixels into a [`PixelBuffer`] for change detection
    pub fn pixel_buffer(&self) -> PixelBuffer {
        let (width, height) = self.dimensions();
        PixelBuffer {
            width,
            height,
            color_type: self.color_type(),
            bytes: self.as_bytes().to_vec(),
        }
    }

    /// Whether this image's pixels equal `buffer` exactly
    ///
    /// Avoids copying the pixels when the caller only needs the comparison.
    pub fn matches(&self, buffer: &PixelBuffer) -> bool {
        self.dimensions() == (buffer.width, buffer.height)
            && self.color_type() == buffer.color_type
            && self.as_bytes() == buffer.bytes
    }

    /// Creates an image filled with a single RGBA color
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        Self::new(DynamicImage::ImageRgba8(img))
    }

    /// Creates a test pattern image with the specified dimensions
    ///
    /// The pattern is a vertical gradient from blue (top) to cyan (bottom).
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        let img = image::RgbaImage::from_fn(width, height, |_x, y| {
            let ratio = y as f32 / height.max(1) as f32;
            image::Rgba([0, (255.0 * ratio) as u8, 255, 255])
        });

        Self::new(DynamicImage::ImageRgba8(img))
    }

    /// Returns a reference to the inner DynamicImage
    pub fn inner(&self) -> &DynamicImage {
        &self.inner
    }

    /// Consumes self and returns the inner DynamicImage
    pub fn into_inner(self) -> DynamicImage {
        self.inner
    }
}

/// Owned copy of an image's raw pixels plus its shape
///
/// Two buffers are equal only if dimensions, channel layout and every byte
/// match.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width:      u32,
    height:     u32,
    color_type: ColorType,
    bytes:      Vec<u8>,
}

impl PixelBuffer {
    /// Returns the dimensions of the buffer as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Channel layout the bytes are stored in
    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    /// Returns the raw pixel bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of pixel bytes held
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer holds no pixels
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("color_type", &self.color_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
