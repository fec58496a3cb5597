//! Clipboard access
//!
//! Reading the clipboard is split in two layers:
//!
//! - [`ClipboardBackend`]: one implementation per platform mechanism. Backends
//!   report failures honestly through [`ClipboardResult`].
//! - [`ClipboardReader`]: the forgiving facade the watcher uses. It bounds each
//!   query with a timeout and folds every failure into "no image", so a single
//!   bad poll never stops the loop.
//!
//! | Backend | Platforms | Mechanism |
//! |---------|-----------|-----------|
//! | [`NativeClipboard`] | Linux (X11/Wayland), macOS, Windows | `arboard` |
//! | [`PowerShellClipboard`] | WSL, Windows | `powershell.exe` subprocess |
//! | [`MockClipboard`] | tests | scripted frames |

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{ClipboardError, ClipboardResult},
    model::ReaderType,
};

pub mod mock;
#[cfg(feature = "native-clipboard")]
pub mod native_backend;
pub mod powershell_backend;
pub mod raster;

pub use mock::{MockClipboard, MockFrame};
#[cfg(feature = "native-clipboard")]
pub use native_backend::NativeClipboard;
pub use powershell_backend::PowerShellClipboard;
pub use raster::{PixelBuffer, RasterImage};

/// A source of the clipboard's current image content
///
/// Implementations return `Ok(None)` when the clipboard holds no image and
/// `Err` for anything that went wrong while asking. They do not need to apply
/// their own timeout; [`ClipboardReader`] does that.
#[async_trait]
pub trait ClipboardBackend: Send + Sync {
    /// Queries the clipboard once and decodes any image found
    async fn fetch_image(&self) -> ClipboardResult<Option<RasterImage>>;

    /// Which mechanism this backend uses
    fn reader_type(&self) -> ReaderType;
}

/// Timeout-bounded, failure-swallowing clipboard reader
///
/// # Examples
///
/// ```
/// use std::{sync::Arc, time::Duration};
///
/// use clipsave::clipboard::{ClipboardReader, MockClipboard, MockFrame, RasterImage};
///
/// #[tokio::main]
/// async fn main() {
///     let mock = MockClipboard::new(vec![
///         MockFrame::Empty,
///         MockFrame::Image(RasterImage::solid(2, 2, [0, 0, 0, 255])),
///     ]);
///     let reader = ClipboardReader::new(Arc::new(mock), Duration::from_secs(1));
///
///     assert!(reader.read().await.is_none());
///     assert!(reader.read().await.is_some());
/// }
/// ```
#[derive(Clone)]
pub struct ClipboardReader {
    backend: Arc<dyn ClipboardBackend>,
    timeout: Duration,
}

impl ClipboardReader {
    /// Wraps `backend`, capping each query at `timeout`
    pub fn new(backend: Arc<dyn ClipboardBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Returns the clipboard's current image, or `None`
    ///
    /// `None` covers an empty clipboard, non-image content, a zero-sized
    /// image, a timed out query and any backend error.
    pub async fn read(&self) -> Option<RasterImage> {
        match self.try_read().await {
            Ok(image) => image,
            Err(e) => {
                debug!(reader = %self.backend.reader_type(), "Clipboard read failed: {}", e);
                None
            }
        }
    }

    /// Like [`read`](Self::read) but keeps the failure reason
    ///
    /// A zero-width or zero-height image is reported as
    /// [`ClipboardError::Decode`].
    pub async fn try_read(&self) -> ClipboardResult<Option<RasterImage>> {
        let image = tokio::time::timeout(self.timeout, self.backend.fetch_image())
            .await
            .map_err(|_| ClipboardError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            })??;

        match image {
            Some(image) if image.is_empty() => {
                let (width, height) = image.dimensions();
                Err(ClipboardError::Decode(format!(
                    "clipboard image has no pixels ({}x{})",
                    width, height
                )))
            }
            image => Ok(image),
        }
    }

    /// Which mechanism the wrapped backend uses
    pub fn reader_type(&self) -> ReaderType {
        self.backend.reader_type()
    }

    /// The per-query timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for ClipboardReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipboardReader")
            .field("reader", &self.backend.reader_type())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Creates the clipboard reader for the current platform
///
/// - **WSL**: [`PowerShellClipboard`] through Windows interop
/// - **Linux/macOS/Windows** with `native-clipboard`: [`NativeClipboard`]
/// - **Windows** without `native-clipboard`: [`PowerShellClipboard`]
/// - Anything else: [`ClipboardError::BackendNotAvailable`]
pub fn create_default_reader(timeout: Duration) -> ClipboardResult<ClipboardReader> {
    let platform = crate::util::detect::detect_platform();

    let backend: Arc<dyn ClipboardBackend> = match platform.reader {
        Some(ReaderType::PowerShell) => Arc::new(PowerShellClipboard::new()),
        #[cfg(feature = "native-clipboard")]
        Some(ReaderType::Native) => Arc::new(NativeClipboard::new()),
        Some(reader) => return Err(ClipboardError::BackendNotAvailable { reader }),
        None => {
            return Err(ClipboardError::BackendNotAvailable {
                reader: ReaderType::Native,
            });
        }
    };

    debug!(
        os = %platform.os,
        wsl = platform.wsl,
        reader = %backend.reader_type(),
        "Clipboard reader selected"
    );
    Ok(ClipboardReader::new(backend, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_passes_through_image() {
        let image = RasterImage::from_test_pattern(8, 8);
        let reader = ClipboardReader::new(
            Arc::new(MockClipboard::new(vec![MockFrame::Image(image.clone())])),
            Duration::from_secs(1),
        );

        let read = reader.read().await.expect("image expected");
        assert!(read.matches(&image.pixel_buffer()));
    }

    #[tokio::test]
    async fn test_read_swallows_backend_error() {
        let reader = ClipboardReader::new(
            Arc::new(MockClipboard::new(vec![MockFrame::Error(ClipboardError::Unavailable {
                reason: "locked".to_string(),
            })])),
            Duration::from_secs(1),
        );

        assert!(reader.read().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_sized_image_is_decode_error() {
        let empty = RasterImage::new(image::DynamicImage::new_rgba8(0, 0));
        let reader = ClipboardReader::new(
            Arc::new(MockClipboard::new(vec![
                MockFrame::Image(empty.clone()),
                MockFrame::Image(empty),
            ])),
            Duration::from_secs(1),
        );

        let result = reader.try_read().await;
        assert!(matches!(result, Err(ClipboardError::Decode(ref msg)) if msg.contains("0x0")));
        assert!(reader.read().await.is_none());
    }

    #[tokio::test]
    async fn test_try_read_reports_timeout() {
        let mock = MockClipboard::new(vec![MockFrame::Delayed(
            Duration::from_secs(30),
            RasterImage::solid(1, 1, [0, 0, 0, 255]),
        )]);
        let reader = ClipboardReader::new(Arc::new(mock), Duration::from_millis(20));

        let result = reader.try_read().await;
        assert!(matches!(result, Err(ClipboardError::Timeout { duration_ms: 20 })));
    }

    #[tokio::test]
    async fn test_read_normalizes_timeout_to_none() {
        let mock = MockClipboard::new(vec![MockFrame::Delayed(
            Duration::from_secs(30),
            RasterImage::solid(1, 1, [0, 0, 0, 255]),
        )]);
        let reader = ClipboardReader::new(Arc::new(mock), Duration::from_millis(20));

        let started = std::time::Instant::now();
        assert!(reader.read().await.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_reader_debug_shows_reader_type() {
        let reader =
            ClipboardReader::new(Arc::new(MockClipboard::new(vec![])), Duration::from_secs(5));
        assert_eq!(reader.reader_type(), ReaderType::Mock);
        assert_eq!(reader.timeout(), Duration::from_secs(5));

        let debug = format!("{:?}", reader);
        assert!(debug.contains("Mock"));
    }
}
