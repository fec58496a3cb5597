//! Native clipboard backend built on `arboard`
//!
//! `arboard` talks to X11/Wayland on Linux, NSPasteboard on macOS and the
//! Win32 clipboard on Windows, always handing back RGBA8 pixels. Its API is
//! blocking, so every query runs on tokio's blocking pool.
//!
//! A fresh `arboard::Clipboard` is opened per query, on whichever blocking
//! thread picks the task up.

use async_trait::async_trait;
use tracing::trace;

use super::{ClipboardBackend, RasterImage};
use crate::{
    error::{ClipboardError, ClipboardResult},
    model::ReaderType,
};

/// Clipboard backend using the platform's native API
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeClipboard;

impl NativeClipboard {
    /// Creates a new native backend
    pub fn new() -> Self {
        Self
    }

    /// Performs one blocking clipboard query
    fn fetch_blocking() -> ClipboardResult<Option<RasterImage>> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable {
            reason: e.to_string(),
        })?;

        let data = match clipboard.get_image() {
            Ok(data) => data,
            Err(arboard::Error::ContentNotAvailable) => return Ok(None),
            Err(e) => {
                return Err(ClipboardError::Unavailable {
                    reason: e.to_string(),
                });
            }
        };

        trace!(width = data.width, height = data.height, "Native clipboard returned image");

        let (width, height) = (data.width as u32, data.height as u32);
        RasterImage::from_rgba8(width, height, data.bytes.into_owned())
            .map(Some)
            .ok_or_else(|| {
                ClipboardError::Decode(format!(
                    "pixel buffer does not match {}x{} RGBA dimensions",
                    width, height
                ))
            })
    }
}

#[async_trait]
impl ClipboardBackend for NativeClipboard {
    async fn fetch_image(&self) -> ClipboardResult<Option<RasterImage>> {
        tokio::task::spawn_blocking(Self::fetch_blocking)
            .await
            .map_err(|e| ClipboardError::Unavailable {
                reason: format!("clipboard task failed: {}", e),
            })?
    }

    fn reader_type(&self) -> ReaderType {
        ReaderType::Native
    }
}
