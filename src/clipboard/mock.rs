//! Scripted clipboard backend for testing
//!
//! [`MockClipboard`] replays a fixed sequence of [`MockFrame`]s, one per
//! [`fetch_image`](ClipboardBackend::fetch_image) call. Once the script runs
//! out the clipboard reads as empty, so a watcher driven by a mock keeps
//! polling harmlessly until it is shut down.
//!
//! # Examples
//!
//! ```
//! use clipsave::{
//!     clipboard::{ClipboardBackend, MockClipboard, MockFrame, RasterImage},
//!     error::ClipboardError,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockClipboard::new(vec![
//!         MockFrame::Image(RasterImage::solid(2, 2, [255, 0, 0, 255])),
//!         MockFrame::Error(ClipboardError::Timeout { duration_ms: 5000 }),
//!     ]);
//!
//!     assert!(mock.fetch_image().await.unwrap().is_some());
//!     assert!(mock.fetch_image().await.is_err());
//!     assert!(mock.fetch_image().await.unwrap().is_none());
//!     assert_eq!(mock.polls(), 3);
//! }
//! ```

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use super::{ClipboardBackend, RasterImage};
use crate::{error::ClipboardResult, model::ReaderType};

/// One scripted clipboard answer
#[derive(Debug)]
pub enum MockFrame {
    /// The clipboard holds this image
    Image(RasterImage),
    /// The clipboard holds nothing (or non-image data)
    Empty,
    /// The query fails with this error
    Error(crate::error::ClipboardError),
    /// The query takes this long, then yields the image
    Delayed(Duration, RasterImage),
}

/// Clipboard backend that replays a script
#[derive(Debug, Default)]
pub struct MockClipboard {
    frames: Mutex<VecDeque<MockFrame>>,
    polls:  Mutex<usize>,
}

impl MockClipboard {
    /// Creates a mock that answers with `frames` in order
    pub fn new(frames: impl IntoIterator<Item = MockFrame>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
            polls:  Mutex::new(0),
        }
    }

    /// Builds a script from optional images: `Some` is an image, `None` empty
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = Option<RasterImage>>) -> Self {
        Self::new(snapshots.into_iter().map(|snapshot| match snapshot {
            Some(image) => MockFrame::Image(image),
            None => MockFrame::Empty,
        }))
    }

    /// Appends a frame to the end of the script
    pub fn push(&self, frame: MockFrame) {
        self.frames.lock().push_back(frame);
    }

    /// Number of queries answered so far
    pub fn polls(&self) -> usize {
        *self.polls.lock()
    }

    /// Number of scripted frames not yet replayed
    pub fn remaining(&self) -> usize {
        self.frames.lock().len()
    }
}

#[async_trait]
impl ClipboardBackend for MockClipboard {
    async fn fetch_image(&self) -> ClipboardResult<Option<RasterImage>> {
        *self.polls.lock() += 1;
        // Guard must be released before any await
        let frame = self.frames.lock().pop_front();

        match frame {
            Some(MockFrame::Image(image)) => Ok(Some(image)),
            Some(MockFrame::Empty) | None => Ok(None),
            Some(MockFrame::Error(error)) => Err(error),
            Some(MockFrame::Delayed(delay, image)) => {
                sleep(delay).await;
                Ok(Some(image))
            }
        }
    }

    fn reader_type(&self) -> ReaderType {
        ReaderType::Mock
    }
}
