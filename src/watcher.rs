//! The polling loop
//!
//! [`Watcher`] ties a [`ClipboardReader`] to an [`ImageSink`], by default an
//! [`ImagePersister`]:
//!
//! ```text
//! Idle -> Polling -> (Saving)? -> Sleeping -> Polling -> ...
//!                                      \
//!                                       +-> Stopped (shutdown or fatal error)
//! ```
//!
//! Clipboard failures never leave the reader, so the loop only stops when the
//! shutdown future completes, the sink reports an error, or the sink is
//! exhausted.
//! The shutdown future is watched while reading the clipboard and while
//! sleeping, but a save that has started always runs to completion.

use std::{future::Future, time::Duration};

use tracing::{debug, error, info};

use crate::{
    clipboard::{ClipboardReader, PixelBuffer, RasterImage},
    error::PersistResult,
    model::SavedFile,
    persist::{ImagePersister, ImageSink},
};

/// Where the watcher is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Created, not yet polled
    Idle,
    /// Waiting on the clipboard
    Polling,
    /// Writing a new image
    Saving,
    /// Waiting for the next poll
    Sleeping,
    /// Shut down, exhausted, or halted by a persistence error
    Stopped,
}

/// Counters reported when the watcher stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Clipboard reads completed
    pub polls: u64,
    /// Files written
    pub saves: u64,
}

/// Poll-compare-save loop with single-slot deduplication
///
/// Only the most recently *saved* image is remembered. Copying image A, then
/// B, then A again produces three files.
///
/// # Examples
///
/// ```
/// use std::{sync::Arc, time::Duration};
///
/// use clipsave::{
///     clipboard::{ClipboardReader, MockClipboard, RasterImage},
///     persist::ImagePersister,
///     watcher::Watcher,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempfile::tempdir().unwrap();
///     let image = RasterImage::from_test_pattern(8, 8);
///     let mock = MockClipboard::from_snapshots(vec![Some(image.clone()), Some(image)]);
///     let reader = ClipboardReader::new(Arc::new(mock), Duration::from_secs(1));
///     let persister = ImagePersister::new(dir.path()).unwrap();
///
///     let mut watcher = Watcher::new(reader, persister, Duration::from_millis(10));
///     assert!(watcher.poll_once().await.unwrap().is_some());
///     assert!(watcher.poll_once().await.unwrap().is_none());
/// }
/// ```
#[derive(Debug)]
pub struct Watcher<S = ImagePersister> {
    reader:    ClipboardReader,
    sink:      S,
    interval:  Duration,
    last_seen: Option<PixelBuffer>,
    state:     WatcherState,
    summary:   WatchSummary,
}

impl<S: ImageSink> Watcher<S> {
    /// Creates an idle watcher polling every `interval`
    pub fn new(reader: ClipboardReader, sink: S, interval: Duration) -> Self {
        Self {
            reader,
            sink,
            interval,
            last_seen: None,
            state: WatcherState::Idle,
            summary: WatchSummary::default(),
        }
    }

    /// Current position in the poll cycle
    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Pixels of the most recently saved image
    pub fn last_seen(&self) -> Option<&PixelBuffer> {
        self.last_seen.as_ref()
    }

    /// Polls and saves so far
    pub fn summary(&self) -> WatchSummary {
        self.summary
    }

    /// Delay between polls
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The sink images are written to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Treats whatever image is on the clipboard right now as already saved
    ///
    /// Only images copied after this call are written. Returns whether an
    /// image was found.
    pub async fn ignore_current_image(&mut self) -> bool {
        match self.reader.read().await {
            Some(image) => {
                debug!(width = image.width(), height = image.height(), "Ignoring current image");
                self.last_seen = Some(image.pixel_buffer());
                true
            }
            None => false,
        }
    }

    /// Runs one poll: read the clipboard and save the image if it is new
    ///
    /// Returns the written file, if any.
    ///
    /// # Errors
    ///
    /// A [`PersistError`](crate::error::PersistError) from the sink. The
    /// watcher is left in [`WatcherState::Stopped`].
    pub async fn poll_once(&mut self) -> PersistResult<Option<SavedFile>> {
        self.state = WatcherState::Polling;
        let snapshot = self.reader.read().await;
        self.summary.polls += 1;
        self.handle_snapshot(snapshot)
    }

    /// Polls until `shutdown` completes, a save fails or the sink is exhausted
    ///
    /// `on_saved` is called once for every file written, in order.
    pub async fn run_until<Fut, F>(
        &mut self,
        shutdown: Fut,
        mut on_saved: F,
    ) -> PersistResult<WatchSummary>
    where
        Fut: Future<Output = ()>,
        F: FnMut(&SavedFile),
    {
        tokio::pin!(shutdown);

        info!(
            sink = %self.sink.location().display(),
            reader = %self.reader.reader_type(),
            interval_ms = self.interval.as_millis() as u64,
            "Watching clipboard"
        );

        loop {
            if self.sink.is_exhausted() {
                info!("Sink accepts no more images");
                break;
            }

            self.state = WatcherState::Polling;
            let snapshot = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                snapshot = self.reader.read() => snapshot,
            };
            self.summary.polls += 1;

            if let Some(saved) = self.handle_snapshot(snapshot)? {
                on_saved(&saved);
                if self.sink.is_exhausted() {
                    continue;
                }
            }

            self.state = WatcherState::Sleeping;
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state = WatcherState::Stopped;
        info!(polls = self.summary.polls, saves = self.summary.saves, "Watcher stopped");
        Ok(self.summary)
    }

    fn handle_snapshot(
        &mut self,
        snapshot: Option<RasterImage>,
    ) -> PersistResult<Option<SavedFile>> {
        let Some(image) = snapshot else {
            return Ok(None);
        };

        self.state = WatcherState::Saving;
        match self.sink.maybe_save(&image, self.last_seen.as_ref()) {
            Ok(Some((buffer, saved))) => {
                self.last_seen = Some(buffer);
                self.summary.saves += 1;
                Ok(Some(saved))
            }
            Ok(None) => {
                debug!("Clipboard image already saved");
                Ok(None)
            }
            Err(e) => {
                self.state = WatcherState::Stopped;
                error!("Failed to save clipboard image: {}", e);
                Err(e)
            }
        }
    }
}
