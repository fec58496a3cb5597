//! Shared test utilities for watcher integration tests

#![allow(dead_code)]

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Local, TimeZone};
use clipsave::{
    clipboard::{ClipboardReader, MockClipboard, MockFrame, RasterImage},
    persist::ImagePersister,
    watcher::Watcher,
};
use tempfile::TempDir;

/// Poll interval used by harness watchers
pub const TEST_INTERVAL: Duration = Duration::from_millis(2);

/// A watcher over a scripted clipboard writing into a scratch directory
pub struct WatchHarness {
    pub dir:     TempDir,
    pub mock:    Arc<MockClipboard>,
    pub watcher: Watcher,
}

impl WatchHarness {
    /// Harness using the real local clock
    pub fn new(frames: Vec<MockFrame>) -> Self {
        Self::build(frames, None)
    }

    /// Harness whose persister always sees the same instant
    pub fn with_frozen_clock(frames: Vec<MockFrame>) -> Self {
        Self::build(frames, Some(frozen_now))
    }

    fn build(frames: Vec<MockFrame>, clock: Option<fn() -> DateTime<Local>>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mock = Arc::new(MockClipboard::new(frames));
        let reader = ClipboardReader::new(mock.clone(), Duration::from_millis(100));

        let mut persister = ImagePersister::new(dir.path()).expect("persister");
        if let Some(clock) = clock {
            persister = persister.with_clock(clock);
        }

        let watcher = Watcher::new(reader, persister, TEST_INTERVAL);
        Self { dir, mock, watcher }
    }

    /// File names in the target directory, in the order they were written
    pub fn saved_names(&self) -> Vec<String> {
        saved_names_by_creation(self.dir.path())
    }
}

/// The instant every frozen-clock save is stamped with
pub fn frozen_now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap()
}

/// Stem produced by [`frozen_now`]
pub const FROZEN_STEM: &str = "2024-05-01_14-03-27";

/// Distinct solid-color images, one per index
pub fn image(index: u8) -> RasterImage {
    RasterImage::solid(6, 4, [index, 255 - index, 42, 255])
}

/// Script turning `Some(i)` into [`image`]`(i)` and `None` into an empty clipboard
pub fn script(sequence: &[Option<u8>]) -> Vec<MockFrame> {
    sequence
        .iter()
        .map(|entry| match entry {
            Some(i) => MockFrame::Image(image(*i)),
            None => MockFrame::Empty,
        })
        .collect()
}

/// Names of `.png` files in `dir`, ordered by (timestamp, collision counter)
pub fn saved_names_by_creation(dir: &Path) -> Vec<String> {
    let mut names: Vec<(String, u64, String)> = std::fs::read_dir(dir)
        .expect("read_dir")
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            clipsave::persist::parse_file_name(&name).map(|(stem, counter)| (stem, counter, name))
        })
        .collect();
    names.sort();
    names.into_iter().map(|(_, _, name)| name).collect()
}

/// Decodes a saved file back into a raster image
pub fn load(path: &Path) -> RasterImage {
    RasterImage::new(image::open(path).expect("saved file should decode"))
}
