//! Writing clipboard images to the target directory
//!
//! [`ImagePersister`] owns the target directory and turns a clipboard image
//! into a PNG file named after the current local time:
//!
//! ```text
//! 2024-05-01_14-03-27.png
//! 2024-05-01_14-03-27_1.png   <- second save within the same second
//! 2024-05-01_14-03-27_2.png
//! ```
//!
//! Files are opened with create-new semantics. A name that appears between
//! probing and writing is skipped, never overwritten.
//!
//! [`ImageSink`] is the seam the watcher writes through. [`ImagePersister`]
//! is the timestamped-directory sink; the markdown placeholder sink lives in
//! [`crate::markdown`].
//!
//! # Examples
//!
//! ```
//! use clipsave::{clipboard::RasterImage, persist::ImagePersister};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let persister = ImagePersister::new(dir.path()).unwrap();
//!
//! let image = RasterImage::from_test_pattern(32, 32);
//! let (last_seen, saved) = persister.maybe_save(&image, None).unwrap().unwrap();
//! assert!(saved.path.exists());
//!
//! // Same pixels again: nothing is written
//! assert!(persister.maybe_save(&image, Some(&last_seen)).unwrap().is_none());
//! ```

use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::{
    clipboard::{PixelBuffer, RasterImage},
    error::{PersistError, PersistResult},
    model::SavedFile,
    util::encode::encode_png,
};

/// `chrono` format of the filename stem
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Extension of every saved file
pub const FILE_EXTENSION: &str = "png";

/// Source of "now" for filenames
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Destination for clipboard images picked up by the watcher
pub trait ImageSink: fmt::Debug {
    /// Saves `image` unless its pixels equal `last_seen`
    ///
    /// Returns the new "last seen" buffer together with the written file, or
    /// `None` when nothing was written.
    ///
    /// # Errors
    ///
    /// Any [`PersistError`]; the caller should treat it as fatal.
    fn maybe_save(
        &mut self,
        image: &RasterImage,
        last_seen: Option<&PixelBuffer>,
    ) -> PersistResult<Option<(PixelBuffer, SavedFile)>>;

    /// Where images end up, for logs
    fn location(&self) -> &Path;

    /// Whether the sink will accept no further images
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Deduplicating, collision-safe image writer
#[derive(Clone)]
pub struct ImagePersister {
    target_dir: PathBuf,
    clock:      Clock,
}

impl ImagePersister {
    /// Creates a persister writing into `target_dir`
    ///
    /// The directory must already exist; it is never created.
    pub fn new(target_dir: impl Into<PathBuf>) -> PersistResult<Self> {
        let target_dir = target_dir.into();

        match fs::metadata(&target_dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(PersistError::NotADirectory { path: target_dir }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistError::DirectoryMissing { path: target_dir });
            }
            Err(source) => {
                return Err(PersistError::ReadDir {
                    path: target_dir,
                    source,
                });
            }
        }

        Ok(Self {
            target_dir,
            clock: Arc::new(Local::now),
        })
    }

    /// Replaces the clock used to name files
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Directory files are written to
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Saves `image` unless its pixels equal `last_seen`
    ///
    /// Returns the new "last seen" buffer together with the written file, or
    /// `None` when the image is unchanged.
    ///
    /// # Errors
    ///
    /// Any [`PersistError`]; the caller should treat it as fatal.
    pub fn maybe_save(
        &self,
        image: &RasterImage,
        last_seen: Option<&PixelBuffer>,
    ) -> PersistResult<Option<(PixelBuffer, SavedFile)>> {
        if last_seen.is_some_and(|buffer| image.matches(buffer)) {
            debug!("Clipboard image unchanged, skipping save");
            return Ok(None);
        }

        let saved = self.save(image)?;
        Ok(Some((image.pixel_buffer(), saved)))
    }

    /// Saves `image` under the next free timestamped name
    pub fn save(&self, image: &RasterImage) -> PersistResult<SavedFile> {
        // Encode first so a failure never leaves an empty file behind
        let png = encode_png(image)?;
        let stem = timestamp_stem((self.clock)());

        let mut counter = 0;
        loop {
            let filename = file_name(&stem, counter);
            counter += 1;
            let path = self.target_dir.join(&filename);

            if !write_new(&path, &png)? {
                continue;
            }

            let (width, height) = image.dimensions();
            info!(file = %filename, width, height, bytes = png.len(), "Saved clipboard image");

            return Ok(SavedFile {
                path,
                filename,
                timestamp: stem,
                width,
                height,
            });
        }
    }
}

impl ImageSink for ImagePersister {
    fn maybe_save(
        &mut self,
        image: &RasterImage,
        last_seen: Option<&PixelBuffer>,
    ) -> PersistResult<Option<(PixelBuffer, SavedFile)>> {
        ImagePersister::maybe_save(self, image, last_seen)
    }

    fn location(&self) -> &Path {
        &self.target_dir
    }
}

impl fmt::Debug for ImagePersister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePersister")
            .field("target_dir", &self.target_dir)
            .finish_non_exhaustive()
    }
}

/// Saves `image` as a PNG at exactly `path`
///
/// Missing parent directories are created. Returns `None` without touching
/// the file when `path` already exists.
pub fn save_to_path(image: &RasterImage, path: &Path) -> PersistResult<Option<SavedFile>> {
    let png = encode_png(image)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if !write_new(path, &png)? {
        debug!(path = %path.display(), "Target already exists, not overwriting");
        return Ok(None);
    }

    let (width, height) = image.dimensions();
    info!(path = %path.display(), width, height, bytes = png.len(), "Saved clipboard image");

    Ok(Some(SavedFile {
        path: path.to_path_buf(),
        filename: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        timestamp: timestamp_stem(Local::now()),
        width,
        height,
    }))
}

/// Writes `bytes` to a file that must not exist yet
///
/// Returns `false` if `path` is already taken. A failed write removes the
/// partial file.
fn write_new(path: &Path, bytes: &[u8]) -> PersistResult<bool> {
    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(source) => {
            return Err(PersistError::Write {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if let Err(source) = file.write_all(bytes).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(e) = fs::remove_file(path) {
            warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
        return Err(PersistError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(true)
}

/// Formats `now` as a filename stem, e.g. `2024-05-01_14-03-27`
pub fn timestamp_stem(now: DateTime<Local>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// `<stem>.png` for counter 0, `<stem>_<counter>.png` otherwise
pub fn file_name(stem: &str, counter: u64) -> String {
    if counter == 0 {
        format!("{}.{}", stem, FILE_EXTENSION)
    } else {
        format!("{}_{}.{}", stem, counter, FILE_EXTENSION)
    }
}

/// Splits a saved file name into its timestamp stem and collision counter
///
/// Returns `None` for names that do not follow the naming scheme.
///
/// # Examples
///
/// ```
/// use clipsave::persist::parse_file_name;
///
/// assert_eq!(
///     parse_file_name("2024-05-01_14-03-27_2.png"),
///     Some(("2024-05-01_14-03-27".to_string(), 2))
/// );
/// assert_eq!(
///     parse_file_name("2024-05-01_14-03-27.png"),
///     Some(("2024-05-01_14-03-27".to_string(), 0))
/// );
/// assert_eq!(parse_file_name("holiday.png"), None);
/// ```
pub fn parse_file_name(filename: &str) -> Option<(String, u64)> {
    let stem = filename.strip_suffix(".png")?;

    let (stem, counter) = match stem.rsplit_once('_') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
            (head, tail.parse().ok()?)
        }
        _ => (stem, 0),
    };

    NaiveDateTime::parse_from_str(stem, TIMESTAMP_FORMAT).ok()?;
    Some((stem.to_string(), counter))
}

/// Lists previously saved images in `dir`, newest first
///
/// Only PNG files following the timestamp naming scheme are included. Files
/// whose header cannot be read are skipped with a warning.
pub fn list_saved(dir: &Path) -> PersistResult<Vec<SavedFile>> {
    let entries = fs::read_dir(dir).map_err(|source| PersistError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut saved = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let Some((timestamp, counter)) = parse_file_name(&filename) else {
            continue;
        };

        match image::image_dimensions(&path) {
            Ok((width, height)) => saved.push((
                counter,
                SavedFile {
                    path,
                    filename,
                    timestamp,
                    width,
                    height,
                },
            )),
            Err(e) => warn!("Skipping unreadable image {}: {}", path.display(), e),
        }
    }

    saved.sort_by(|(a_counter, a), (b_counter, b)| {
        b.timestamp.cmp(&a.timestamp).then(b_counter.cmp(a_counter))
    });

    Ok(saved.into_iter().map(|(_, file)| file).collect())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_clock() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 14, 3, 27).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = ImagePersister::new(&missing).unwrap_err();
        assert!(matches!(err, PersistError::DirectoryMissing { .. }));
    }

    #[test]
    fn test_new_rejects_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();

        let err = ImagePersister::new(&file).unwrap_err();
        assert!(matches!(err, PersistError::NotADirectory { .. }));
    }

    #[test]
    fn test_maybe_save_first_image() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap().with_clock(fixed_clock);
        let image = RasterImage::from_test_pattern(10, 10);

        let (buffer, saved) = persister.maybe_save(&image, None).unwrap().unwrap();

        assert_eq!(saved.filename, "2024-05-01_14-03-27.png");
        assert_eq!(saved.timestamp, "2024-05-01_14-03-27");
        assert_eq!((saved.width, saved.height), (10, 10));
        assert_eq!(buffer, image.pixel_buffer());
        assert!(saved.path.exists());
    }

    #[test]
    fn test_maybe_save_skips_identical_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap();
        let image = RasterImage::from_test_pattern(10, 10);
        let last_seen = image.pixel_buffer();

        assert!(persister.maybe_save(&image, Some(&last_seen)).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_same_second_collisions_get_suffixes() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap().with_clock(fixed_clock);

        let names: Vec<String> = (0..3u8)
            .map(|i| {
                let image = RasterImage::solid(2, 2, [i, 0, 0, 255]);
                persister.save(&image).unwrap().filename
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "2024-05-01_14-03-27.png",
                "2024-05-01_14-03-27_1.png",
                "2024-05-01_14-03-27_2.png",
            ]
        );
    }

    #[test]
    fn test_counter_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-05-01_14-03-27.png"), b"taken").unwrap();
        fs::write(dir.path().join("2024-05-01_14-03-27_1.png"), b"taken").unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap().with_clock(fixed_clock);

        let saved = persister.save(&RasterImage::solid(1, 1, [0, 0, 0, 255])).unwrap();

        assert_eq!(saved.filename, "2024-05-01_14-03-27_2.png");
        // Existing files untouched
        assert_eq!(fs::read(dir.path().join("2024-05-01_14-03-27.png")).unwrap(), b"taken");
    }

    #[test]
    fn test_saved_file_round_trips_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let persister = ImagePersister::new(dir.path()).unwrap();
        let image = RasterImage::from_test_pattern(17, 9);

        let saved = persister.save(&image).unwrap();
        let reloaded = RasterImage::new(image::open(&saved.path).unwrap());

        assert!(reloaded.matches(&image.pixel_buffer()));
    }

    #[test]
    fn test_save_into_removed_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shots");
        fs::create_dir(&target).unwrap();
        let persister = ImagePersister::new(&target).unwrap();
        fs::remove_dir(&target).unwrap();

        let err = persister.save(&RasterImage::solid(1, 1, [0, 0, 0, 255])).unwrap_err();

        match err {
            PersistError::Write { path, source } => {
                assert!(path.starts_with(&target));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_save_to_path_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("docs/img/hero.png");
        let image = RasterImage::from_test_pattern(12, 6);

        let saved = save_to_path(&image, &target).unwrap().expect("file written");

        assert_eq!(saved.path, target);
        assert_eq!(saved.filename, "hero.png");
        assert_eq!((saved.width, saved.height), (12, 6));
        let reloaded = RasterImage::new(image::open(&target).unwrap());
        assert!(reloaded.matches(&image.pixel_buffer()));
    }

    #[test]
    fn test_save_to_path_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("taken.png");
        fs::write(&target, b"keep me").unwrap();

        let result = save_to_path(&RasterImage::solid(1, 1, [0, 0, 0, 255]), &target).unwrap();

        assert!(result.is_none());
        assert_eq!(fs::read(&target).unwrap(), b"keep me");
    }

    #[test]
    fn test_persister_as_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink: Box<dyn ImageSink> =
            Box::new(ImagePersister::new(dir.path()).unwrap().with_clock(fixed_clock));
        let image = RasterImage::solid(2, 2, [5, 5, 5, 255]);

        let (buffer, _) = sink.maybe_save(&image, None).unwrap().unwrap();

        assert!(sink.maybe_save(&image, Some(&buffer)).unwrap().is_none());
        assert_eq!(sink.location(), dir.path());
        assert!(!sink.is_exhausted());
    }

    #[test]
    fn test_file_name_formatting() {
        assert_eq!(file_name("2024-01-02_03-04-05", 0), "2024-01-02_03-04-05.png");
        assert_eq!(file_name("2024-01-02_03-04-05", 12), "2024-01-02_03-04-05_12.png");
        assert_eq!(timestamp_stem(fixed_clock()), "2024-05-01_14-03-27");
    }

    #[test]
    fn test_parse_file_name_rejects_other_names() {
        assert_eq!(parse_file_name("2024-05-01_14-03-27.jpg"), None);
        assert_eq!(parse_file_name("2024-05-01_14-03-27_.png"), None);
        assert_eq!(parse_file_name("2024-05-01_14-03-27_x.png"), None);
        assert_eq!(parse_file_name("screenshot_3.png"), None);
    }

    #[test]
    fn test_list_saved_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let early = ImagePersister::new(dir.path())
            .unwrap()
            .with_clock(|| Local.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let late = ImagePersister::new(dir.path()).unwrap().with_clock(fixed_clock);

        early.save(&RasterImage::solid(3, 2, [1, 0, 0, 255])).unwrap();
        for i in 0..11u8 {
            late.save(&RasterImage::solid(4, 4, [i, 1, 0, 255])).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        fs::write(dir.path().join("holiday.png"), b"ignored").unwrap();

        let listed = list_saved(dir.path()).unwrap();
        let names: Vec<&str> = listed.iter().map(|f| f.filename.as_str()).collect();

        assert_eq!(listed.len(), 12);
        assert_eq!(names[0], "2024-05-01_14-03-27_10.png");
        assert_eq!(names[1], "2024-05-01_14-03-27_9.png");
        assert_eq!(names[10], "2024-05-01_14-03-27.png");
        assert_eq!(names[11], "2024-01-01_09-00-00.png");
        assert_eq!((listed[11].width, listed[11].height), (3, 2));
    }

    #[test]
    fn test_list_saved_skips_corrupt_png() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-05-01_14-03-27.png"), b"not a png").unwrap();

        assert!(list_saved(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_saved_missing_directory() {
        let dir = tempfile::tempdir().unwrap();

        let err = list_saved(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PersistError::ReadDir { .. }));
    }
}
