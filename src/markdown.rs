//! Filling markdown image placeholders from the clipboard
//!
//! A document can reference screenshots that have not been taken yet:
//!
//! ```markdown
//! ![Login screen](img/login.png)
//! ![Settings](img/settings.png "after the update")
//! ```
//!
//! [`PlaceholderSink`] writes each new clipboard image to the next missing
//! target, in document order. Remote targets (`http://`, `https://`,
//! `data:`) and references inside fenced code blocks are ignored. A target
//! that already exists is never overwritten.
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//!
//! use clipsave::markdown::parse_placeholders;
//!
//! let doc = "# Setup\n\n![Login](img/login.png)\n![Logo](https://example.com/logo.png)\n";
//! let placeholders = parse_placeholders(doc, Path::new("/notes"));
//!
//! assert_eq!(placeholders.len(), 1);
//! assert_eq!(placeholders[0].target, "img/login.png");
//! assert_eq!(placeholders[0].line, 3);
//! ```

use std::{
    collections::{HashSet, VecDeque},
    fs,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tracing::{debug, warn};

use crate::{
    clipboard::{PixelBuffer, RasterImage},
    error::{PersistError, PersistResult},
    model::SavedFile,
    persist::{FILE_EXTENSION, ImageSink, save_to_path},
};

/// `![alt](target)` with an optional quoted title
static IMAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#)
        .expect("image link pattern is valid")
});

const REMOTE_PREFIXES: [&str; 3] = ["http://", "https://", "data:"];

/// One local image reference in a markdown document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlaceholder {
    /// Alt text between the brackets
    pub alt_text: String,
    /// Target exactly as written in the document
    pub target:   String,
    /// Target resolved against the document's directory
    pub path:     PathBuf,
    /// 1-based line number of the reference
    pub line:     usize,
}

impl ImagePlaceholder {
    /// Whether the target file already exists
    pub fn is_filled(&self) -> bool {
        self.path.exists()
    }

    /// Whether the target names a PNG file
    pub fn is_png(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
    }
}

/// Extracts the local image references from markdown `content`
///
/// Relative targets are resolved against `base_dir`.
pub fn parse_placeholders(content: &str, base_dir: &Path) -> Vec<ImagePlaceholder> {
    let mut placeholders = Vec::new();
    let mut in_fence = false;

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        for caps in IMAGE_LINK.captures_iter(line) {
            let target = &caps[2];
            if is_remote(target) {
                continue;
            }

            placeholders.push(ImagePlaceholder {
                alt_text: caps[1].to_string(),
                target:   target.to_string(),
                path:     base_dir.join(target),
                line:     index + 1,
            });
        }
    }

    placeholders
}

/// Reads `markdown` and extracts its local image references
pub fn load_placeholders(markdown: &Path) -> PersistResult<Vec<ImagePlaceholder>> {
    let content = fs::read_to_string(markdown).map_err(|source| PersistError::ReadFile {
        path: markdown.to_path_buf(),
        source,
    })?;

    Ok(parse_placeholders(&content, document_dir(markdown)))
}

/// Directory relative targets in `markdown` resolve against
pub fn document_dir(markdown: &Path) -> &Path {
    match markdown.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn is_remote(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    REMOTE_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Sink that fills missing placeholder targets in document order
#[derive(Debug)]
pub struct PlaceholderSink {
    document: PathBuf,
    pending:  VecDeque<ImagePlaceholder>,
}

impl PlaceholderSink {
    /// Queues the unfilled PNG targets among `placeholders`
    ///
    /// Targets that already exist are dropped. So are repeated references to
    /// the same file, and non-PNG targets (with a warning).
    pub fn new(
        document: impl Into<PathBuf>,
        placeholders: impl IntoIterator<Item = ImagePlaceholder>,
    ) -> Self {
        let mut seen = HashSet::new();
        let pending = placeholders
            .into_iter()
            .filter(|p| !p.is_filled())
            .filter(|p| {
                if !p.is_png() {
                    warn!(
                        line = p.line,
                        placeholder = %p.target,
                        "Skipping non-PNG placeholder"
                    );
                }
                p.is_png()
            })
            .filter(|p| seen.insert(p.path.clone()))
            .collect();

        Self {
            document: document.into(),
            pending,
        }
    }

    /// Loads `markdown` and queues its unfilled placeholders
    pub fn open(markdown: &Path) -> PersistResult<Self> {
        let placeholders = load_placeholders(markdown)?;
        Ok(Self::new(markdown, placeholders))
    }

    /// Placeholders still waiting for an image, next first
    pub fn pending(&self) -> impl Iterator<Item = &ImagePlaceholder> {
        self.pending.iter()
    }

    /// Number of placeholders still waiting for an image
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl ImageSink for PlaceholderSink {
    fn maybe_save(
        &mut self,
        image: &RasterImage,
        last_seen: Option<&PixelBuffer>,
    ) -> PersistResult<Option<(PixelBuffer, SavedFile)>> {
        if last_seen.is_some_and(|buffer| image.matches(buffer)) {
            return Ok(None);
        }

        while let Some(placeholder) = self.pending.pop_front() {
            match save_to_path(image, &placeholder.path)? {
                Some(saved) => {
                    debug!(
                        line = placeholder.line,
                        placeholder = %placeholder.target,
                        "Filled placeholder"
                    );
                    return Ok(Some((image.pixel_buffer(), saved)));
                }
                None => warn!(
                    line = placeholder.line,
                    placeholder = %placeholder.target,
                    "Placeholder was filled by someone else, skipping"
                ),
            }
        }

        Ok(None)
    }

    fn location(&self) -> &Path {
        &self.document
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"# Release notes

![Hero image](images/hero.png)

Some text with an inline ![icon](icons/ok.png "OK") reference.

![External](https://example.com/image.png)
![Inline data](data:image/png;base64,iVBORw0KGgo=)

```markdown
![Not a placeholder](images/example.png)
```

![Photo](photos/cat.jpg)
"#;

    fn solid(value: u8) -> RasterImage {
        RasterImage::solid(3, 3, [value, value, value, 255])
    }

    #[test]
    fn test_parse_skips_remote_and_fenced_targets() {
        let placeholders = parse_placeholders(DOC, Path::new("/docs"));
        let targets: Vec<&str> = placeholders.iter().map(|p| p.target.as_str()).collect();

        assert_eq!(targets, vec!["images/hero.png", "icons/ok.png", "photos/cat.jpg"]);
        assert_eq!(placeholders[0].alt_text, "Hero image");
        assert_eq!(placeholders[0].line, 3);
        assert_eq!(placeholders[0].path, PathBuf::from("/docs/images/hero.png"));
        assert_eq!(placeholders[1].alt_text, "icon");
        assert_eq!(placeholders[1].line, 5);
    }

    #[test]
    fn test_parse_multiple_links_on_one_line() {
        let placeholders = parse_placeholders("![a](a.png) and ![b](b.png)", Path::new("."));

        assert_eq!(placeholders.len(), 2);
        assert!(placeholders.iter().all(|p| p.line == 1));
    }

    #[test]
    fn test_remote_detection_ignores_case() {
        assert!(is_remote("HTTPS://example.com/a.png"));
        assert!(is_remote("Data:image/png;base64,AAAA"));
        assert!(!is_remote("images/http.png"));
    }

    #[test]
    fn test_document_dir_of_bare_file_name() {
        assert_eq!(document_dir(Path::new("README.md")), Path::new("."));
        assert_eq!(document_dir(Path::new("docs/README.md")), Path::new("docs"));
    }

    #[test]
    fn test_load_placeholders_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_placeholders(&dir.path().join("missing.md")).unwrap_err();
        assert!(matches!(err, PersistError::ReadFile { .. }));
    }

    #[test]
    fn test_sink_queues_only_unfilled_png_targets() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/done.png"), b"existing").unwrap();
        let doc = "![a](images/done.png)\n![b](images/new.png)\n![c](photo.jpg)\n![d](images/new.png)\n";

        let sink = PlaceholderSink::new("doc.md", parse_placeholders(doc, dir.path()));
        let targets: Vec<&str> = sink.pending().map(|p| p.target.as_str()).collect();

        assert_eq!(targets, vec!["images/new.png"]);
        assert_eq!(sink.remaining(), 1);
        assert_eq!(sink.location(), Path::new("doc.md"));
    }

    #[test]
    fn test_sink_fills_targets_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "![one](shots/one.png)\n![two](shots/two.png)\n";
        let mut sink = PlaceholderSink::new("doc.md", parse_placeholders(doc, dir.path()));

        let (first, saved_one) = sink.maybe_save(&solid(1), None).unwrap().unwrap();
        assert!(sink.maybe_save(&solid(1), Some(&first)).unwrap().is_none());
        assert_eq!(sink.remaining(), 1);

        let (_, saved_two) = sink.maybe_save(&solid(2), Some(&first)).unwrap().unwrap();

        assert_eq!(saved_one.path, dir.path().join("shots/one.png"));
        assert_eq!(saved_two.filename, "two.png");
        assert!(sink.is_exhausted());
        assert!(sink.maybe_save(&solid(3), None).unwrap().is_none());

        let reloaded = RasterImage::new(image::open(&saved_two.path).unwrap());
        assert!(reloaded.matches(&solid(2).pixel_buffer()));
    }

    #[test]
    fn test_sink_skips_target_created_meanwhile() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "![one](one.png)\n![two](two.png)\n";
        let mut sink = PlaceholderSink::new("doc.md", parse_placeholders(doc, dir.path()));
        fs::write(dir.path().join("one.png"), b"hand-made").unwrap();

        let (_, saved) = sink.maybe_save(&solid(1), None).unwrap().unwrap();

        assert_eq!(saved.filename, "two.png");
        assert_eq!(fs::read(dir.path().join("one.png")).unwrap(), b"hand-made");
        assert!(sink.is_exhausted());
    }

    #[test]
    fn test_open_resolves_against_document_directory() {
        let dir = tempfile::tempdir().unwrap();
        let markdown = dir.path().join("post.md");
        fs::write(&markdown, "![shot](assets/shot.png)\n").unwrap();

        let sink = PlaceholderSink::open(&markdown).unwrap();
        let next = sink.pending().next().unwrap();

        assert_eq!(next.path, dir.path().join("assets/shot.png"));
        assert_eq!(sink.location(), markdown.as_path());
    }
}
