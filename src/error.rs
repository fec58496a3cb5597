//! Error types for clipboard polling and image persistence
//!
//! Errors are split by how the watcher treats them:
//!
//! - [`ClipboardError`]: transient read failures. The reader swallows these and
//!   reports "no image"; only [`ClipboardError::BackendNotAvailable`] escapes,
//!   at startup.
//! - [`PersistError`]: fatal write-side failures. They stop the watcher.
//! - [`ConfigError`]: invalid configuration values, rejected before the loop
//!   starts.
//!
//! Each error carries enough context (path, OS error, command status) to
//! diagnose without reading the source, and offers a remediation hint.

use std::{io, path::PathBuf};

use crate::model::ReaderType;

/// Result type alias for clipboard read operations
pub type ClipboardResult<T> = Result<T, ClipboardError>;

/// Result type alias for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;

/// Failure while querying the clipboard for an image
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// The clipboard query did not finish in time
    #[error("Clipboard query timed out after {duration_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// The clipboard could not be opened (locked, no display, etc.)
    #[error("Clipboard unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the platform
        reason: String,
    },

    /// A helper process exited unsuccessfully
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        /// Program that was run
        command: String,
        /// Exit status description
        status:  String,
        /// Trimmed standard error output
        stderr:  String,
    },

    /// Clipboard data could not be decoded into a raster image
    #[error("Failed to decode clipboard image: {0}")]
    Decode(String),

    /// No clipboard reader exists for this platform/build
    #[error("Clipboard reader {reader} is not available on this platform")]
    BackendNotAvailable {
        /// Reader that was requested or detected
        reader: ReaderType,
    },

    /// I/O error while talking to the clipboard provider
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClipboardError {
    /// Returns an actionable remediation hint for this error
    pub fn remediation_hint(&self) -> &str {
        match self {
            ClipboardError::Timeout { .. } => {
                "The clipboard provider did not answer in time. Another application may be holding \
                 the clipboard open; the next poll will retry."
            }
            ClipboardError::Unavailable { .. } => {
                "Ensure a graphical session is running (DISPLAY or WAYLAND_DISPLAY on Linux) and \
                 that no other process holds the clipboard."
            }
            ClipboardError::CommandFailed { .. } => {
                "Check that powershell.exe is reachable from this shell. Under WSL, Windows \
                 interop must be enabled."
            }
            ClipboardError::Decode(_) => {
                "The clipboard held data that is not a supported image. Copy the image again."
            }
            ClipboardError::BackendNotAvailable { reader } => match reader {
                ReaderType::Native => {
                    "This build has no native clipboard support. Rebuild with the \
                     `native-clipboard` feature."
                }
                ReaderType::PowerShell => {
                    "PowerShell clipboard access only works on Windows or inside WSL."
                }
                ReaderType::Mock => "The mock reader is only available in tests.",
            },
            ClipboardError::Io(_) => {
                "An I/O error occurred while reading the clipboard. The next poll will retry."
            }
        }
    }
}

/// Failure while writing an image to the target directory
///
/// These are never retried; the watcher stops on the first one.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Target directory does not exist
    #[error("Target directory does not exist: {}", .path.display())]
    DirectoryMissing {
        /// Configured target directory
        path: PathBuf,
    },

    /// Target path exists but is not a directory
    #[error("Target path is not a directory: {}", .path.display())]
    NotADirectory {
        /// Configured target path
        path: PathBuf,
    },

    /// Writing the image file failed
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        /// File that could not be written
        path:   PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Listing the target directory failed
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        /// Directory that could not be listed
        path:   PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Reading a document failed
    #[error("Failed to read {}: {source}", .path.display())]
    ReadFile {
        /// File that could not be read
        path:   PathBuf,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// Image encoding failed
    #[error("Failed to encode image as {format}: {reason}")]
    Encoding {
        /// Image format that failed
        format: String,
        /// Reason for encoding failure
        reason: String,
    },
}

impl PersistError {
    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    ///
    /// use clipsave::error::PersistError;
    ///
    /// let error = PersistError::DirectoryMissing {
    ///     path: PathBuf::from("/nope"),
    /// };
    /// assert!(error.remediation_hint().contains("--dir"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            PersistError::DirectoryMissing { .. } => {
                "Create the directory first or pass an existing one with --dir."
            }
            PersistError::NotADirectory { .. } => {
                "The --dir path points at a file. Pass a directory instead."
            }
            PersistError::Write { source, .. } => match source.kind() {
                io::ErrorKind::NotFound => {
                    "The target directory disappeared while running. Recreate it and restart."
                }
                io::ErrorKind::PermissionDenied => {
                    "The target directory is not writable. Fix its permissions or choose another \
                     directory with --dir."
                }
                _ => "Check disk space and that the target directory is on a writable filesystem.",
            },
            PersistError::ReadDir { .. } => {
                "Check that the directory exists and is readable by the current user."
            }
            PersistError::ReadFile { .. } => {
                "Check the markdown file path and that it is readable by the current user."
            }
            PersistError::Encoding { .. } => {
                "The clipboard image could not be encoded as PNG. Copy the image again; if this \
                 persists, report the image dimensions and color type."
            }
        }
    }
}

/// Invalid configuration value
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A parameter is out of range
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: String,
        /// Reason why it's invalid
        reason:    String,
    },
}
