//! Data models and type definitions for clipsave
//!
//! This module defines the core types used throughout the application:
//! - Clipboard reader selection and platform detection types
//! - The [`SavedFile`] record reported for every written image
//! - [`WatcherConfig`], the runtime configuration of the polling loop

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default delay between clipboard polls
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Default upper bound for a single clipboard query
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Which mechanism is used to read the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderType {
    /// In-process clipboard access via the platform's native API
    Native,
    /// `powershell.exe` subprocess (Windows, or WSL through interop)
    PowerShell,
    /// Scripted reader used in tests
    Mock,
}

impl ReaderType {
    /// Returns the reader type as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderType::Native => "native",
            ReaderType::PowerShell => "powershell",
            ReaderType::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ReaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Platform information relevant to clipboard access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInfo {
    /// Operating system name (e.g., "linux", "windows", "macos")
    pub os:     String,
    /// Whether we are running inside Windows Subsystem for Linux
    pub wsl:    bool,
    /// Reader that should be used on this platform, if any
    pub reader: Option<ReaderType>,
}

impl PlatformInfo {
    /// Creates a new PlatformInfo instance
    pub fn new(os: String, wsl: bool, reader: Option<ReaderType>) -> Self {
        Self { os, wsl, reader }
    }
}

/// An image file written by the persister
///
/// Files are named `<YYYY-MM-DD_HH-MM-SS>[_<n>].png`; `timestamp` holds the
/// stem without the collision suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    /// Full path of the file
    pub path:      PathBuf,
    /// File name including extension
    pub filename:  String,
    /// Timestamp stem the name was derived from
    pub timestamp: String,
    /// Image width in pixels
    pub width:     u32,
    /// Image height in pixels
    pub height:    u32,
}

/// Runtime configuration for the clipboard watcher
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use clipsave::model::WatcherConfig;
///
/// let config = WatcherConfig::new("/tmp/shots")
///     .with_interval(Duration::from_millis(250))
///     .with_read_timeout(Duration::from_secs(2));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.interval, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Directory that receives saved images; must already exist
    pub target_dir:   PathBuf,
    /// Delay between polls
    pub interval:     Duration,
    /// Upper bound for one clipboard query
    pub read_timeout: Duration,
}

impl WatcherConfig {
    /// Creates a configuration for `target_dir` with default timings
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir:   target_dir.into(),
            interval:     DEFAULT_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Sets the delay between polls
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the upper bound for a single clipboard query
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Checks that the timings are usable
    ///
    /// The target directory is checked separately when the persister is
    /// created, since it can change between validation and use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidParameter {
                parameter: "interval".to_string(),
                reason:    "must be greater than zero".to_string(),
            });
        }
        if self.read_timeout.is_zero() {
            return Err(ConfigError::InvalidParameter {
                parameter: "read_timeout".to_string(),
                reason:    "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the configured target directory
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::new(default_target_dir())
    }
}

/// The user's Downloads directory, or the current directory if unknown
pub fn default_target_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
