//! clipsave: save every new clipboard image as a timestamped PNG
//!
//! This library provides the pieces behind the `clipsave` binary: clipboard
//! readers for the native platform clipboard and for WSL, a deduplicating
//! persister that writes collision-safe filenames, a sink that fills missing
//! image references in a markdown document, and the polling loop that drives
//! them.

pub mod clipboard;
pub mod error;
pub mod markdown;
pub mod model;
pub mod persist;
pub mod util;
pub mod watcher;
