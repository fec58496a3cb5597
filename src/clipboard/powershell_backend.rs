//! PowerShell clipboard backend for Windows and WSL
//!
//! Runs `powershell.exe` with a short script that grabs the clipboard image
//! through `System.Windows.Forms`, re-encodes it as PNG and prints it as
//! base64 on stdout. Inside WSL this reaches the Windows clipboard through
//! interop, which is the only clipboard that holds screenshots there.
//!
//! Output contract:
//!
//! | Exit | stdout | Result |
//! |------|--------|--------|
//! | 0 | empty | `Ok(None)` (no image on the clipboard) |
//! | 0 | base64 PNG | `Ok(Some(image))` |
//! | non-zero | any | `Err(CommandFailed)` |
//!
//! The child is spawned with `kill_on_drop`, so a query abandoned by the
//! reader's timeout does not leave a stray PowerShell process behind.

use std::process::Stdio;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::process::Command;
use tracing::trace;

use super::{ClipboardBackend, RasterImage};
use crate::{
    error::{ClipboardError, ClipboardResult},
    model::ReaderType,
};

/// Default PowerShell executable name, resolved through `PATH`
pub const POWERSHELL_EXE: &str = "powershell.exe";

/// Script printing the clipboard image as base64 PNG, or nothing
const CLIPBOARD_SCRIPT: &str = r#"
Add-Type -AssemblyName System.Windows.Forms
$clip = [System.Windows.Forms.Clipboard]::GetImage()
if ($clip) {
    $ms = New-Object System.IO.MemoryStream
    $clip.Save($ms, [System.Drawing.Imaging.ImageFormat]::Png)
    [Convert]::ToBase64String($ms.ToArray())
}
"#;

/// Clipboard backend shelling out to PowerShell
#[derive(Debug, Clone)]
pub struct PowerShellClipboard {
    program: String,
}

impl PowerShellClipboard {
    /// Creates a backend that runs `powershell.exe` from `PATH`
    pub fn new() -> Self {
        Self::with_program(POWERSHELL_EXE)
    }

    /// Creates a backend that runs a specific PowerShell executable
    ///
    /// Useful when `powershell.exe` is not on `PATH`, e.g. WSL with
    /// `appendWindowsPath = false`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this backend runs
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Turns the helper's stdout into an image
    ///
    /// Blank output means the clipboard held no image.
    pub fn parse_output(stdout: &[u8]) -> ClipboardResult<Option<RasterImage>> {
        let text = String::from_utf8_lossy(stdout);
        let encoded = text.trim();
        if encoded.is_empty() {
            return Ok(None);
        }

        let png = STANDARD
            .decode(encoded)
            .map_err(|e| ClipboardError::Decode(format!("invalid base64 from PowerShell: {}", e)))?;

        RasterImage::decode(&png).map(Some)
    }
}

impl Default for PowerShellClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipboardBackend for PowerShellClipboard {
    async fn fetch_image(&self) -> ClipboardResult<Option<RasterImage>> {
        let output = Command::new(&self.program)
            .args(["-NoProfile", "-NonInteractive", "-Command", CLIPBOARD_SCRIPT])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ClipboardError::CommandFailed {
                command: self.program.clone(),
                status:  output.status.to_string(),
                stderr:  String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        trace!(bytes = output.stdout.len(), "PowerShell clipboard output received");
        Self::parse_output(&output.stdout)
    }

    fn reader_type(&self) -> ReaderType {
        ReaderType::PowerShell
    }
}
