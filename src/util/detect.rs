//! Platform detection for clipboard reader selection
//!
//! Works out the operating system, whether we are inside WSL, and which
//! [`ReaderType`] should serve clipboard queries.

use std::env;

use crate::model::{PlatformInfo, ReaderType};

/// Detects the current platform and the clipboard reader to use
///
/// # Platform-specific behavior
///
/// ## Linux
/// - If `$WSL_DISTRO_NAME` or `$WSL_INTEROP` is set, we are in WSL and the
///   Windows clipboard is reached through `ReaderType::PowerShell`
/// - Otherwise `ReaderType::Native` (X11/Wayland via arboard)
///
/// ## Windows
/// - `ReaderType::Native` when built with `native-clipboard`, else
///   `ReaderType::PowerShell`
///
/// ## macOS
/// - Always `ReaderType::Native`
///
/// ## Other platforms
/// - No reader
///
/// # Examples
///
/// ```
/// use clipsave::util::detect::detect_platform;
///
/// let platform = detect_platform();
/// println!("Running on: {} (wsl: {})", platform.os, platform.wsl);
/// ```
pub fn detect_platform() -> PlatformInfo {
    detect_platform_with_env(|key| env::var(key).ok())
}

/// Platform detection with an injectable environment lookup
fn detect_platform_with_env<F>(_env_provider: F) -> PlatformInfo
where
    F: Fn(&str) -> Option<String>,
{
    #[cfg(target_os = "linux")]
    {
        let wsl = is_wsl(&_env_provider);
        let reader = if wsl {
            ReaderType::PowerShell
        } else {
            ReaderType::Native
        };
        PlatformInfo::new("linux".to_string(), wsl, Some(reader))
    }

    #[cfg(target_os = "windows")]
    {
        let reader = if cfg!(feature = "native-clipboard") {
            ReaderType::Native
        } else {
            ReaderType::PowerShell
        };
        PlatformInfo::new("windows".to_string(), false, Some(reader))
    }

    #[cfg(target_os = "macos")]
    {
        PlatformInfo::new("macos".to_string(), false, Some(ReaderType::Native))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        PlatformInfo::new("unknown".to_string(), false, None)
    }
}

/// Whether the environment marks this process as running under WSL
#[cfg(target_os = "linux")]
fn is_wsl<F>(env_provider: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    ["WSL_DISTRO_NAME", "WSL_INTEROP"]
        .iter()
        .any(|key| env_provider(key).is_some_and(|value| !value.is_empty()))
}
