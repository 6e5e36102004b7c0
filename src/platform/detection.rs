use super::PlatformIdentifier;
use crate::error::ToolchainError;

/// Source of the raw OS name and machine string (useful for testing).
pub trait PlatformDetector: Send + Sync {
    /// Raw `(os, arch)` as the host reports them, e.g. `("Darwin", "arm64")`.
    fn raw(&self) -> (String, String);

    fn detect(&self) -> Result<PlatformIdentifier, ToolchainError> {
        let (os, arch) = self.raw();
        PlatformIdentifier::resolve(&os, &arch)
    }
}

/// Compile-time detection of the running host.
pub struct HostDetector;

impl PlatformDetector for HostDetector {
    fn raw(&self) -> (String, String) {
        (host_os().to_string(), host_arch().to_string())
    }
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "Darwin",
        "linux" => "Linux",
        "windows" => "Windows",
        other => other,
    }
}

fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64",
        "x86_64" => "x86_64",
        other => other,
    }
}
