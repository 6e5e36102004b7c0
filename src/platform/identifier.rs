use serde::Serialize;
use std::fmt;

use crate::error::ToolchainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OsFamily {
    Linux,
    MacOS,
    Windows,
}

impl OsFamily {
    /// Map a raw OS name as reported by the host ("Darwin", "Linux", "Windows").
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "Darwin" => Some(OsFamily::MacOS),
            "Windows" => Some(OsFamily::Windows),
            "Linux" => Some(OsFamily::Linux),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Linux => "Linux",
            OsFamily::MacOS => "MacOS",
            OsFamily::Windows => "Windows",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Arch {
    #[serde(rename = "ARM64")]
    Arm64,
    #[serde(rename = "x64")]
    X64,
}

impl Arch {
    /// Map a raw machine string, matching case-insensitively on well-known tokens.
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.to_lowercase();
        if raw.contains("arm64") || raw.contains("aarch64") {
            Some(Arch::Arm64)
        } else if raw.contains("amd64") || raw.contains("x86_64") || raw.contains("x64") {
            Some(Arch::X64)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "ARM64",
            Arch::X64 => "x64",
        }
    }
}

/// Canonical (OS family, architecture) pair.
///
/// Fields are private so that `(Windows, ARM64)` can never be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformIdentifier {
    os: OsFamily,
    arch: Arch,
}

impl PlatformIdentifier {
    pub fn new(os: OsFamily, arch: Arch) -> Result<Self, ToolchainError> {
        if os == OsFamily::Windows && arch == Arch::Arm64 {
            return Err(ToolchainError::UnsupportedPlatform {
                os: os.as_str().to_string(),
                arch: arch.as_str().to_string(),
                reason: "no compiler archive is published for Windows ARM64".to_string(),
            });
        }
        Ok(Self { os, arch })
    }

    /// Resolve raw host strings into a platform identifier.
    pub fn resolve(raw_os: &str, raw_arch: &str) -> Result<Self, ToolchainError> {
        let unsupported = |reason: &str| ToolchainError::UnsupportedPlatform {
            os: raw_os.to_string(),
            arch: raw_arch.to_string(),
            reason: reason.to_string(),
        };

        let os = OsFamily::from_raw(raw_os).ok_or_else(|| unsupported("unknown operating system"))?;
        let arch = Arch::from_raw(raw_arch).ok_or_else(|| unsupported("unknown architecture"))?;
        Self::new(os, arch)
    }

    /// Every platform with a published archive.
    pub fn all() -> [Self; 5] {
        [
            Self { os: OsFamily::Linux, arch: Arch::Arm64 },
            Self { os: OsFamily::Linux, arch: Arch::X64 },
            Self { os: OsFamily::MacOS, arch: Arch::Arm64 },
            Self { os: OsFamily::MacOS, arch: Arch::X64 },
            Self { os: OsFamily::Windows, arch: Arch::X64 },
        ]
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// `"<Family>_<Arch>.zip"`
    pub fn archive_name(&self) -> String {
        format!("{}_{}.zip", self.os.as_str(), self.arch.as_str())
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsFamily::Windows
    }

    /// Executable file name for `stem` on this platform.
    pub fn executable_name(&self, stem: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", stem)
        } else {
            stem.to_string()
        }
    }

    pub fn classpath_separator(&self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }
}

impl fmt::Display for PlatformIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.os.as_str(), self.arch.as_str())
    }
}
