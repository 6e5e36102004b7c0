//! Domain errors raised by the provisioning pipeline.
//!
//! These travel inside `anyhow::Error`; callers that need to react to a
//! specific failure use `downcast_ref::<ToolchainError>()`.

use std::path::PathBuf;

#[derive(Debug)]
pub enum ToolchainError {
    /// Host OS or architecture has no published compiler archive
    UnsupportedPlatform {
        os: String,
        arch: String,
        reason: String,
    },
    /// The tool was not started from the expected project subfolder
    WrongWorkingDirectory { cwd: PathBuf, expected: String },
    /// A directory the pipeline depends on is absent
    MissingDirectory(PathBuf),
    /// The platform archive is absent or a placeholder
    MissingArtifact { path: PathBuf, reason: String },
    /// The compiler or runtime launcher could not be located
    ToolNotFound { tool: String, searched: PathBuf },
    /// The compiler exited unsuccessfully
    CompilationFailed { status: Option<i32>, stderr: String },
    /// The source tree contains nothing to compile
    NoSourceFiles(PathBuf),
    /// A default data file is unreadable or not JSON
    InvalidDataFile { path: PathBuf, reason: String },
}

impl std::fmt::Display for ToolchainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolchainError::UnsupportedPlatform { os, arch, reason } => {
                write!(f, "Unsupported platform {} {}: {}", os, arch, reason)
            }
            ToolchainError::WrongWorkingDirectory { cwd, expected } => {
                write!(
                    f,
                    "Current working directory {:?} is not '{}'. Change to it and try again.",
                    cwd, expected
                )
            }
            ToolchainError::MissingDirectory(path) => {
                write!(f, "Directory {:?} does not exist", path)
            }
            ToolchainError::MissingArtifact { path, reason } => {
                write!(f, "Compiler archive {:?} is not usable: {}", path, reason)
            }
            ToolchainError::ToolNotFound { tool, searched } => {
                write!(f, "Could not find '{}' under {:?}", tool, searched)
            }
            ToolchainError::CompilationFailed { status, stderr } => {
                let status = status
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                write!(f, "Compilation failed (exit status {}): {}", status, stderr)
            }
            ToolchainError::NoSourceFiles(path) => {
                write!(f, "No source files found under {:?}", path)
            }
            ToolchainError::InvalidDataFile { path, reason } => {
                write!(f, "Data file {:?} is invalid: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ToolchainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_failed_display_carries_stderr() {
        let err = ToolchainError::CompilationFailed {
            status: Some(1),
            stderr: "error: cannot find symbol".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status 1"));
        assert!(msg.contains("error: cannot find symbol"));
    }

    #[test]
    fn test_compilation_failed_without_status() {
        let err = ToolchainError::CompilationFailed {
            status: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("exit status signal"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err = anyhow::Error::from(ToolchainError::NoSourceFiles(PathBuf::from("/src")))
            .context("Build failed");
        assert!(matches!(
            err.downcast_ref::<ToolchainError>(),
            Some(ToolchainError::NoSourceFiles(_))
        ));

        let other = anyhow::anyhow!("something else");
        assert!(other.downcast_ref::<ToolchainError>().is_none());
    }
}
