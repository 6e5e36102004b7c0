//! Locating the compiler and runtime launcher inside an unpacked JDK.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::error::ToolchainError;
use crate::platform::PlatformIdentifier;
use crate::runtime::Runtime;

const COMPILER_STEM: &str = "javac";
const LAUNCHER_STEM: &str = "java";

/// Compiler and launcher executables of a single JDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler: PathBuf,
    pub launcher: PathBuf,
}

impl Toolchain {
    /// Find the first `bin` directory under `root` and the JDK executables in it.
    ///
    /// Directories are visited depth-first with entries sorted by name, which
    /// is the order `glob` yields matches in.
    #[tracing::instrument(skip(runtime))]
    pub fn discover<R: Runtime>(
        runtime: &R,
        root: &Path,
        platform: &PlatformIdentifier,
    ) -> Result<Self> {
        let bin_dir = find_bin_dir(runtime, root)?.ok_or_else(|| ToolchainError::ToolNotFound {
            tool: "bin".to_string(),
            searched: root.to_path_buf(),
        })?;
        debug!("Using bin directory {:?}", bin_dir);

        let compiler = bin_dir.join(platform.executable_name(COMPILER_STEM));
        if !runtime.is_file(&compiler) {
            return Err(ToolchainError::ToolNotFound {
                tool: platform.executable_name(COMPILER_STEM),
                searched: bin_dir,
            }
            .into());
        }

        let launcher = launcher_for(&compiler, platform);
        if !runtime.is_file(&launcher) {
            return Err(ToolchainError::ToolNotFound {
                tool: platform.executable_name(LAUNCHER_STEM),
                searched: bin_dir,
            }
            .into());
        }

        Ok(Self { compiler, launcher })
    }

    /// Add execute access to both executables. Archives extracted without
    /// mode bits would otherwise leave them unusable. Skipped on Windows.
    pub fn make_executable<R: Runtime>(
        &self,
        runtime: &R,
        platform: &PlatformIdentifier,
    ) -> Result<()> {
        if platform.is_windows() {
            return Ok(());
        }
        for path in [&self.compiler, &self.launcher] {
            runtime.add_execute_permission(path)?;
        }
        Ok(())
    }
}

fn find_bin_dir<R: Runtime>(runtime: &R, root: &Path) -> Result<Option<PathBuf>> {
    let pattern = format!(
        "{}/**/bin",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    for entry in glob::glob(&pattern).context("Invalid compiler search pattern")? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                debug!("Skipping unreadable path during search: {}", e);
                continue;
            }
        };
        if runtime.is_dir(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// The launcher sits beside the compiler; only the file name differs.
fn launcher_for(compiler: &Path, platform: &PlatformIdentifier) -> PathBuf {
    compiler.with_file_name(platform.executable_name(LAUNCHER_STEM))
}
