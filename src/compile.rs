//! Source discovery and compiler invocation.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::config::Layout;
use crate::error::ToolchainError;
use crate::platform::PlatformIdentifier;
use crate::process::{Invocation, ProcessRunner};
use crate::runtime::Runtime;
use crate::toolchain::Toolchain;

/// Every `.java` file under `source_dir`, sorted.
#[tracing::instrument(skip(runtime))]
pub fn find_sources<R: Runtime>(runtime: &R, source_dir: &Path) -> Result<Vec<PathBuf>> {
    if !runtime.is_dir(source_dir) {
        return Err(ToolchainError::MissingDirectory(source_dir.to_path_buf()).into());
    }

    let pattern = format!(
        "{}/**/*.java",
        glob::Pattern::escape(&source_dir.to_string_lossy())
    );
    let mut sources = Vec::new();
    for entry in glob::glob(&pattern).context("Invalid source search pattern")? {
        let path = entry.context("Failed to read source tree")?;
        if runtime.is_file(&path) {
            sources.push(path);
        }
    }
    sources.sort();

    if sources.is_empty() {
        return Err(ToolchainError::NoSourceFiles(source_dir.to_path_buf()).into());
    }
    debug!("Found {} source file(s)", sources.len());
    Ok(sources)
}

/// `javac -cp <lib/*> -d <output> <file>...`
pub fn compile_invocation(toolchain: &Toolchain, layout: &Layout, sources: &[PathBuf]) -> Invocation {
    let invocation = Invocation::new(&toolchain.compiler)
        .arg("-cp")
        .arg(layout.lib_classpath())
        .arg("-d")
        .path_arg(&layout.output_dir());
    sources
        .iter()
        .fold(invocation, |invocation, source| invocation.path_arg(source))
}

/// Compile `sources`, failing with the compiler's stderr on a non-zero exit.
#[tracing::instrument(skip(runner, toolchain, layout, platform, sources))]
pub async fn compile<P: ProcessRunner>(
    runner: &P,
    toolchain: &Toolchain,
    layout: &Layout,
    platform: &PlatformIdentifier,
    sources: &[PathBuf],
) -> Result<()> {
    let invocation = compile_invocation(toolchain, layout, sources);
    info!("Compiling: {}", invocation.render_for(platform));

    let output = runner.output(&invocation).await?;
    if !output.success() {
        return Err(ToolchainError::CompilationFailed {
            status: output.code,
            stderr: output.stderr.trim().to_string(),
        }
        .into());
    }

    if !output.stderr.trim().is_empty() {
        // javac reports warnings on stderr even when it succeeds
        debug!("Compiler output: {}", output.stderr.trim());
    }
    Ok(())
}
