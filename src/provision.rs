//! Making the platform's compiler archive available and unpacked.

use anyhow::Result;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::archive::Extractor;
use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::config::{Config, MIN_ARCHIVE_SIZE};
use crate::download::{Downloader, artifact_url};
use crate::error::ToolchainError;
use crate::platform::PlatformIdentifier;
use crate::runtime::{Prompter, Runtime};

const DOWNLOAD_PROMPT: &str = "Do you want to download the Java versions .zip files?";

/// Result of provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The compiler is unpacked in the scratch directory
    Ready,
    /// The operator declined to download the missing archive
    Declined,
}

/// An archive is usable only if it is a regular file of at least `MIN_ARCHIVE_SIZE`.
#[tracing::instrument(skip(runtime))]
pub fn validate_archive<R: Runtime>(runtime: &R, path: &Path) -> Result<(), ToolchainError> {
    if !runtime.exists(path) || !runtime.is_file(path) {
        return Err(ToolchainError::MissingArtifact {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    let size = runtime
        .file_size(path)
        .map_err(|e| ToolchainError::MissingArtifact {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if size < MIN_ARCHIVE_SIZE {
        return Err(ToolchainError::MissingArtifact {
            path: path.to_path_buf(),
            reason: format!(
                "only {} bytes; probably a placeholder left by a checkout without Git LFS",
                size
            ),
        });
    }

    debug!("Archive {:?} looks valid ({} bytes)", path, size);
    Ok(())
}

/// Download one platform archive into the versions directory.
///
/// The file is written as `<name>.part` and renamed into place once complete,
/// so an interrupted download never leaves a truncated archive behind.
#[tracing::instrument(skip(runtime, downloader, config, cleanup_ctx))]
pub async fn fetch_archive<R: Runtime, D: Downloader>(
    runtime: &R,
    downloader: &D,
    config: &Config,
    platform: &PlatformIdentifier,
    cleanup_ctx: SharedCleanupContext,
) -> Result<PathBuf> {
    let archive = config.layout.archive_path(platform);
    let part = archive.with_file_name(format!("{}.part", platform.archive_name()));
    let url = artifact_url(&config.base_url, platform);

    runtime.create_dir_all(&config.layout.versions_dir())?;

    println!(" downloading {}", url);
    let guard = CleanupGuard::new(cleanup_ctx, part.clone());
    if let Err(e) = downloader.download(&url, &part).await {
        if runtime.exists(&part) {
            let _ = runtime.remove_file(&part);
        }
        return Err(e.context(format!("Failed to download {}", url)));
    }
    runtime.rename(&part, &archive)?;
    guard.success();

    println!("  downloaded {}", archive.display());
    Ok(archive)
}

/// Download the archive of every published platform.
pub async fn fetch_all<R: Runtime, D: Downloader>(
    runtime: &R,
    downloader: &D,
    config: &Config,
    cleanup_ctx: SharedCleanupContext,
) -> Result<Vec<PathBuf>> {
    let mut fetched = Vec::new();
    for platform in PlatformIdentifier::all() {
        let path = fetch_archive(runtime, downloader, config, &platform, cleanup_ctx.clone()).await?;
        fetched.push(path);
    }
    Ok(fetched)
}

/// Ensure the platform archive is present, offering a download when it is not,
/// and unpack it into the scratch directory.
#[tracing::instrument(skip(runtime, prompter, downloader, extractor, config, cleanup_ctx))]
pub async fn ensure_unpacked<R, P, D, E>(
    runtime: &R,
    prompter: &P,
    downloader: &D,
    extractor: &E,
    config: &Config,
    platform: &PlatformIdentifier,
    cleanup_ctx: SharedCleanupContext,
) -> Result<Provisioned>
where
    R: Runtime + 'static,
    P: Prompter,
    D: Downloader,
    E: Extractor,
{
    let archive = config.layout.archive_path(platform);

    if let Err(missing) = validate_archive(runtime, &archive) {
        eprintln!("{}", missing);
        if !prompter.confirm(DOWNLOAD_PROMPT)? {
            info!("Download declined by operator");
            return Ok(Provisioned::Declined);
        }
        fetch_archive(runtime, downloader, config, platform, cleanup_ctx.clone()).await?;
        // One retry only; a second failure is final
        validate_archive(runtime, &archive)?;
    }

    let scratch = config.layout.scratch_dir();
    println!("   unpacking {}", archive.display());
    extractor.extract(runtime, &archive, &scratch, cleanup_ctx)?;
    Ok(Provisioned::Ready)
}
