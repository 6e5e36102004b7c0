use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::runtime::Runtime;
use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use super::Extractor;

/// Extractor for .zip archives
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    #[tracing::instrument(skip(self, runtime, cleanup_ctx))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        debug!("Extracting zip archive {:?} to {:?}...", archive_path, extract_to);
        let mut reader = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // ZipArchive needs Read + Seek; Runtime::open only gives Read
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;

        let mut archive = ZipArchive::new(Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", archive_path))?;

        if archive.is_empty() {
            bail!("Archive {:?} appears to be empty.", archive_path);
        }

        if runtime.exists(extract_to) {
            debug!("Removing stale extraction directory {:?}", extract_to);
            runtime.remove_dir_all(extract_to)?;
        }
        runtime.create_dir_all(extract_to)?;
        let guard = CleanupGuard::new(cleanup_ctx, extract_to.to_path_buf());

        let files = match extract_entries(runtime, &mut archive, extract_to) {
            Ok(files) => files,
            Err(e) => {
                debug!("Removing partially extracted {:?}", extract_to);
                let _ = runtime.remove_dir_all(extract_to);
                return Err(e);
            }
        };

        guard.success();
        info!("Extracted {} file(s) to {:?}.", files, extract_to);
        Ok(())
    }
}

fn extract_entries<R: Runtime>(
    runtime: &R,
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    extract_to: &Path,
) -> Result<usize> {
    let mut files = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read ZIP entry {}", i))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                debug!("Skipping entry with unsafe path: {}", entry.name());
                continue;
            }
        };

        let full_path = extract_to.join(&entry_path);

        if entry.is_dir() {
            runtime.create_dir_all(&full_path)?;
            continue;
        }

        if let Some(parent) = full_path.parent() {
            runtime.create_dir_all(parent)?;
        }
        {
            let mut dest_file = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest_file)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;
        }
        files += 1;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode()
            && let Err(e) = runtime.set_permissions(&full_path, mode)
        {
            debug!("Failed to set permissions on {:?}: {}", full_path, e);
        }
    }
    Ok(files)
}
