mod zip;

use crate::cleanup::SharedCleanupContext;
use crate::runtime::Runtime;
use anyhow::Result;
use std::path::Path;

pub use zip::ZipExtractor;

/// Unpacks a compiler archive into a scratch directory.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Extract `archive_path` into `extract_to`, keeping the archive's layout.
    /// `extract_to` is registered with `cleanup_ctx` while extraction runs.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        extract_to: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()>;
}
