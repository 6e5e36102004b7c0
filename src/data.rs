//! Resetting the project's JSON data files from their defaults.

use anyhow::Result;
use log::info;
use std::path::PathBuf;

use crate::config::Layout;
use crate::error::ToolchainError;
use crate::runtime::{Prompter, Runtime};

/// A live data file and the default it can be reset from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    pub label: &'static str,
    pub default: PathBuf,
    pub live: PathBuf,
}

impl DataFile {
    /// The orders and users stores under `<root>/DB`.
    pub fn defaults(layout: &Layout) -> [DataFile; 2] {
        let data_dir = layout.data_dir();
        [
            DataFile {
                label: "ORDERS",
                default: data_dir.join("Orders").join("defaultOrders.json"),
                live: data_dir.join("Orders").join("orders.json"),
            },
            DataFile {
                label: "USERS",
                default: data_dir.join("Users").join("defaultUsers.json"),
                live: data_dir.join("Users").join("users.json"),
            },
        ]
    }

    fn prompt(&self) -> String {
        format!(
            "Do you want to overwrite the current {} {} file with the default one {}?",
            self.label,
            self.live.display(),
            self.default.display()
        )
    }

    /// Copy the default over the live file once it is known to be valid JSON.
    #[tracing::instrument(skip(runtime))]
    pub fn reset<R: Runtime>(&self, runtime: &R) -> Result<()> {
        let invalid = |reason: String| ToolchainError::InvalidDataFile {
            path: self.default.clone(),
            reason,
        };

        let content = runtime
            .read_to_string(&self.default)
            .map_err(|e| invalid(format!("{:#}", e)))?;
        serde_json::from_str::<serde_json::Value>(&content).map_err(|e| invalid(e.to_string()))?;

        runtime.copy(&self.default, &self.live)?;
        Ok(())
    }
}

/// Offer to reset each data file. Declined files are left untouched.
/// Returns how many were reset.
pub fn reset_data_files<R: Runtime, P: Prompter>(
    runtime: &R,
    prompter: &P,
    layout: &Layout,
) -> Result<usize> {
    let mut reset = 0;
    for file in DataFile::defaults(layout) {
        if prompter.confirm(&file.prompt())? {
            file.reset(runtime)?;
            println!("       reset {}", file.live.display());
            reset += 1;
        } else {
            info!("Keeping current {} file {:?}", file.label, file.live);
        }
    }
    Ok(reset)
}
