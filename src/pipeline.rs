//! The provision, compile and run sequence, plus the standalone commands
//! built from the same steps.

use anyhow::Result;
use log::info;
use std::path::PathBuf;
use tokio::task::JoinHandle;

use crate::archive::Extractor;
use crate::cleanup::{self, SharedCleanupContext};
use crate::compile;
use crate::config::{Config, Layout};
use crate::data;
use crate::download::Downloader;
use crate::launch::{self, ActiveRun, EntryPoint};
use crate::platform::PlatformIdentifier;
use crate::process::ProcessRunner;
use crate::provision::{self, Provisioned};
use crate::runtime::{Prompter, Runtime};
use crate::toolchain::Toolchain;

/// Switches of a `run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the entry point prompt
    pub entry: Option<EntryPoint>,
    /// Stop after compiling
    pub no_run: bool,
    /// Leave the scratch directory and class output in place
    pub keep: bool,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The operator declined a required download
    OptedOut,
}

pub struct Pipeline<R: Runtime, P: Prompter, X: ProcessRunner, D: Downloader, E: Extractor> {
    pub runtime: R,
    pub prompter: P,
    pub runner: X,
    pub downloader: D,
    pub extractor: E,
    pub config: Config,
    pub platform: PlatformIdentifier,
}

impl<R, P, X, D, E> Pipeline<R, P, X, D, E>
where
    R: Runtime + 'static,
    P: Prompter,
    X: ProcessRunner,
    D: Downloader,
    E: Extractor,
{
    #[tracing::instrument(skip(runtime, prompter, runner, downloader, extractor))]
    pub fn new(
        runtime: R,
        prompter: P,
        runner: X,
        downloader: D,
        extractor: E,
        config: Config,
        platform: PlatformIdentifier,
    ) -> Self {
        Self {
            runtime,
            prompter,
            runner,
            downloader,
            extractor,
            config,
            platform,
        }
    }

    /// Provision the compiler, build the project and optionally run it.
    ///
    /// Once the compiler is unpacked, the scratch directory and class output
    /// are removed at the end whether or not later steps succeed, unless
    /// `keep` is set.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, options: &RunOptions) -> Result<Outcome> {
        println!("    platform {}", self.platform);
        self.config.layout.check()?;

        let cleanup_ctx = cleanup::new_shared();
        let active = launch::new_active_run();
        let ctrl_c_handler = spawn_interrupt_handler(cleanup_ctx.clone(), active.clone());

        let result = self.provision_and_build(options, cleanup_ctx, &active).await;

        ctrl_c_handler.abort();
        result
    }

    async fn provision_and_build(
        &self,
        options: &RunOptions,
        cleanup_ctx: SharedCleanupContext,
        active: &ActiveRun,
    ) -> Result<Outcome> {
        let layout = &self.config.layout;

        let provisioned = provision::ensure_unpacked(
            &self.runtime,
            &self.prompter,
            &self.downloader,
            &self.extractor,
            &self.config,
            &self.platform,
            cleanup_ctx.clone(),
        )
        .await?;
        if provisioned == Provisioned::Declined {
            println!("Nothing downloaded, exiting.");
            return Ok(Outcome::OptedOut);
        }

        if !options.keep {
            let mut ctx = cleanup_ctx.lock().unwrap();
            ctx.add(layout.scratch_dir());
            ctx.add(layout.output_dir());
        }

        let result = self.build_and_run(options, active).await;

        if !options.keep {
            self.clean();
        }
        result.map(|()| Outcome::Completed)
    }

    async fn build_and_run(&self, options: &RunOptions, active: &ActiveRun) -> Result<()> {
        let layout = &self.config.layout;

        let sources = compile::find_sources(&self.runtime, &layout.source_dir())?;
        println!("       found {} source file(s)", sources.len());
        for source in &sources {
            info!("Source: {}", source.display());
        }

        let toolchain = Toolchain::discover(&self.runtime, &layout.scratch_dir(), &self.platform)?;
        toolchain.make_executable(&self.runtime, &self.platform)?;
        println!("       using {}", toolchain.compiler.display());

        data::reset_data_files(&self.runtime, &self.prompter, layout)?;

        println!("   compiling {} source file(s)", sources.len());
        compile::compile(&self.runner, &toolchain, layout, &self.platform, &sources).await?;
        println!("    compiled into {}", layout.output_dir().display());

        if options.no_run {
            return Ok(());
        }

        let entry = match options.entry {
            Some(entry) => entry,
            None => launch::choose_entry(&self.prompter)?,
        };
        launch::launch(
            &self.runner,
            &toolchain,
            layout,
            &self.platform,
            entry,
            active,
        )
        .await?;
        Ok(())
    }

    /// Download the host archive, or every platform's with `all`.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(&self, all: bool) -> Result<Vec<PathBuf>> {
        self.config.layout.check()?;

        let cleanup_ctx = cleanup::new_shared();
        let ctrl_c_handler =
            spawn_interrupt_handler(cleanup_ctx.clone(), launch::new_active_run());

        let result = if all {
            provision::fetch_all(&self.runtime, &self.downloader, &self.config, cleanup_ctx).await
        } else {
            provision::fetch_archive(
                &self.runtime,
                &self.downloader,
                &self.config,
                &self.platform,
                cleanup_ctx,
            )
            .await
            .map(|path| vec![path])
        };

        ctrl_c_handler.abort();
        result
    }

    /// Remove the scratch directory and class output.
    pub fn clean(&self) -> Vec<PathBuf> {
        clean(&self.runtime, &self.config.layout)
    }
}

/// Remove the scratch directory and class output of `layout`.
///
/// Needs neither the platform nor the network, so `jdkrun clean` works on
/// any host.
pub fn clean<R: Runtime>(runtime: &R, layout: &Layout) -> Vec<PathBuf> {
    let removed = cleanup::remove_dirs(runtime, &[&layout.scratch_dir(), &layout.output_dir()]);
    for path in &removed {
        println!("     cleaned {}", path.display());
    }
    removed
}

/// On Ctrl-C, stop the running program if there is one. Otherwise remove
/// whatever is registered for cleanup and exit.
fn spawn_interrupt_handler(cleanup_ctx: SharedCleanupContext, active: ActiveRun) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            let running = active.lock().unwrap().clone();
            if let Some(handle) = running {
                eprintln!("\nInterrupted, stopping the program...");
                handle.cancel();
                continue;
            }
            eprintln!("\nInterrupted, cleaning up...");
            cleanup_ctx.lock().unwrap().cleanup();
            std::process::exit(130); // Standard exit code for Ctrl-C
        }
    })
}
