//! Running one of the compiled program's entry points.

use anyhow::Result;
use log::{info, warn};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::config::Layout;
use crate::platform::PlatformIdentifier;
use crate::process::{CancelHandle, Invocation, ProcessRunner, RunStatus, cancel_pair};
use crate::runtime::Prompter;
use crate::toolchain::Toolchain;

const ENTRY_PROMPT: &str = "Do you want to execute the server or the client?";

/// Program entry points the project ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EntryPoint {
    Server,
    Client,
}

impl EntryPoint {
    pub fn main_class(&self) -> &'static str {
        match self {
            EntryPoint::Server => "MainServer",
            EntryPoint::Client => "MainClient",
        }
    }

    fn key(&self) -> char {
        match self {
            EntryPoint::Server => 's',
            EntryPoint::Client => 'c',
        }
    }

    fn from_key(key: char) -> Option<Self> {
        [EntryPoint::Server, EntryPoint::Client]
            .into_iter()
            .find(|entry| entry.key() == key)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Server => write!(f, "server"),
            EntryPoint::Client => write!(f, "client"),
        }
    }
}

/// Ask which entry point to run.
pub fn choose_entry<P: Prompter>(prompter: &P) -> Result<EntryPoint> {
    let keys = [EntryPoint::Server.key(), EntryPoint::Client.key()];
    let key = prompter.choose(ENTRY_PROMPT, &keys)?;
    EntryPoint::from_key(key).ok_or_else(|| anyhow::anyhow!("Unknown entry point '{}'", key))
}

/// `java -cp <output><sep><lib/*> <MainClass>`, run from the project root.
pub fn run_invocation(
    toolchain: &Toolchain,
    layout: &Layout,
    platform: &PlatformIdentifier,
    entry: EntryPoint,
) -> Invocation {
    let classpath = format!(
        "{}{}{}",
        layout.output_dir().display(),
        platform.classpath_separator(),
        layout.lib_classpath()
    );
    Invocation::new(&toolchain.launcher)
        .arg("-cp")
        .arg(classpath)
        .arg(entry.main_class())
        .current_dir(layout.root())
}

/// Cancel handle of the program currently running, for the interrupt handler.
pub type ActiveRun = Arc<Mutex<Option<CancelHandle>>>;

pub fn new_active_run() -> ActiveRun {
    Arc::new(Mutex::new(None))
}

/// Run `entry` until it exits or is interrupted through `active`.
///
/// A non-zero exit is reported but not treated as a failure of the tool.
#[tracing::instrument(skip(runner, toolchain, layout, platform, active))]
pub async fn launch<X: ProcessRunner>(
    runner: &X,
    toolchain: &Toolchain,
    layout: &Layout,
    platform: &PlatformIdentifier,
    entry: EntryPoint,
    active: &ActiveRun,
) -> Result<RunStatus> {
    let invocation = run_invocation(toolchain, layout, platform, entry);
    println!("   executing {}", entry);
    info!("Executing command: {}", invocation.render_for(platform));

    let (handle, signal) = cancel_pair();
    *active.lock().unwrap() = Some(handle);
    let status = runner.run(&invocation, signal).await;
    active.lock().unwrap().take();

    let status = status?;
    match status {
        RunStatus::Exited(Some(0)) => info!("The {} exited normally", entry),
        RunStatus::Exited(code) => warn!("The {} exited with status {:?}", entry, code),
        RunStatus::Cancelled => println!(" interrupted {}", entry),
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, OsFamily};
    use crate::process::MockProcessRunner;
    use crate::runtime::MockPrompter;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn toolchain() -> Toolchain {
        Toolchain {
            compiler: PathBuf::from("/p/CROSS/Java/Unzipped/jdk/bin/javac"),
            launcher: PathBuf::from("/p/CROSS/Java/Unzipped/jdk/bin/java"),
        }
    }

    #[test]
    fn test_main_classes() {
        assert_eq!(EntryPoint::Server.main_class(), "MainServer");
        assert_eq!(EntryPoint::Client.main_class(), "MainClient");
        assert_eq!(EntryPoint::Client.to_string(), "client");
    }

    #[test]
    fn test_run_invocation_posix() {
        let linux = PlatformIdentifier::new(OsFamily::Linux, Arch::X64).unwrap();
        let layout = Layout::new("/p/CROSS/Java");

        let invocation = run_invocation(&toolchain(), &layout, &linux, EntryPoint::Server);

        assert_eq!(
            invocation.args,
            vec!["-cp", "/p/CROSS/bin:/p/CROSS/CROSS/lib/*", "MainServer"]
        );
        assert_eq!(invocation.working_dir, Some(PathBuf::from("/p/CROSS")));
    }

    #[test]
    fn test_run_invocation_windows_separator() {
        let windows = PlatformIdentifier::new(OsFamily::Windows, Arch::X64).unwrap();
        let layout = Layout::new("/p/CROSS/Java");

        let invocation = run_invocation(&toolchain(), &layout, &windows, EntryPoint::Client);

        assert_eq!(invocation.args[1], "/p/CROSS/bin;/p/CROSS/CROSS/lib/*");
        assert_eq!(invocation.args[2], "MainClient");
    }

    #[test]
    fn test_choose_entry_maps_keys() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_choose()
            .with(eq(ENTRY_PROMPT), eq(['s', 'c']))
            .times(1)
            .returning(|_, _| Ok('c'));

        assert_eq!(choose_entry(&prompter).unwrap(), EntryPoint::Client);
    }

    #[tokio::test]
    async fn test_launch_clears_active_run_and_tolerates_failure() {
        let linux = PlatformIdentifier::new(OsFamily::Linux, Arch::X64).unwrap();
        let layout = Layout::new("/p/CROSS/Java");
        let active = new_active_run();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|inv, _| inv.args.last().map(String::as_str) == Some("MainServer"))
            .times(1)
            .returning(|_, _| Ok(RunStatus::Exited(Some(1))));

        let status = launch(&runner, &toolchain(), &layout, &linux, EntryPoint::Server, &active)
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Exited(Some(1)));
        assert!(active.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_launch_is_cancelled_through_active_run() {
        let linux = PlatformIdentifier::new(OsFamily::Linux, Arch::X64).unwrap();
        let layout = Layout::new("/p/CROSS/Java");
        let active = new_active_run();

        let mut runner = MockProcessRunner::new();
        let probe = active.clone();
        runner.expect_run().returning(move |_, _| {
            // The handler sees the running program and cancels it
            let handle = probe.lock().unwrap().clone();
            assert!(handle.is_some());
            handle.unwrap().cancel();
            Ok(RunStatus::Cancelled)
        });

        let status = launch(&runner, &toolchain(), &layout, &linux, EntryPoint::Client, &active)
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Cancelled);
        assert!(active.lock().unwrap().is_none());
    }
}
