//! Child process invocation.
//!
//! Commands are executed directly rather than through a shell, so arguments
//! reach the child verbatim. `Invocation::render` produces the host-quoted
//! form used when logging what is about to run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::sync::watch;

use crate::platform::PlatformIdentifier;

/// Command-line quoting convention of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Posix,
    Windows,
}

impl QuoteStyle {
    pub fn for_platform(platform: &PlatformIdentifier) -> Self {
        if platform.is_windows() {
            QuoteStyle::Windows
        } else {
            QuoteStyle::Posix
        }
    }

    /// Quote a single token.
    pub fn quote(&self, token: &str) -> String {
        match self {
            QuoteStyle::Posix => format!("'{}'", token.replace('\'', r"'\''")),
            QuoteStyle::Windows => {
                format!("\"{}\"", token.replace('/', "\\").replace('"', "\\\""))
            }
        }
    }
}

/// A program, its arguments, and the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Deterministic single-line rendering with every token quoted.
    pub fn render(&self, style: QuoteStyle) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|token| style.quote(&token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Rendering in the command-line convention of `platform`, for logs.
    pub fn render_for(&self, platform: &PlatformIdentifier) -> String {
        self.render(QuoteStyle::for_platform(platform))
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// How an interactive child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(Option<i32>),
    /// Termination was requested through the cancel signal
    Cancelled,
}

/// Sending half of a cancellation request.
#[derive(Clone)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Receiving half of a cancellation request.
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// Resolves once cancellation is requested. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        let sender_dropped = self.0.wait_for(|cancelled| *cancelled).await.is_err();
        if sender_dropped {
            std::future::pending::<()>().await;
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), CancelSignal(rx))
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, capturing stdout and stderr.
    async fn output(&self, invocation: &Invocation) -> Result<ProcessOutput>;

    /// Run with inherited stdio until it exits or `cancel` fires, in which case
    /// the child is asked to terminate and then awaited.
    async fn run(&self, invocation: &Invocation, cancel: CancelSignal) -> Result<RunStatus>;
}

pub struct SystemProcessRunner;

impl SystemProcessRunner {
    fn command(invocation: &Invocation) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    #[tracing::instrument(skip(self))]
    async fn output(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        debug!("Executing {:?}", invocation);
        let output = Self::command(invocation)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to execute {:?}", invocation.program))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    #[tracing::instrument(skip(self, cancel))]
    async fn run(&self, invocation: &Invocation, mut cancel: CancelSignal) -> Result<RunStatus> {
        debug!("Executing {:?}", invocation);
        let mut child = Self::command(invocation)
            .spawn()
            .with_context(|| format!("Failed to start {:?}", invocation.program))?;

        tokio::select! {
            status = child.wait() => {
                let status = status.context("Failed to wait for child process")?;
                Ok(RunStatus::Exited(status.code()))
            }
            _ = cancel.cancelled() => {
                info!("Asking {:?} to terminate", invocation.program);
                terminate(&mut child)?;
                let status = child.wait().await.context("Failed to wait for child process")?;
                debug!("Child exited with {:?} after termination request", status.code());
                Ok(RunStatus::Cancelled)
            }
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut tokio::process::Child) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => {
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                .context("Failed to send SIGTERM to child process")?;
        }
        None => debug!("Child already exited"),
    }
    Ok(())
}

#[cfg(not(unix))]
fn terminate(child: &mut tokio::process::Child) -> Result<()> {
    child
        .start_kill()
        .context("Failed to terminate child process")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_quoting() {
        let invocation = Invocation::new("./Unzipped/jdk/bin/javac")
            .arg("-cp")
            .arg("/home/u/CROSS/CROSS/lib/*")
            .arg("-d")
            .arg("/home/u/CROSS/bin")
            .arg("/home/u/CROSS/CROSS/src/It's Main.java");

        assert_eq!(
            invocation.render(QuoteStyle::Posix),
            r"'./Unzipped/jdk/bin/javac' '-cp' '/home/u/CROSS/CROSS/lib/*' '-d' '/home/u/CROSS/bin' '/home/u/CROSS/CROSS/src/It'\''s Main.java'"
        );
    }

    #[test]
    fn test_windows_quoting() {
        let invocation = Invocation::new("C:/CROSS/Java/Unzipped/jdk/bin/javac.exe")
            .arg("-cp")
            .arg("C:/CROSS/CROSS/lib/*")
            .arg("say \"hi\"");

        assert_eq!(
            invocation.render(QuoteStyle::Windows),
            r#""C:\CROSS\Java\Unzipped\jdk\bin\javac.exe" "-cp" "C:\CROSS\CROSS\lib\*" "say \"hi\"""#
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let build = || {
            Invocation::new("javac")
                .arg("-d")
                .path_arg(Path::new("out"))
                .current_dir("/tmp")
        };
        assert_eq!(build(), build());
        assert_eq!(
            build().render(QuoteStyle::Posix),
            build().render(QuoteStyle::Posix)
        );
        assert_eq!(build().working_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_quote_style_for_platform() {
        use crate::platform::{Arch, OsFamily};
        let windows = PlatformIdentifier::new(OsFamily::Windows, Arch::X64).unwrap();
        let linux = PlatformIdentifier::new(OsFamily::Linux, Arch::Arm64).unwrap();
        assert_eq!(QuoteStyle::for_platform(&windows), QuoteStyle::Windows);
        assert_eq!(QuoteStyle::for_platform(&linux), QuoteStyle::Posix);
    }

    #[test]
    fn test_render_for_follows_target_platform_not_build_host() {
        use crate::platform::{Arch, OsFamily};
        let windows = PlatformIdentifier::new(OsFamily::Windows, Arch::X64).unwrap();
        let macos = PlatformIdentifier::new(OsFamily::MacOS, Arch::Arm64).unwrap();
        let invocation = Invocation::new("/jdk/bin/javac").arg("-d").arg("/p/bin");

        assert_eq!(
            invocation.render_for(&windows),
            r#""\jdk\bin\javac" "-d" "\p\bin""#
        );
        assert_eq!(invocation.render_for(&macos), "'/jdk/bin/javac' '-d' '/p/bin'");
    }

    #[tokio::test]
    async fn test_cancel_signal_resolves_after_cancel() {
        let (handle, mut signal) = cancel_pair();
        handle.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), signal.cancelled())
            .await
            .expect("cancellation should be observed");
    }

    #[tokio::test]
    async fn test_cancel_signal_pends_when_handle_dropped() {
        let (handle, mut signal) = cancel_pair();
        drop(handle);
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), signal.cancelled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_output_captures_stderr_and_status() {
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo 'error: cannot find symbol' >&2; exit 1");

        let output = SystemProcessRunner.output(&invocation).await.unwrap();

        assert!(!output.success());
        assert_eq!(output.code, Some(1));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "error: cannot find symbol");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_output_respects_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = Invocation::new("pwd").current_dir(dir.path());

        let output = SystemProcessRunner.output(&invocation).await.unwrap();

        let reported = std::fs::canonicalize(output.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn test_output_missing_program() {
        let invocation = Invocation::new("/nonexistent/bin/javac");
        assert!(SystemProcessRunner.output(&invocation).await.is_err());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_reports_exit_code() {
        let (_handle, signal) = cancel_pair();
        let invocation = Invocation::new("sh").arg("-c").arg("exit 3");

        let status = SystemProcessRunner.run(&invocation, signal).await.unwrap();

        assert_eq!(status, RunStatus::Exited(Some(3)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_run_terminates_on_cancel() {
        let (handle, signal) = cancel_pair();
        let invocation = Invocation::new("sleep").arg("30");

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            handle.cancel();
        });

        let status = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            SystemProcessRunner.run(&invocation, signal),
        )
        .await
        .expect("child should terminate")
        .unwrap();

        canceller.await.unwrap();
        assert_eq!(status, RunStatus::Cancelled);
    }
}
