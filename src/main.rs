use anyhow::Result;
use clap::Parser;
use jdkrun::archive::ZipExtractor;
use jdkrun::config::Config;
use jdkrun::download::HttpDownloader;
use jdkrun::launch::EntryPoint;
use jdkrun::pipeline::{self, Outcome, Pipeline, RunOptions};
use jdkrun::platform::{HostDetector, PlatformDetector, PlatformIdentifier};
use jdkrun::process::SystemProcessRunner;
use jdkrun::runtime::{AutoConfirm, Prompter, RealRuntime, TerminalPrompter};
use std::path::PathBuf;

/// jdkrun - build and run the CROSS Java project with a bundled JDK
///
/// Unpacks the JDK archive matching this machine, compiles the project
/// sources and starts the server or the client.
///
/// Must be run from the project's `Java` directory (or pointed at it with
/// --project-dir).
///
/// Examples:
///   jdkrun run                  # Compile, then choose server or client
///   jdkrun run --entry server   # Compile and start the server
///   jdkrun fetch --all          # Download the JDK archives of every platform
#[derive(Parser, Debug)]
#[command(author, version = env!("JDKRUN_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The project's `Java` directory (defaults to the current directory)
    #[arg(
        long = "project-dir",
        short = 'C',
        env = "JDKRUN_PROJECT_DIR",
        value_name = "PATH",
        global = true
    )]
    pub project_dir: Option<PathBuf>,

    /// Where the JDK archives are downloaded from
    #[arg(
        long = "base-url",
        env = "JDKRUN_BASE_URL",
        value_name = "URL",
        global = true
    )]
    pub base_url: Option<String>,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Unpack the JDK, compile the project and run it
    Run(RunArgs),

    /// Download JDK archives into Versions/
    Fetch(FetchArgs),

    /// Show the detected platform and its archive name
    Platform(PlatformArgs),

    /// Remove the unpacked JDK and compiled classes
    Clean(CleanArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Entry point to start without asking
    #[arg(long, value_enum)]
    pub entry: Option<EntryPoint>,

    /// Stop after compiling
    #[arg(long)]
    pub no_run: bool,

    /// Keep the unpacked JDK and compiled classes
    #[arg(long)]
    pub keep: bool,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Download the archives of every supported platform
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct PlatformArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct CleanArgs {}

type HostPipeline =
    Pipeline<RealRuntime, Box<dyn Prompter>, SystemProcessRunner, HttpDownloader, ZipExtractor>;

fn host_pipeline(cli: &Cli) -> Result<HostPipeline> {
    let runtime = RealRuntime;
    let config = Config::new(&runtime, cli.project_dir.clone(), cli.base_url.clone())?;
    let downloader = HttpDownloader::new(config.http_client()?);
    let prompter: Box<dyn Prompter> = if cli.yes {
        Box::new(AutoConfirm(TerminalPrompter))
    } else {
        Box::new(TerminalPrompter)
    };
    let platform = HostDetector.detect()?;

    Ok(Pipeline::new(
        runtime,
        prompter,
        SystemProcessRunner,
        downloader,
        ZipExtractor,
        config,
        platform,
    ))
}

fn platform_report(platform: &PlatformIdentifier) -> serde_json::Value {
    serde_json::json!({
        "os": platform.os(),
        "arch": platform.arch(),
        "display": platform.to_string(),
        "archive": platform.archive_name(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run(args) => {
            let options = RunOptions {
                entry: args.entry,
                no_run: args.no_run,
                keep: args.keep,
            };
            match host_pipeline(&cli)?.run(&options).await? {
                Outcome::Completed => println!("        done"),
                Outcome::OptedOut => {}
            }
        }
        Commands::Fetch(args) => {
            host_pipeline(&cli)?.fetch(args.all).await?;
        }
        Commands::Platform(args) => {
            let platform = HostDetector.detect()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&platform_report(&platform))?);
            } else {
                println!("{} ({})", platform, platform.archive_name());
            }
        }
        Commands::Clean(_args) => {
            let runtime = RealRuntime;
            let config = Config::new(&runtime, cli.project_dir.clone(), cli.base_url.clone())?;
            config.layout.check()?;
            if pipeline::clean(&runtime, &config.layout).is_empty() {
                println!("Nothing to clean.");
            }
        }
    }
    Ok(())
}
