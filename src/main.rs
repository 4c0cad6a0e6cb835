use anyhow::Result;
use clap::Parser;
use log::error;
use lsi::commands::{self, Config, Options};
use lsi::error::InstallerError;
use lsi::runtime::RealRuntime;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// lsi - Language Server Installer
///
/// Install and uninstall language servers described by a JSON catalog.
///
/// Examples:
///   lsi install html-ls            # Install the default version of html-ls
///   lsi install --sync rust@1.2.3  # Install a pinned version and wait for it
///   lsi uninstall-all              # Remove every installed server
#[derive(Parser, Debug)]
#[command(author, version = env!("LSI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Install root directory (overrides defaults; also via LSI_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "LSI_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub install_root: Option<PathBuf>,

    /// Catalog file (defaults to <config dir>/lsi/catalog.json; also via LSI_CATALOG)
    #[arg(long, env = "LSI_CATALOG", value_name = "FILE", global = true)]
    pub catalog: Option<PathBuf>,

    /// Exit with a non-zero status on fatal errors instead of just reporting them
    #[arg(long, global = true)]
    pub headless: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install one or more servers ("name" or "name@version")
    Install(InstallArgs),

    /// Uninstall one or more servers
    Uninstall(UninstallArgs),

    /// Remove the whole install root
    UninstallAll(UninstallAllArgs),

    /// List installed servers
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Servers to install
    #[arg(value_name = "SERVER[@VERSION]", required = true)]
    pub servers: Vec<String>,

    /// Wait for the whole batch and fail if any server fails
    #[arg(long)]
    pub sync: bool,

    /// Maximum seconds to wait for a synchronous batch
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct UninstallArgs {
    /// Servers to uninstall
    #[arg(value_name = "SERVER", required = true)]
    pub servers: Vec<String>,

    /// Uninstall one after another and fail on the first error
    #[arg(long)]
    pub sync: bool,
}

#[derive(clap::Args, Debug)]
pub struct UninstallAllArgs {
    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show every server in the catalog
    #[arg(long)]
    pub available: bool,
}

async fn run(config: &Config<RealRuntime>, command: Commands) -> Result<()> {
    match command {
        Commands::Install(args) => commands::install(config, &args.servers, args.sync).await,
        Commands::Uninstall(args) => {
            commands::uninstall(config, &args.servers, args.sync).await
        }
        Commands::UninstallAll(args) => commands::uninstall_all(config, args.yes).await,
        Commands::List(args) => commands::list(config, args.available),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let max_wait = match &cli.command {
        Commands::Install(args) => args.timeout.map(Duration::from_secs),
        _ => None,
    };
    let options = Options {
        install_root: cli.install_root,
        catalog: cli.catalog,
        headless: cli.headless || !std::io::stdin().is_terminal(),
        max_wait,
    };

    let config = match Config::new(RealRuntime, options) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run(&config, cli.command).await;
    config.queue.wait_idle().await;

    if let Err(e) = &result {
        // Installer errors were already reported where they were raised
        if e.downcast_ref::<InstallerError>().is_none() {
            error!("{:#}", e);
        }
    }

    match config.services.host.requested_exit() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None if result.is_err() => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
