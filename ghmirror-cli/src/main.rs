//! ghmirror CLI - Command line interface for ghmirror
//!
//! Keeps a bare mirror of every repository a GitHub token can see.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ghmirror_core::config::CliOverrides;
use ghmirror_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::RunArgs;

/// ghmirror: mirror every repository of a GitHub account
#[derive(Parser, Debug)]
#[command(name = "ghmirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.config/ghmirror/config.toml
    #[arg(long, global = true, env = "GHMIRROR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone or update every repository (default)
    #[command(visible_alias = "r")]
    Run(RunArgs),

    /// Show current configuration
    Config,

    /// Show version information
    Version,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Version) => {
            println!("ghmirror {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Config) => {
            let config = Config::load_with_overrides(cli.config.as_deref(), CliOverrides::default())?;
            print_config(&config, cli.config.as_deref());
        }
        Some(Commands::Run(args)) => {
            args.execute(cli.verbose, cli.config.as_deref()).await?;
        }
        None => {
            RunArgs::default()
                .execute(cli.verbose, cli.config.as_deref())
                .await?;
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit: Option<&std::path::Path>) {
    println!("ghmirror Configuration");
    println!("======================");
    println!();
    println!("Mirror Settings:");
    println!("  root: {}", config.mirror.root.display());
    println!("  workers: {}", config.mirror.workers);
    println!("  git_path: {}", config.mirror.git_path);
    println!();
    println!("GitHub Settings:");
    println!("  host: {}", config.github.host);
    println!(
        "  api_url: {}",
        config.github.api_url.as_deref().unwrap_or("(default)")
    );
    println!();
    println!("Credentials:");
    println!("  provision: {}", config.credentials.provision);
    println!();

    let path = explicit
        .map(std::path::Path::to_path_buf)
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
