//! sheetpack - Sprite sheet batch packer
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use sheetpack::cli::{commands, Cli, Commands};
use sheetpack::config::{Config, ConfigManager};
use sheetpack::error::PackResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PackResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Pack(args) => commands::pack(args, &config).await,
        Commands::Plan(args) => commands::plan(args, &config).await,
        Commands::Serve(args) => commands::serve(args, &config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
fn init_logging(verbose: u8, config: &Config) {
    let level = match verbose {
        0 => "sheetpack=warn",
        1 => "sheetpack=info",
        _ => "sheetpack=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
