//! CLI argument definitions using clap derive

use crate::processor::ProcessorKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sheetpack - Sprite sheet batch packer
///
/// Expands an option tree into packer jobs and runs them locally or on an
/// execution service, skipping jobs whose outputs are up to date.
#[derive(Parser, Debug)]
#[command(name = "sheetpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SHEETPACK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pack every sheet described by an option tree
    Pack(PackArgs),

    /// Show the jobs an option tree expands to, without running them
    Plan(PlanArgs),

    /// Run the execution service for remote packing
    Serve(ServeArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Inspect or reset the output cache
    Cache(CacheArgs),
}

/// Arguments for the pack command
#[derive(Parser, Debug)]
pub struct PackArgs {
    /// Where jobs run
    #[arg(short = 't', long = "type", value_enum, default_value = "local")]
    pub processor: ProcessorKind,

    /// Execution service URL (remote only; defaults to remote.address)
    #[arg(short, long)]
    pub address: Option<String>,

    /// Option tree file (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output root directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Ignore and do not update the output cache
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Option tree file (JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Listen address (defaults to server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Parent directory for per-request scratch space
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List recorded jobs and their outputs
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove every record, forcing the next pack to rebuild
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pack_accepts_short_flags() {
        let cli = Cli::parse_from([
            "sheetpack", "pack", "-t", "remote", "-a", "http://10.0.0.2:3456/", "-i",
            "tree.json", "-o", "out",
        ]);
        match cli.command {
            Commands::Pack(args) => {
                assert_eq!(args.processor, ProcessorKind::Remote);
                assert_eq!(args.address.as_deref(), Some("http://10.0.0.2:3456/"));
                assert_eq!(args.input, PathBuf::from("tree.json"));
                assert!(!args.no_cache);
            }
            other => panic!("expected pack, got {:?}", other),
        }
    }

    #[test]
    fn pack_defaults_to_local() {
        let cli = Cli::parse_from(["sheetpack", "-vv", "pack", "-i", "t.json", "-o", "out"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Pack(args) => assert_eq!(args.processor, ProcessorKind::Local),
            other => panic!("expected pack, got {:?}", other),
        }
    }
}
