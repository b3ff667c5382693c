//! CLI parser and dispatch to command-specific modules.

mod config_cmd;
mod inspect;
mod process;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::models::ResultFormat;

#[derive(Parser)]
#[command(name = "medscan")]
#[command(about = "Medical document OCR formatting, entity extraction and batch reports")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OCR profile to use (overrides config)
    #[arg(short, long, global = true, env = "MEDSCAN_PROFILE")]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every image in a directory using captured provider responses
    Process {
        /// Directory containing images (storage root with --user)
        dir: PathBuf,
        /// Read images from `<dir>/<user>/images/` and save under `<user>/ocr_results/`
        #[arg(long)]
        user: Option<String>,
        /// Subfolder of the user's images folder
        #[arg(long, requires = "user")]
        subfolder: Option<String>,
        /// Directory holding `<image>.json` responses (default: next to each image)
        #[arg(long)]
        responses: Option<PathBuf>,
        /// Limit number of images to process (0 = unlimited)
        #[arg(short = 'n', long)]
        max_items: Option<usize>,
        /// Abort on the first failed image
        #[arg(long)]
        fail_fast: bool,
        /// Result format: text_only, structured or full
        #[arg(short, long)]
        format: Option<ResultFormat>,
        /// Write a JSON backup of the results to this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print results and report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Normalize a single provider response and show what was found
    Inspect {
        /// Provider response JSON file
        file: PathBuf,
        /// Result format: text_only, structured or full
        #[arg(short, long)]
        format: Option<ResultFormat>,
        /// Clean up OCR artifacts in the printed text
        #[arg(long)]
        clean: bool,
        /// Print the normalized result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the analysis report from saved results
    Report {
        /// Results file written by `process --output`
        results: PathBuf,
        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// List available OCR profiles
    Profiles,
}

/// Load configuration from `--config` or by discovery, applying the
/// `--profile` override.
pub async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?,
        None => Config::load().await,
    };
    if let Some(profile) = &cli.profile {
        config.profile = profile.clone();
    }
    Ok(config)
}

/// Run the CLI.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Process {
            dir,
            user,
            subfolder,
            responses,
            max_items,
            fail_fast,
            format,
            output,
            json,
        } => {
            let options = process::ProcessOptions {
                user,
                subfolder,
                responses,
                max_items,
                fail_fast,
                format,
                output,
                json,
            };
            process::cmd_process(&config, &dir, options).await
        }
        Commands::Inspect {
            file,
            format,
            clean,
            json,
        } => inspect::cmd_inspect(&config, &file, format, clean, json).await,
        Commands::Report { results, output } => {
            report::cmd_report(&results, output.as_deref()).await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_cmd::cmd_config_show(&config),
            ConfigCommands::Profiles => config_cmd::cmd_config_profiles(&config),
        },
    }
}
