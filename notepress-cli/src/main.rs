//! # notepress CLI
//!
//! Command-line interface for publishing SiYuan notes to a Hugo site.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "notepress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "notepress.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample notepress.yml
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Publish the marked notes and everything they reference
    Publish {
        /// API token of the note store (overrides the config file)
        #[arg(long, env = "NOTEPRESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Do not run the site generator after writing
        #[arg(long)]
        skip_generator: bool,
    },

    /// Show what would be published without writing anything
    Plan {
        /// API token of the note store (overrides the config file)
        #[arg(long, env = "NOTEPRESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Publish {
            token,
            skip_generator,
        } => commands::publish_notes(&cli.config, token, skip_generator).await,
        Commands::Plan { token, json } => commands::plan_notes(&cli.config, token, json).await,
    }
}
