//! Command-line front end for ragline.
//!
//! Provides the `chat`, `ask`, `index` and `demo` subcommands of the
//! `ragline` binary.

pub mod cli;
pub mod commands;
pub mod render;
pub mod samples;

use anyhow::Result;
use ragline_core::Settings;

use crate::cli::{Cli, Commands};

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::from_env()?;
    if let Some(index_path) = cli.index_path {
        settings.index_path = index_path;
    }
    if let Some(documents_dir) = cli.documents_dir {
        settings.documents_dir = documents_dir;
    }

    match cli.command {
        Commands::Chat { samples } => commands::chat(&settings, samples).await,
        Commands::Ask { question } => commands::ask(&settings, &question).await,
        Commands::Index => commands::index(&settings).await,
        Commands::Demo => commands::demo(&settings).await,
    }
}
