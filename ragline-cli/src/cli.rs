use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ragline")]
#[command(about = "Ask questions about your text documents with retrieval-augmented generation")]
#[command(version)]
pub struct Cli {
    /// Base name of the saved index (overrides INDEX_PATH)
    #[arg(long, global = true)]
    pub index_path: Option<PathBuf>,

    /// Directory of .txt documents (overrides DOCUMENTS_DIR)
    #[arg(long, global = true)]
    pub documents_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive question/answer loop
    Chat {
        /// Write the bundled sample documents before indexing
        #[arg(long)]
        samples: bool,
    },

    /// Answer a single question from the saved index
    Ask {
        /// The question to answer
        question: String,
    },

    /// Build an index from the documents directory and save it
    Index,

    /// Non-interactive walkthrough on the bundled agriculture documents
    Demo,
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
    fn parses_ask_with_global_paths() {
        let cli =
            Cli::parse_from(["ragline", "ask", "What is crop farming?", "--index-path", "idx"]);
        assert_eq!(cli.index_path, Some(PathBuf::from("idx")));
        match cli.command {
            Commands::Ask { question } => assert_eq!(question, "What is crop farming?"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_chat_samples_flag() {
        let cli = Cli::parse_from(["ragline", "chat", "--samples"]);
        assert!(matches!(cli.command, Commands::Chat { samples: true }));
    }
}
