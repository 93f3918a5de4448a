use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "servicemap")]
#[command(about = "Groups a codebase into service contexts for documentation generation")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a codebase and report its service contexts
    Analyze {
        /// Source directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (json, summary)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Show the dependency graph of one service
    Graph {
        /// Service name, as derived during analysis
        service: String,

        /// Source directory to analyze
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Graph format (json, mermaid)
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Write a default servicemap.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Analyze { source, output, format } => {
                engine.analyze(source, output, format).await
            }
            Commands::Graph { service, source, format } => {
                engine.graph(&service, source, &format).await
            }
            Commands::Init { path } => {
                engine.init(path).await
            }
        }
    }
}
