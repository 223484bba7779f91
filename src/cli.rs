use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "stepsmith")]
#[command(about = "Turns loose requirement text into consistent BDD test artifacts")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a project: default config plus directory layout
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Scan existing step definitions and report registry statistics
    Scan {
        /// Directory of step-definition files
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },

    /// Analyze a requirement against the registry without generating
    Analyze {
        /// Requirement document to analyze
        input: PathBuf,

        /// Directory of step-definition files
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Generate the feature / steps / page triple for a requirement
    Generate {
        /// Requirement document to generate from
        input: PathBuf,

        /// Output directory for generated artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory of step-definition files
        #[arg(short, long)]
        registry: Option<PathBuf>,

        /// Overwrite existing artifacts
        #[arg(long)]
        force: bool,
    },

    /// Check that a requirement renders to a consistent artifact triple
    Validate {
        /// Requirement document to check
        input: PathBuf,

        /// Directory of step-definition files
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => engine.init(path, force).await,
            Commands::Scan { registry } => engine.scan(registry).await,
            Commands::Analyze {
                input,
                registry,
                report,
            } => engine.analyze(input, registry, report).await,
            Commands::Generate {
                input,
                output,
                registry,
                force,
            } => engine.generate(input, output, registry, force).await,
            Commands::Validate { input, registry } => engine.validate(input, registry).await,
        }
    }
}
