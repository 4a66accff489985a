//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::build::{self, BuildArgs};
use super::inspect;
use super::output::{Output, OutputFormat};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "markweave")]
#[command(
    author,
    version,
    about = "Markdown to HTML with tables of contents, reference links and change markers"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format [default: text, or default_format from the user config]
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert Markdown files to HTML pages
    Build {
        /// Files, or directories with --recursive
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Convert all `.md` files in given directories
        #[arg(long, short)]
        recursive: bool,

        /// Site root; URLs are relative to it [default: site config root or cwd]
        #[arg(long)]
        root: Option<PathBuf>,

        /// Reference document whose headings become linked terms
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Heading level of reference terms (repeatable) [default: 2]
        #[arg(long = "reference-level", value_parser = clap::value_parser!(u8).range(1..=6))]
        reference_levels: Vec<u8>,

        /// Write pages under this directory instead of next to sources
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the table of contents of a page
    Toc {
        /// Markdown file
        file: PathBuf,
    },

    /// Print which commit last changed each line of a file
    Blame {
        /// File tracked by git
        file: PathBuf,

        /// Only show commits after this ref
        #[arg(long)]
        since: Option<String>,
    },

    /// List the terms a reference document defines
    Refs {
        /// Reference document
        file: PathBuf,

        /// Site root for canonical URLs
        #[arg(long)]
        root: Option<PathBuf>,

        /// Heading level of reference terms (repeatable) [default: 2]
        #[arg(long = "reference-level", value_parser = clap::value_parser!(u8).range(1..=6))]
        reference_levels: Vec<u8>,
    },
}

impl Commands {
    fn root(&self) -> Option<&Path> {
        match self {
            Commands::Build { root, .. } | Commands::Refs { root, .. } => root.as_deref(),
            Commands::Toc { .. } | Commands::Blame { .. } => None,
        }
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the level
fn init_tracing(verbose: bool) {
    let filter = if verbose { "markweave=debug" } else { "markweave=info" };

    // An already installed subscriber is kept
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.command.root() {
        Some(root) => Config::for_project(root)?,
        None => Config::load()?,
    };

    let verbose = cli.verbose || config.global.verbose;
    init_tracing(verbose);

    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format, verbose);
    debug!(root = ?config.project_root, "Loaded configuration");

    match cli.command {
        Commands::Build {
            paths,
            recursive,
            root,
            reference,
            reference_levels,
            output: output_dir,
        } => build::run(
            &output,
            &config,
            BuildArgs {
                paths,
                recursive,
                root,
                reference,
                reference_levels,
                output_dir,
            },
        )?,

        Commands::Toc { file } => inspect::toc(&output, &config, &file)?,

        Commands::Blame { file, since } => {
            inspect::blame(&output, &config, &file, since.as_deref())?
        }

        Commands::Refs {
            file,
            root,
            reference_levels,
        } => inspect::refs(&output, &config, &file, root.as_deref(), &reference_levels)?,
    }

    Ok(())
}
