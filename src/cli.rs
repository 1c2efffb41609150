//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Maximum number of executor jobs accepted by the CLI.
pub const MAX_JOBS: u64 = 64;

/// Default environment name used when none is provided.
pub const DEFAULT_ENV: &str = "host";

/// A manifest-driven build-graph compiler that emits Ninja files.
#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if started in this directory.
    ///
    /// This affects environment lookup, manifest discovery, and output paths.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<Utf8PathBuf>,

    /// Toolchain environment to build against.
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_ENV)]
    pub env: String,

    /// Number of parallel executor jobs.
    ///
    /// Values must be between 1 and 64.
    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..=MAX_JOBS)
    )]
    pub jobs: u64,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `build` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Build(BuildArgs::default()));
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            directory: None,
            env: DEFAULT_ENV.to_owned(),
            jobs: 1,
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Arguments accepted by the `build` command.
#[derive(Debug, Args, PartialEq, Eq, Clone, Default)]
pub struct BuildArgs {
    /// Identifier of a single project to build; all projects when omitted.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,
}

/// Available top-level commands for kiln.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Compile the build graph and invoke the executor.
    Build(BuildArgs),

    /// Write the build graph and artifact record without building.
    Prepare,
}
