//! Build driver and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution: it loads the environment and manifests, writes
//! the build graph and the artifact record, then delegates actual building
//! to the external Ninja executor behind the [`Executor`] seam.
//!
//! `prepare` is idempotent, but two simultaneous builds sharing one output
//! directory race on the generated graph file; one invocation at a time per
//! environment is the supported mode.

mod process;

pub use process::{NinjaExecutor, resolve_ninja_program};

use crate::cli::{BuildArgs, Cli, Commands};
use crate::environment::{self, Environment};
use crate::manifest::{self, ManifestStore};
use crate::{ninja_gen, record};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::fs;
use std::io;
use thiserror::Error;
use tracing::{debug, info};

/// Default Ninja executable to invoke.
pub const NINJA_PROGRAM: &str = "ninja";

/// Environment variable override for the Ninja executable.
pub const NINJA_ENV: &str = "KILN_NINJA";

/// One executor invocation: a graph file, a parallelism degree, and an
/// optional target output path. No target means "build everything reachable
/// from `all`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Path of the generated graph file.
    pub graph_file: Utf8PathBuf,
    /// Parallelism degree forwarded as `-j`.
    pub jobs: u64,
    /// Output path of the single target to build, if restricted.
    pub target: Option<Utf8PathBuf>,
}

/// Boundary to the external incremental-build executor.
///
/// The driver talks to Ninja exclusively through this trait so tests can
/// observe or suppress invocations.
#[cfg_attr(test, mockall::automock)]
pub trait Executor {
    /// Run the executor to completion, blocking until it exits.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the process fails to spawn or exits with
    /// a non-zero status.
    fn execute(&self, request: &ExecRequest) -> io::Result<()>;
}

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// A build was requested for an identifier absent from the store.
    #[error("unknown target: {target}")]
    #[diagnostic(code(kiln::runner::unknown_target))]
    UnknownTarget {
        /// The identifier that was requested.
        target: String,
    },

    /// The executor failed while building every target.
    #[error("failed to build all targets for {env_key}")]
    #[diagnostic(code(kiln::runner::build_all))]
    BuildAll {
        /// Key of the environment being built.
        env_key: String,
        /// Underlying executor failure.
        #[source]
        source: io::Error,
    },

    /// The executor failed while building a single target.
    #[error("failed to build {target} for {env_key}")]
    #[diagnostic(code(kiln::runner::build_target))]
    BuildTarget {
        /// The identifier being built.
        target: String,
        /// Key of the environment being built.
        env_key: String,
        /// Underlying executor failure.
        #[source]
        source: io::Error,
    },
}

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if preparation fails or the executor reports a failure.
pub fn run(cli: &Cli) -> Result<()> {
    let root = cli
        .directory
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    let command = cli
        .command
        .clone()
        .unwrap_or(Commands::Build(BuildArgs::default()));
    match command {
        Commands::Prepare => {
            let (env, store) = prepare(&root, &cli.env)?;
            info!(
                "prepared {} with {} projects at {}",
                env.key,
                store.len(),
                env.ninjafile,
            );
            Ok(())
        }
        Commands::Build(args) => {
            let executor = NinjaExecutor::from_env();
            match args.target {
                Some(target) => {
                    let out = build_one(&root, &cli.env, &target, cli.jobs, &executor)?;
                    info!("built {target} at {out}");
                    Ok(())
                }
                None => build_all(&root, &cli.env, cli.jobs, &executor),
            }
        }
    }
}

/// Load the environment and manifests, then write the graph and the record.
///
/// The graph is compiled before anything touches the filesystem, so a
/// configuration error leaves no partial output behind. Both the graph file
/// and the record are fully overwritten on every call; directory creation is
/// idempotent.
///
/// # Errors
///
/// Returns an error when the environment or a manifest is malformed, the
/// graph does not compile, or one of the writes fails.
pub fn prepare(root: &Utf8Path, env_name: &str) -> Result<(Environment, ManifestStore)> {
    let env = environment::load(root, env_name)
        .with_context(|| format!("loading environment {env_name}"))?;
    let store = manifest::load_all(root).context("loading project manifests")?;
    debug!("loaded {} project manifests", store.len());

    let graph = ninja_gen::generate(&store, &env).context("compiling the build graph")?;

    let dir = root.join(&env.dir);
    fs::create_dir_all(&dir).with_context(|| format!("creating output directory {dir}"))?;
    let graph_file = root.join(&env.ninjafile);
    fs::write(&graph_file, graph).with_context(|| format!("writing graph file {graph_file}"))?;
    record::write(&store, &env, root).context("writing the artifact record")?;

    Ok((env, store))
}

/// Prepare and build every target reachable from `all`.
///
/// # Errors
///
/// Returns [`RunnerError::BuildAll`] tagged with the environment key when
/// the executor exits non-zero.
pub fn build_all(
    root: &Utf8Path,
    env_name: &str,
    jobs: u64,
    executor: &dyn Executor,
) -> Result<()> {
    let (env, _) = prepare(root, env_name)?;
    info!("building all targets for {}", env.key);
    let request = ExecRequest {
        graph_file: root.join(&env.ninjafile),
        jobs,
        target: None,
    };
    executor
        .execute(&request)
        .map_err(|source| RunnerError::BuildAll {
            env_key: env.key.clone(),
            source,
        })?;
    Ok(())
}

/// Prepare and build one project, returning its output path.
///
/// # Errors
///
/// Fails with [`RunnerError::UnknownTarget`] before any executor invocation
/// when `target` is absent from the store, and with
/// [`RunnerError::BuildTarget`] when the executor exits non-zero.
pub fn build_one(
    root: &Utf8Path,
    env_name: &str,
    target: &str,
    jobs: u64,
    executor: &dyn Executor,
) -> Result<Utf8PathBuf> {
    let (env, store) = prepare(root, env_name)?;
    let Some(project) = store.get(target) else {
        return Err(RunnerError::UnknownTarget {
            target: target.to_owned(),
        }
        .into());
    };
    info!("building {} for {}", target, env.key);
    let request = ExecRequest {
        graph_file: root.join(&env.ninjafile),
        jobs,
        target: Some(project.out.clone()),
    };
    executor
        .execute(&request)
        .map_err(|source| RunnerError::BuildTarget {
            target: target.to_owned(),
            env_key: env.key.clone(),
            source,
        })?;
    Ok(project.out.clone())
}
