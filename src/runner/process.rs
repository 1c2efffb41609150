//! Subprocess plumbing for the Ninja executor.
//! Internal to `runner`; the public API is defined in `runner.rs`.

use super::{ExecRequest, Executor, NINJA_ENV, NINJA_PROGRAM};
use camino::Utf8PathBuf;
use itertools::Itertools;
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use tracing::info;

fn resolve_with<F>(mut read_env: F) -> Utf8PathBuf
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(NINJA_ENV)
        .and_then(|value| Utf8PathBuf::from_path_buf(PathBuf::from(value)).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(NINJA_PROGRAM))
}

/// Resolve the executor program, honouring the `KILN_NINJA` override.
#[must_use]
pub fn resolve_ninja_program() -> Utf8PathBuf {
    resolve_with(|key| env::var_os(key))
}

/// The real executor: a blocking `ninja` subprocess invocation of the form
/// `<program> -j <jobs> -f <graphfile> [<target>]`.
///
/// Standard output and error are inherited so the executor's diagnostics
/// reach the user unaltered. The exit code is the sole success signal.
#[derive(Debug, Clone)]
pub struct NinjaExecutor {
    program: Utf8PathBuf,
}

impl NinjaExecutor {
    /// Create an executor invoking the given program.
    #[must_use]
    pub const fn new(program: Utf8PathBuf) -> Self {
        Self { program }
    }

    /// Create an executor resolving the program from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(resolve_ninja_program())
    }
}

impl Executor for NinjaExecutor {
    fn execute(&self, request: &ExecRequest) -> io::Result<()> {
        let mut cmd = Command::new(self.program.as_std_path());
        cmd.arg("-j").arg(request.jobs.to_string());
        cmd.arg("-f").arg(request.graph_file.as_std_path());
        if let Some(target) = &request.target {
            cmd.arg(target.as_std_path());
        }
        log_command_execution(&cmd);
        let status = cmd.status()?;
        check_exit_status(status)
    }
}

fn log_command_execution(cmd: &Command) {
    let args = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .join(" ");
    info!(
        "Running command: {} {}",
        cmd.get_program().to_string_lossy(),
        args
    );
}

fn check_exit_status(status: ExitStatus) -> io::Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("executor exited with {status}")))
    }
}
