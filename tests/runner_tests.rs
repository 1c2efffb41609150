//! Integration tests for the build driver.

mod common;

use common::{sample_store, utf8_root, write_workspace};
use camino::Utf8PathBuf;
use kiln::runner::{self, ExecRequest, Executor, RunnerError};
use std::fs;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Stub executor recording every invocation.
#[derive(Default)]
struct CountingExecutor {
    calls: AtomicUsize,
    fail: bool,
    last: Mutex<Option<ExecRequest>>,
}

impl CountingExecutor {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last(&self) -> Option<ExecRequest> {
        self.last.lock().expect("lock last request").clone()
    }
}

impl Executor for CountingExecutor {
    fn execute(&self, request: &ExecRequest) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("lock last request") = Some(request.clone());
        if self.fail {
            Err(io::Error::other("executor exited with exit status: 1"))
        } else {
            Ok(())
        }
    }
}

#[test]
fn prepare_writes_the_graph_and_the_record() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);

    let (env, store) = runner::prepare(&root, "host").expect("prepare");
    assert_eq!(env.key, "host");
    assert_eq!(store, sample_store());

    let graph = fs::read_to_string(root.join("build/host/build.ninja")).expect("read graph");
    assert!(graph.starts_with("# Generated by kiln"));
    assert!(root.join("build/host/manifest.json").exists());
}

#[test]
fn prepare_fully_overwrites_a_stale_graph() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);
    fs::create_dir_all(root.join("build/host")).expect("create output dir");
    fs::write(root.join("build/host/build.ninja"), "stale").expect("write stale graph");

    runner::prepare(&root, "host").expect("prepare");

    let graph = fs::read_to_string(root.join("build/host/build.ninja")).expect("read graph");
    assert!(!graph.contains("stale"));
    assert!(graph.ends_with("build all: phony build/host/app build/host/libfoo.a\n"));
}

#[test]
fn a_configuration_error_leaves_no_graph_behind() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);
    // A third project reusing libfoo's object path poisons the whole store.
    fs::create_dir_all(root.join("src/zzz")).expect("create project dir");
    fs::write(
        root.join("src/zzz/project.json"),
        r#"{
            "id": "dup",
            "kind": "lib",
            "objs": [{"obj": "build/host/foo/a.o", "src": "src/zzz/b.c"}],
            "out": "build/host/libdup.a"
        }"#,
    )
    .expect("write duplicate manifest");

    runner::prepare(&root, "host").expect_err("configuration error");
    assert!(!root.join("build/host/build.ninja").exists());
    assert!(!root.join("build/host/manifest.json").exists());
}

#[test]
fn build_all_runs_the_executor_without_a_target() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);

    let executor = CountingExecutor::default();
    runner::build_all(&root, "host", 2, &executor).expect("build all");

    assert_eq!(executor.calls(), 1);
    let request = executor.last().expect("recorded request");
    assert_eq!(request.graph_file, root.join("build/host/build.ninja"));
    assert_eq!(request.jobs, 2);
    assert_eq!(request.target, None);
}

#[test]
fn build_one_returns_the_target_output_path() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);

    let executor = CountingExecutor::default();
    let out = runner::build_one(&root, "host", "libfoo", 1, &executor).expect("build target");

    assert_eq!(out, Utf8PathBuf::from("build/host/libfoo.a"));
    assert_eq!(executor.calls(), 1);
    let request = executor.last().expect("recorded request");
    assert_eq!(request.target, Some(out));
}

#[test]
fn build_one_with_an_unknown_target_never_invokes_the_executor() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);

    let executor = CountingExecutor::default();
    let err = runner::build_one(&root, "host", "nope", 1, &executor).expect_err("unknown target");

    assert_eq!(executor.calls(), 0);
    let runner_err = err.downcast_ref::<RunnerError>().expect("typed error");
    assert!(matches!(
        runner_err,
        RunnerError::UnknownTarget { target } if target == "nope"
    ));
}

#[test]
fn an_executor_failure_surfaces_with_the_environment_key() {
    let dir = TempDir::new().expect("create temp dir");
    let root = utf8_root(&dir);
    write_workspace(&root);

    let executor = CountingExecutor::failing();
    let err = runner::build_all(&root, "host", 1, &executor).expect_err("executor failure");
    let runner_err = err.downcast_ref::<RunnerError>().expect("typed error");
    assert!(matches!(
        runner_err,
        RunnerError::BuildAll { env_key, .. } if env_key == "host"
    ));

    let err = runner::build_one(&root, "host", "app", 1, &executor).expect_err("executor failure");
    let runner_err = err.downcast_ref::<RunnerError>().expect("typed error");
    assert!(matches!(
        runner_err,
        RunnerError::BuildTarget { target, env_key, .. }
            if target == "app" && env_key == "host"
    ));
}
