//! Shared on-disk fixtures for integration tests.

use camino::{Utf8Path, Utf8PathBuf};
use kiln::environment::Environment;
use kiln::manifest::{ManifestStore, ObjectMapping, Project, ProjectKind};
use std::fs;
use tempfile::TempDir;

/// The environment written by [`write_workspace`].
pub fn sample_environment() -> Environment {
    Environment {
        key: "host".into(),
        cc: "gcc".into(),
        cxx: "g++".into(),
        ld: "ld".into(),
        ar: "ar".into(),
        asm: "as".into(),
        cflags: vec!["-O2".into(), "-Wall".into()],
        cxxflags: vec!["-std=c++17".into()],
        ldflags: vec!["-static".into()],
        asflags: vec!["-g".into()],
        dir: "build/host".into(),
        ninjafile: "build/host/build.ninja".into(),
    }
}

/// The store written by [`write_workspace`], in discovery order: the walk is
/// sorted, so `src/app` is visited before `src/foo`.
pub fn sample_store() -> ManifestStore {
    let app = Project {
        id: "app".to_owned(),
        kind: ProjectKind::Artifact,
        objs: vec![ObjectMapping {
            obj: "build/host/app/main.o".into(),
            src: "src/app/main.c".into(),
        }],
        libs: vec!["build/host/libfoo.a".into()],
        out: "build/host/app".into(),
        includes: vec!["src".into()],
    };
    let libfoo = Project {
        id: "libfoo".to_owned(),
        kind: ProjectKind::Lib,
        objs: vec![ObjectMapping {
            obj: "build/host/foo/a.o".into(),
            src: "src/foo/a.c".into(),
        }],
        libs: Vec::new(),
        out: "build/host/libfoo.a".into(),
        includes: vec!["src".into()],
    };
    let mut store = ManifestStore::new();
    store.insert(app.id.clone(), app);
    store.insert(libfoo.id.clone(), libfoo);
    store
}

/// Populate `root` with `envs/host.json` and one `project.json` per sample
/// project, mirroring the layout kiln discovers at runtime.
pub fn write_workspace(root: &Utf8Path) {
    fs::create_dir_all(root.join("envs")).expect("create envs dir");
    let env_text =
        serde_json::to_string_pretty(&sample_environment()).expect("serialize environment");
    fs::write(root.join("envs/host.json"), env_text).expect("write environment");

    for (id, project) in &sample_store() {
        let dir = match id.as_str() {
            "libfoo" => root.join("src/foo"),
            other => root.join("src").join(other),
        };
        fs::create_dir_all(&dir).expect("create project dir");
        let text = serde_json::to_string_pretty(project).expect("serialize project");
        fs::write(dir.join("project.json"), text).expect("write project manifest");
    }
}

/// Borrow a temporary directory as a UTF-8 path.
pub fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 temp dir")
}
