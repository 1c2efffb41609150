//! Ninja build-graph generator.
//!
//! This module is the core of kiln: it compiles a [`ManifestStore`] and an
//! [`Environment`] into the textual build description consumed by the Ninja
//! executor. Compilation is a pure function of its inputs; all file I/O is
//! performed by the caller. The whole store is validated before a single
//! byte of output is produced, so a partially-valid graph is never emitted.

use crate::environment::Environment;
use crate::manifest::{self, ManifestStore, ProjectKind};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use miette::Diagnostic;
use std::collections::HashMap;
use thiserror::Error;

/// Configuration errors detected during graph compilation.
///
/// Each variant carries enough context (project id, offending path) to locate
/// the declaration at fault.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A project declares no output path.
    #[error("project {project} has no output path")]
    #[diagnostic(code(kiln::graph::missing_output))]
    MissingOutput {
        /// Identifier of the offending project.
        project: String,
    },

    /// An artifact has nothing to link.
    #[error("artifact {project} has no objects or extra link inputs")]
    #[diagnostic(code(kiln::graph::empty_artifact))]
    EmptyArtifact {
        /// Identifier of the offending project.
        project: String,
    },

    /// A source file matches none of the compile rules.
    #[error("project {project}: source {path} has an unrecognised extension")]
    #[diagnostic(code(kiln::graph::unknown_source_kind))]
    UnknownSourceKind {
        /// Identifier of the offending project.
        project: String,
        /// The source path that no rule accepts.
        path: Utf8PathBuf,
    },

    /// Two projects declare the same object-output path. Left unchecked this
    /// would silently merge two unrelated compile steps in the emitted graph.
    #[error("object {object} is declared by both {first} and {second}")]
    #[diagnostic(code(kiln::graph::duplicate_object))]
    DuplicateObject {
        /// The object path declared twice.
        object: Utf8PathBuf,
        /// Project that declared the path first.
        first: String,
        /// Project that declared the path again.
        second: String,
    },
}

/// Select the compile rule for a source file by extension.
fn rule_for_source(src: &Utf8Path) -> Option<&'static str> {
    match src.extension() {
        Some("c") => Some("cc"),
        Some("cpp") => Some("cxx"),
        Some("s" | "S") => Some("as"),
        _ => None,
    }
}

/// Reject malformed descriptors before any output is generated.
fn validate(store: &ManifestStore) -> Result<(), GraphError> {
    let mut declared: HashMap<&Utf8Path, &str> = HashMap::new();
    for project in store.values() {
        if project.out.as_str().is_empty() {
            return Err(GraphError::MissingOutput {
                project: project.id.clone(),
            });
        }
        if project.kind == ProjectKind::Artifact
            && project.objs.is_empty()
            && project.libs.is_empty()
        {
            return Err(GraphError::EmptyArtifact {
                project: project.id.clone(),
            });
        }
        for mapping in &project.objs {
            if rule_for_source(&mapping.src).is_none() {
                return Err(GraphError::UnknownSourceKind {
                    project: project.id.clone(),
                    path: mapping.src.clone(),
                });
            }
            if let Some(first) = declared.insert(mapping.obj.as_path(), &project.id) {
                return Err(GraphError::DuplicateObject {
                    object: mapping.obj.clone(),
                    first: first.to_owned(),
                    second: project.id.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Incremental writer for the Ninja file syntax.
struct NinjaWriter {
    out: String,
}

impl NinjaWriter {
    const fn new() -> Self {
        Self { out: String::new() }
    }

    fn comment(&mut self, text: &str) {
        self.out.push_str(&format!("# {text}\n"));
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    fn variable(&mut self, key: &str, value: &str) {
        self.out.push_str(&format!("{key} = {value}\n"));
    }

    fn rule(&mut self, name: &str, command: &str, depfile: Option<&str>) {
        self.out.push_str(&format!("rule {name}\n"));
        self.out.push_str(&format!("  command = {command}\n"));
        if let Some(depfile) = depfile {
            self.out.push_str(&format!("  depfile = {depfile}\n"));
        }
    }

    fn build<'a, I>(&mut self, out: &str, rule: &str, inputs: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let joined = inputs.into_iter().join(" ");
        if joined.is_empty() {
            self.out.push_str(&format!("build {out}: {rule}\n"));
        } else {
            self.out.push_str(&format!("build {out}: {rule} {joined}\n"));
        }
    }

    fn into_string(self) -> String {
        self.out
    }
}

/// Compile the manifest store and environment into a Ninja build file.
///
/// The environment is cloned before the store's include flags are appended
/// to its C and C++ flag lists, so the caller's copy is never mutated. Nodes
/// are emitted in store-iteration order, one compile node per object, one
/// archive or link node per project, and a final `phony` node named `all`
/// depending on every project output.
///
/// # Errors
///
/// Returns [`GraphError`] for any malformed descriptor; nothing is emitted
/// in that case.
pub fn generate(store: &ManifestStore, env: &Environment) -> Result<String, GraphError> {
    validate(store)?;

    let mut env = env.clone();
    let includes = manifest::include_flags(store);
    env.cflags.extend(includes.iter().cloned());
    env.cxxflags.extend(includes);

    let mut w = NinjaWriter::new();
    w.comment("Generated by kiln; do not edit.");
    w.newline();

    w.comment("Environment:");
    for (key, value) in env.render() {
        w.variable(&key, &value);
    }
    w.newline();

    w.comment("Rules:");
    w.rule(
        "cc",
        "$cc -c -o $out $in -MD -MF $out.d $cflags",
        Some("$out.d"),
    );
    w.rule(
        "cxx",
        "$cxx -c -o $out $in -MD -MF $out.d $cxxflags",
        Some("$out.d"),
    );
    w.rule("ld", "$ld -o $out $in $ldflags", None);
    w.rule("ar", "$ar crs $out $in", None);
    w.rule("as", "$as -o $out $in $asflags", None);
    w.newline();

    w.comment("Build:");
    let mut all: Vec<&str> = Vec::new();
    for project in store.values() {
        w.comment(&format!("Project: {}", project.id));
        for mapping in &project.objs {
            let Some(rule) = rule_for_source(&mapping.src) else {
                return Err(GraphError::UnknownSourceKind {
                    project: project.id.clone(),
                    path: mapping.src.clone(),
                });
            };
            w.build(mapping.obj.as_str(), rule, [mapping.src.as_str()]);
        }
        w.newline();

        let mut inputs: Vec<&str> = project.objs.iter().map(|m| m.obj.as_str()).collect();
        let rule = match project.kind {
            ProjectKind::Lib => "ar",
            ProjectKind::Artifact => {
                inputs.extend(project.libs.iter().map(|lib| lib.as_str()));
                "ld"
            }
        };
        w.build(project.out.as_str(), rule, inputs);
        all.push(project.out.as_str());
        w.newline();
    }

    w.comment("Phony:");
    w.build("all", "phony", all);

    Ok(w.into_string())
}
