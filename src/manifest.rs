//! Project manifests, store discovery, and include resolution.
//!
//! A manifest describes one buildable unit: its object/source pairs, extra
//! link inputs, output path, and include directories. Manifests are stored on
//! disk as `project.json` files anywhere under the project root and collected
//! into an insertion-ordered [`ManifestStore`] whose order is the discovery
//! order. The walk is sorted so discovery order is stable across runs.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use walkdir::WalkDir;

/// File name of an on-disk project manifest.
pub const MANIFEST_FILE: &str = "project.json";

/// The two kinds of buildable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// Archived into a static library with the `ar` rule.
    Lib,
    /// Linked into a final artefact with the `ld` rule.
    Artifact,
}

/// One object file and the source it is compiled from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMapping {
    /// Object output path, unique across the whole store.
    pub obj: Utf8PathBuf,
    /// Source file the object is built from.
    pub src: Utf8PathBuf,
}

/// Declarative description of one buildable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    /// Identifier, unique across the manifest store.
    pub id: String,
    /// Whether the unit is archived or linked.
    pub kind: ProjectKind,
    /// Object/source pairs in authoring order; authoring order is emission
    /// order.
    #[serde(default)]
    pub objs: Vec<ObjectMapping>,
    /// Extra link inputs, used only when `kind` is [`ProjectKind::Artifact`].
    #[serde(default)]
    pub libs: Vec<Utf8PathBuf>,
    /// Final output path.
    pub out: Utf8PathBuf,
    /// Include directories contributed to every compile in the store.
    #[serde(default)]
    pub includes: Vec<Utf8PathBuf>,
}

/// Mapping of project identifier to descriptor, in discovery order.
pub type ManifestStore = IndexMap<String, Project>;

/// Errors raised while discovering and parsing project manifests.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// The directory walk failed below the project root.
    #[error("manifest discovery failed under {root}")]
    #[diagnostic(code(kiln::manifest::walk))]
    Walk {
        /// Root the walk started from.
        root: Utf8PathBuf,
        /// Underlying walk failure.
        #[source]
        source: walkdir::Error,
    },

    /// A discovered manifest path is not valid UTF-8.
    #[error("manifest path {} is not valid UTF-8", path.display())]
    #[diagnostic(code(kiln::manifest::non_utf8_path))]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// A manifest file could not be read.
    #[error("manifest {path} could not be read")]
    #[diagnostic(code(kiln::manifest::read))]
    Read {
        /// Path of the unreadable manifest.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A manifest file is not a valid project record.
    #[error("manifest {path} is malformed")]
    #[diagnostic(code(kiln::manifest::parse))]
    Parse {
        /// Path of the malformed manifest.
        path: Utf8PathBuf,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// Two manifests declare the same project identifier.
    #[error("project {id} is declared more than once; second declaration at {path}")]
    #[diagnostic(code(kiln::manifest::duplicate_project))]
    DuplicateProject {
        /// The identifier declared twice.
        id: String,
        /// Path of the second declaration.
        path: Utf8PathBuf,
    },
}

/// Discover and parse every `project.json` below `root`.
///
/// The walk visits entries in sorted path order, so the resulting store
/// iterates deterministically. Duplicate project identifiers are rejected.
///
/// # Errors
///
/// Returns [`ManifestError`] when the walk fails, a manifest is unreadable or
/// malformed, or two manifests share an identifier.
pub fn load_all(root: &Utf8Path) -> Result<ManifestStore, ManifestError> {
    let mut store = ManifestStore::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| ManifestError::Walk {
            root: root.to_owned(),
            source,
        })?;
        if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
            continue;
        }
        let path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|path| ManifestError::NonUtf8Path { path })?;
        let text = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let project: Project = serde_json::from_str(&text).map_err(|source| {
            ManifestError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        if store.contains_key(&project.id) {
            return Err(ManifestError::DuplicateProject {
                id: project.id,
                path,
            });
        }
        store.insert(project.id.clone(), project);
    }
    Ok(store)
}

/// Collect the transitive include flags declared across the whole store.
///
/// For every project in store order, contributes one `-I<dir>` token per
/// declared include directory in declared order. The result is a flat,
/// order-preserving concatenation with no deduplication: repeated
/// declarations yield repeated tokens, since flag precedence is
/// order-dependent for the downstream toolchain.
#[must_use]
pub fn include_flags(store: &ManifestStore) -> Vec<String> {
    store
        .values()
        .flat_map(|project| project.includes.iter().map(|dir| format!("-I{dir}")))
        .collect()
}
