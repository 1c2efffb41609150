//! Toolchain environment model and loader.
//!
//! An [`Environment`] bundles the compiler executables, ordered flag lists,
//! and output paths for one named toolchain profile. Profiles live under
//! `envs/<name>.json` in the project root. The struct owns every field, so
//! `Clone` yields a fully independent deep copy; graph compilation always
//! clones before appending include flags.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use thiserror::Error;

/// Directory under the project root holding environment definitions.
pub const ENV_DIR: &str = "envs";

/// A named toolchain configuration bundle.
///
/// Flag lists are ordered and never deduplicated; later entries are appended
/// after earlier ones when the final flag strings are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    /// Unique key identifying this environment.
    pub key: String,
    /// C compiler executable.
    pub cc: Utf8PathBuf,
    /// C++ compiler executable.
    pub cxx: Utf8PathBuf,
    /// Linker executable.
    pub ld: Utf8PathBuf,
    /// Archiver executable.
    pub ar: Utf8PathBuf,
    /// Assembler executable.
    #[serde(rename = "as")]
    pub asm: Utf8PathBuf,
    /// C compile flags, in application order.
    pub cflags: Vec<String>,
    /// C++ compile flags, in application order.
    pub cxxflags: Vec<String>,
    /// Link flags, in application order.
    pub ldflags: Vec<String>,
    /// Assembler flags, in application order.
    pub asflags: Vec<String>,
    /// Output directory for generated artefacts.
    pub dir: Utf8PathBuf,
    /// Path of the generated Ninja build file.
    pub ninjafile: Utf8PathBuf,
}

impl Environment {
    /// Render every setting as a textual variable binding.
    ///
    /// List-valued settings are space-joined with their order preserved
    /// exactly; scalar settings pass through untouched. The returned map
    /// iterates in declaration order.
    #[must_use]
    pub fn render(&self) -> IndexMap<String, String> {
        let mut vars = IndexMap::new();
        vars.insert("key".to_owned(), self.key.clone());
        vars.insert("cc".to_owned(), self.cc.to_string());
        vars.insert("cxx".to_owned(), self.cxx.to_string());
        vars.insert("ld".to_owned(), self.ld.to_string());
        vars.insert("ar".to_owned(), self.ar.to_string());
        vars.insert("as".to_owned(), self.asm.to_string());
        vars.insert("cflags".to_owned(), self.cflags.iter().join(" "));
        vars.insert("cxxflags".to_owned(), self.cxxflags.iter().join(" "));
        vars.insert("ldflags".to_owned(), self.ldflags.iter().join(" "));
        vars.insert("asflags".to_owned(), self.asflags.iter().join(" "));
        vars.insert("dir".to_owned(), self.dir.to_string());
        vars.insert("ninjafile".to_owned(), self.ninjafile.to_string());
        vars
    }
}

/// Errors raised while resolving a named environment.
#[derive(Debug, Error, Diagnostic)]
pub enum EnvironmentError {
    /// The definition file could not be read.
    #[error("environment {name} could not be read from {path}")]
    #[diagnostic(code(kiln::environment::read))]
    Read {
        /// Requested environment name.
        name: String,
        /// Path that was attempted.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The definition file is not a valid environment record.
    #[error("environment {name} at {path} is malformed")]
    #[diagnostic(code(kiln::environment::parse))]
    Parse {
        /// Requested environment name.
        name: String,
        /// Path of the malformed definition.
        path: Utf8PathBuf,
        /// Underlying deserialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve a named environment from `<root>/envs/<name>.json`.
///
/// # Errors
///
/// Returns [`EnvironmentError`] when the definition file is missing,
/// unreadable, or malformed.
pub fn load(root: &Utf8Path, name: &str) -> Result<Environment, EnvironmentError> {
    let path = root.join(ENV_DIR).join(format!("{name}.json"));
    let text = fs::read_to_string(&path).map_err(|source| EnvironmentError::Read {
        name: name.to_owned(),
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EnvironmentError::Parse {
        name: name.to_owned(),
        path,
        source,
    })
}
