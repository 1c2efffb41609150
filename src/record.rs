//! Persisted artifact manifest record.
//!
//! After graph compilation the driver writes a combined record of the
//! resolved manifest store and toolchain environment to
//! `<dir>/manifest.json` for downstream inspection and tooling. Rendering is
//! deterministic: key order follows declaration and discovery order, so an
//! unchanged store and environment re-render byte-identically and diff
//! cleanly between builds.

use crate::environment::Environment;
use crate::manifest::ManifestStore;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use serde::Serialize;
use std::fs;
use std::io;
use thiserror::Error;

/// File name of the persisted record inside the output directory.
pub const RECORD_FILE: &str = "manifest.json";

/// Kind tag carried by every record.
const RECORD_KIND: &str = "artifacts";

#[derive(Serialize)]
struct Record<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    components: &'a ManifestStore,
    toolchain: &'a Environment,
}

/// Errors raised while persisting the artifact record.
#[derive(Debug, Error, Diagnostic)]
pub enum RecordError {
    /// The record could not be serialized.
    #[error("artifact record for {env_key} could not be serialized")]
    #[diagnostic(code(kiln::record::render))]
    Render {
        /// Key of the environment being recorded.
        env_key: String,
        /// Underlying serialization failure.
        #[source]
        source: serde_json::Error,
    },

    /// The record could not be written to disk.
    #[error("artifact record could not be written to {path}")]
    #[diagnostic(code(kiln::record::write))]
    Write {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// Render the combined store/environment record as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`RecordError::Render`] if serialization fails.
pub fn render(store: &ManifestStore, env: &Environment) -> Result<String, RecordError> {
    let record = Record {
        id: &env.key,
        kind: RECORD_KIND,
        components: store,
        toolchain: env,
    };
    let mut text = serde_json::to_string_pretty(&record).map_err(|source| RecordError::Render {
        env_key: env.key.clone(),
        source,
    })?;
    text.push('\n');
    Ok(text)
}

/// Write the record to `<root>/<dir>/manifest.json`, fully overwriting it.
///
/// # Errors
///
/// Returns [`RecordError`] if rendering or the write fails.
pub fn write(
    store: &ManifestStore,
    env: &Environment,
    root: &Utf8Path,
) -> Result<Utf8PathBuf, RecordError> {
    let path = root.join(&env.dir).join(RECORD_FILE);
    let text = render(store, env)?;
    fs::write(&path, text).map_err(|source| RecordError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
