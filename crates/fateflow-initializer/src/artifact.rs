//! JSON artifact I/O.
//!
//! Every artifact this process produces is written through a sibling
//! temporary file and renamed into place, so readers never observe a
//! partially written document.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ArtifactError;

/// Read and deserialize a JSON document.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = fs::read_to_string(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn dump_json_atomic<T: Serialize>(value: &T, path: &Path) -> Result<(), ArtifactError> {
    let content = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let write_err = |source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = temp_path(path);
    if let Err(e) = fs::write(&tmp, &content).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(e));
    }

    debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
    Ok(())
}

/// Delete a leftover artifact from an earlier attempt.
///
/// Returns whether a file was removed.
pub fn remove_stale(path: &Path) -> Result<bool, ArtifactError> {
    match fs::remove_file(path) {
        Ok(()) => {
            warn!(path = %path.display(), "Removed stale result from a previous attempt");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Temporary sibling of `path` used for atomic replacement.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}

/// The four static documents a job graph is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct JobArtifacts {
    /// The job dsl: components and their wiring.
    pub dsl: Value,

    /// This job's runtime settings.
    pub runtime_conf: Value,

    /// Runtime settings of the training job a predict job continues from.
    pub train_runtime_conf: Value,

    /// Pipeline dsl kept for display and audit.
    pub pipeline_dsl: Value,
}

impl JobArtifacts {
    /// Load all four documents; any missing or malformed file is an error.
    pub fn load(
        dsl: &Path,
        runtime_conf: &Path,
        train_runtime_conf: &Path,
        pipeline_dsl: &Path,
    ) -> Result<Self, ArtifactError> {
        Ok(Self {
            dsl: load_json(dsl)?,
            runtime_conf: load_json(runtime_conf)?,
            train_runtime_conf: load_json(train_runtime_conf)?,
            pipeline_dsl: load_json(pipeline_dsl)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_json::<Value>(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ArtifactError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsl.json");
        fs::write(&path, "{\"components\": ").unwrap();

        let err = load_json::<Value>(&path).unwrap_err();
        assert!(matches!(err, ArtifactError::Parse { .. }));
        assert!(err.to_string().contains("dsl.json"));
    }

    #[test]
    fn test_dump_creates_parents_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job-7").join("result.json");

        dump_json_atomic(&json!({"reader_0": {"need_run": true}}), &path).unwrap();

        let loaded: Value = load_json(&path).unwrap();
        assert_eq!(loaded["reader_0"]["need_run"], json!(true));
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_remove_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        assert!(!remove_stale(&path).unwrap());

        fs::write(&path, "{}").unwrap();
        assert!(remove_stale(&path).unwrap());
        assert!(!path.exists());
    }
}
