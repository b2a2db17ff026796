//! Task creation.
//!
//! The initializer hands every runnable component to a `TaskController`,
//! which owns the descriptor from then on.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fateflow_core::{PartyId, TaskDescriptor};
use tracing::info;

use crate::artifact::temp_path;
use crate::error::{ArtifactError, SubmitError};

/// Durable creation of tasks.
#[async_trait]
pub trait TaskController: Send + Sync {
    /// Create `task` for `party_id` playing `role`.
    ///
    /// Returns once the task is durably recorded.
    async fn create_task(
        &self,
        role: &str,
        party_id: PartyId,
        run_on_this_party: bool,
        task: TaskDescriptor,
    ) -> Result<(), SubmitError>;
}

/// Controller that records each task as a JSON file under a spool directory:
/// `<root>/<job_id>/<role>/<party_id>/<component_name>.json`.
#[derive(Debug, Clone)]
pub struct SpoolTaskController {
    root: PathBuf,
}

impl SpoolTaskController {
    /// Create a controller spooling under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where the descriptor of `task` is stored.
    ///
    /// Every part must be a single plain path segment, so the file always
    /// lands under the spool root.
    pub fn task_path(&self, task: &TaskDescriptor) -> Result<PathBuf, SubmitError> {
        let job_id = path_segment("job id", task.job_id.as_str())?;
        let role = path_segment("role", &task.role)?;
        let component = path_segment("component name", &task.component_name)?;

        Ok(self
            .root
            .join(job_id)
            .join(role)
            .join(task.party_id.to_string())
            .join(format!("{}.json", component)))
    }

    async fn write(&self, path: &Path, task: &TaskDescriptor) -> Result<(), ArtifactError> {
        let write_err = |source| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };

        let content = serde_json::to_vec_pretty(task).map_err(|source| ArtifactError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &content).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskController for SpoolTaskController {
    async fn create_task(
        &self,
        role: &str,
        party_id: PartyId,
        run_on_this_party: bool,
        task: TaskDescriptor,
    ) -> Result<(), SubmitError> {
        if task.role != role || task.party_id != party_id {
            return Err(SubmitError::Rejected(format!(
                "task {} belongs to {} {}, not {} {}",
                task.task_id, task.role, task.party_id, role, party_id
            )));
        }
        if task.run_on_this_party != run_on_this_party {
            return Err(SubmitError::Rejected(format!(
                "task {} disagrees on run_on_this_party",
                task.task_id
            )));
        }

        let path = self.task_path(&task)?;
        self.write(&path, &task).await?;

        info!(
            task_id = %task.task_id,
            component = %task.component_name,
            module = %task.component_module,
            path = %path.display(),
            "Created task"
        );
        Ok(())
    }
}

fn path_segment<'a>(kind: &str, value: &'a str) -> Result<&'a str, SubmitError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(SubmitError::Rejected(format!(
            "{} '{}' is not a valid path segment",
            kind, value
        )));
    }
    Ok(value)
}
