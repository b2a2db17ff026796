//! Task descriptor types.

use crate::{JobId, PartyId, Provider, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys a descriptor sets itself; common task info never overrides them.
const RESERVED_TASK_KEYS: &[&str] = &[
    "task_id",
    "task_version",
    "status",
    "job_id",
    "role",
    "party_id",
    "component_name",
    "component_module",
    "provider_info",
    "component_parameters",
    "run_on_this_party",
    "created_at",
];

/// Status of a task as recorded by the task controller.
///
/// The initializer only ever creates tasks; later states are owned by the
/// scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created, waiting to be scheduled.
    #[default]
    Waiting,
}

/// Task metadata shared by every component of a job on this party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonTaskInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,

    /// Whether this party runs the job at all.
    pub run_on_this_party: bool,

    /// Any other fields, copied verbatim into each task.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommonTaskInfo {
    /// Create common task info with no extra fields.
    pub fn new(run_on_this_party: bool) -> Self {
        Self {
            job_id: None,
            role: None,
            party_id: None,
            run_on_this_party,
            extra: Map::new(),
        }
    }

    /// Builder method to add an extra field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Resolved execution parameters of one component for one party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentParameters {
    /// Implementation entry point, e.g. "HeteroLR".
    pub module: String,

    /// Everything else, opaque to the initializer.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ComponentParameters {
    /// Create parameters for `module`.
    pub fn new(module: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            module: module.into(),
            params,
        }
    }

    /// Look up one parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// A locally-runnable instance of a component, handed to the task controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: TaskId,
    pub task_version: u32,
    pub status: TaskStatus,
    pub job_id: JobId,
    pub role: String,
    pub party_id: PartyId,
    pub component_name: String,
    pub component_module: String,
    pub provider_info: Provider,
    pub component_parameters: ComponentParameters,
    pub run_on_this_party: bool,
    pub created_at: DateTime<Utc>,

    /// Remaining common task info fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDescriptor {
    /// Assemble the descriptor of `component_name` for this party.
    pub fn new(
        job_id: JobId,
        role: impl Into<String>,
        party_id: PartyId,
        component_name: impl Into<String>,
        provider: Provider,
        parameters: ComponentParameters,
        common: &CommonTaskInfo,
    ) -> Self {
        let component_name = component_name.into();
        let extra = common
            .extra
            .iter()
            .filter(|(key, _)| !RESERVED_TASK_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            task_id: TaskId::for_component(&job_id, &component_name),
            task_version: 0,
            status: TaskStatus::Waiting,
            job_id,
            role: role.into(),
            party_id,
            component_module: parameters.module.clone(),
            component_name,
            provider_info: provider,
            component_parameters: parameters,
            run_on_this_party: common.run_on_this_party,
            created_at: Utc::now(),
            extra,
        }
    }
}
