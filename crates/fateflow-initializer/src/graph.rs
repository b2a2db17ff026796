//! Job graph built from a job's dsl and runtime settings.

use std::collections::BTreeMap;

use fateflow_core::PartyId;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::artifact::JobArtifacts;
use crate::error::ArtifactError;

/// Kind of job, as declared in the runtime conf's job parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobType {
    #[default]
    Train,
    /// Inference job reusing a training job's settings.
    Predict,
}

/// One component declared in the job dsl.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentSpec {
    /// Implementation entry point.
    pub module: String,

    /// Roles the component runs on; all roles when absent.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// A job's components, participants and parameter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct JobGraph {
    job_type: JobType,
    components: BTreeMap<String, ComponentSpec>,
    roles: BTreeMap<String, Vec<PartyId>>,
    /// `component_parameters` sections, lowest precedence first.
    parameter_layers: Vec<Value>,
    pipeline_components: Vec<String>,
}

impl JobGraph {
    /// Build the graph from all four job documents.
    ///
    /// Predict jobs inherit participants and parameters from the training
    /// job's runtime conf; their own runtime conf takes precedence.
    pub fn from_artifacts(artifacts: JobArtifacts) -> Result<Self, ArtifactError> {
        let JobArtifacts {
            dsl,
            runtime_conf,
            train_runtime_conf,
            pipeline_dsl,
        } = artifacts;

        let components = parse_components(&dsl)?;
        let job_type = parse_job_type(&runtime_conf);

        let mut roles = parse_roles(&runtime_conf, "runtime conf")?;
        let mut parameter_layers = Vec::new();
        if job_type == JobType::Predict {
            for (role, parties) in parse_roles(&train_runtime_conf, "train runtime conf")? {
                roles.entry(role).or_insert(parties);
            }
            parameter_layers.extend(parameter_section(&train_runtime_conf, "train runtime conf")?);
        }
        parameter_layers.extend(parameter_section(&runtime_conf, "runtime conf")?);

        let pipeline_components = pipeline_dsl
            .get("components")
            .and_then(Value::as_object)
            .map(|components| components.keys().cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            job_type,
            components,
            roles,
            parameter_layers,
            pipeline_components,
        })
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.get(name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Parties playing `role`, in declaration order.
    pub fn parties(&self, role: &str) -> Option<&[PartyId]> {
        self.roles.get(role).map(Vec::as_slice)
    }

    /// Position of `party_id` among the parties playing `role`.
    pub fn party_index(&self, role: &str, party_id: PartyId) -> Option<usize> {
        self.parties(role)?.iter().position(|p| *p == party_id)
    }

    /// Components of the pipeline dsl.
    pub fn pipeline_components(&self) -> &[String] {
        &self.pipeline_components
    }

    /// Merge the parameters of `component` for the party at `party_index`.
    ///
    /// Within each layer the order is: `common`, `role.<role>.all`, then
    /// every `role.<role>.<index>` section whose index list covers the party.
    pub fn component_parameters(&self, component: &str, role: &str, party_index: usize) -> Value {
        let mut merged = Value::Object(Map::new());

        for layer in &self.parameter_layers {
            if let Some(common) = layer.get("common").and_then(|c| c.get(component)) {
                deep_merge(&mut merged, common);
            }

            let Some(role_sections) = layer
                .get("role")
                .and_then(|r| r.get(role))
                .and_then(Value::as_object)
            else {
                continue;
            };

            if let Some(all) = role_sections.get("all").and_then(|s| s.get(component)) {
                deep_merge(&mut merged, all);
            }
            for (indexes, section) in role_sections {
                if indexes == "all" || !index_matches(indexes, party_index) {
                    continue;
                }
                if let Some(params) = section.get(component) {
                    deep_merge(&mut merged, params);
                }
            }
        }

        merged
    }
}

fn parse_components(dsl: &Value) -> Result<BTreeMap<String, ComponentSpec>, ArtifactError> {
    let components = dsl
        .get("components")
        .and_then(Value::as_object)
        .ok_or_else(|| ArtifactError::invalid("job dsl", "missing components section"))?;

    components
        .iter()
        .map(|(name, spec)| {
            let spec = ComponentSpec::deserialize(spec).map_err(|e| {
                ArtifactError::invalid("job dsl", format!("component {}: {}", name, e))
            })?;
            Ok((name.clone(), spec))
        })
        .collect()
}

fn parse_job_type(runtime_conf: &Value) -> JobType {
    let job_type = runtime_conf
        .pointer("/job_parameters/common/job_type")
        .or_else(|| runtime_conf.pointer("/job_parameters/job_type"))
        .and_then(Value::as_str);

    match job_type {
        Some(t) if t.eq_ignore_ascii_case("predict") => JobType::Predict,
        _ => JobType::Train,
    }
}

fn parse_roles(
    conf: &Value,
    artifact: &str,
) -> Result<BTreeMap<String, Vec<PartyId>>, ArtifactError> {
    match conf.get("role") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(roles) => BTreeMap::<String, Vec<PartyId>>::deserialize(roles)
            .map_err(|e| ArtifactError::invalid(artifact, format!("role section: {}", e))),
    }
}

fn parameter_section(conf: &Value, artifact: &str) -> Result<Option<Value>, ArtifactError> {
    match conf.get("component_parameters") {
        None | Some(Value::Null) => Ok(None),
        Some(section @ Value::Object(_)) => Ok(Some(section.clone())),
        Some(_) => Err(ArtifactError::invalid(artifact, "component_parameters must be an object")),
    }
}

/// Whether an index key like `"0"`, `"0|2"` or `"1-3"` covers `index`.
fn index_matches(indexes: &str, index: usize) -> bool {
    indexes.split('|').any(|part| {
        let part = part.trim();
        match part.split_once('-') {
            Some((start, end)) => {
                match (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
                    (Ok(start), Ok(end)) => (start..=end).contains(&index),
                    _ => false,
                }
            }
            None => part.parse::<usize>() == Ok(index),
        }
    })
}

/// Recursively merge `overlay` into `target`; non-objects replace.
fn deep_merge(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                deep_merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, overlay) => *target = overlay.clone(),
    }
}
