//! Component resolution: which components a party runs, and how.

use fateflow_core::{ComponentParameters, PartyId, Provider};
use serde_json::{json, Value};
use tracing::debug;

use crate::artifact::JobArtifacts;
use crate::error::{ArtifactError, ResolveError};
use crate::graph::JobGraph;

/// Decides per component whether a party participates and with what
/// parameters.
pub trait ComponentResolver {
    /// Parsed form of a job's documents.
    type Graph;

    /// Build the graph from the job's four documents together.
    fn parse_graph(&self, artifacts: JobArtifacts) -> Result<Self::Graph, ArtifactError>;

    /// Resolve `component_name` for `party_id` playing `role`.
    ///
    /// `Ok(None)` means the party does not take part in this component.
    fn resolve(
        &self,
        graph: &Self::Graph,
        component_name: &str,
        role: &str,
        party_id: PartyId,
        provider: &Provider,
    ) -> Result<Option<ComponentParameters>, ResolveError>;
}

/// Resolver driven by the dsl's component declarations and the runtime
/// conf's role and parameter sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct DslResolver;

impl DslResolver {
    pub fn new() -> Self {
        Self
    }
}

impl ComponentResolver for DslResolver {
    type Graph = JobGraph;

    fn parse_graph(&self, artifacts: JobArtifacts) -> Result<JobGraph, ArtifactError> {
        JobGraph::from_artifacts(artifacts)
    }

    fn resolve(
        &self,
        graph: &JobGraph,
        component_name: &str,
        role: &str,
        party_id: PartyId,
        provider: &Provider,
    ) -> Result<Option<ComponentParameters>, ResolveError> {
        let spec = graph
            .component(component_name)
            .ok_or_else(|| ResolveError::UnknownComponent(component_name.to_string()))?;

        let Some(party_index) = graph.party_index(role, party_id) else {
            debug!(
                component = %component_name,
                role = %role,
                party_id = %party_id,
                "Party not in job roles"
            );
            return Ok(None);
        };

        if let Some(roles) = &spec.roles {
            if !roles.iter().any(|r| r == role) {
                debug!(component = %component_name, role = %role, "Component does not run on role");
                return Ok(None);
            }
        }

        let mut params = match graph.component_parameters(component_name, role, party_index) {
            Value::Object(params) => params,
            other => {
                return Err(ResolveError::InvalidParameters {
                    component: component_name.to_string(),
                    reason: format!("expected an object, found {}", other),
                })
            }
        };
        params.remove("module");
        params.insert(
            "local".to_string(),
            json!({"role": role, "party_id": party_id}),
        );
        params.insert(
            "provider".to_string(),
            json!({"name": provider.name, "version": provider.version}),
        );

        Ok(Some(ComponentParameters::new(spec.module.clone(), params)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fateflow_core::{ModulePath, ProviderName};

    fn provider() -> Provider {
        Provider::new(
            ProviderName::FateAlgorithm,
            "1.7.0",
            ModulePath::Location("/data/projects/fate/python/federatedml".to_string()),
        )
    }

    fn graph() -> JobGraph {
        DslResolver
            .parse_graph(JobArtifacts {
                dsl: json!({
                    "components": {
                        "hetero_lr_0": {"module": "HeteroLR"},
                        "evaluation_0": {"module": "Evaluation", "roles": ["guest", "arbiter"]},
                        "broken_0": {"module": "Broken"}
                    }
                }),
                runtime_conf: json!({
                    "role": {"guest": [9999], "host": [100]},
                    "component_parameters": {
                        "common": {
                            "hetero_lr_0": {"max_iter": 10, "module": "Ignored"},
                            "broken_0": "not an object"
                        }
                    }
                }),
                train_runtime_conf: json!({}),
                pipeline_dsl: json!({}),
            })
            .unwrap()
    }

    #[test]
    fn test_resolve_participating_component() {
        let params = DslResolver
            .resolve(&graph(), "hetero_lr_0", "host", PartyId::new(100), &provider())
            .unwrap()
            .unwrap();

        assert_eq!(params.module, "HeteroLR");
        assert_eq!(params.get("max_iter"), Some(&json!(10)));
        assert_eq!(params.get("local"), Some(&json!({"role": "host", "party_id": 100})));
        assert_eq!(
            params.get("provider"),
            Some(&json!({"name": "fate_algorithm", "version": "1.7.0"}))
        );
        assert!(params.get("module").is_none());
    }

    #[test]
    fn test_resolve_not_applicable() {
        let graph = graph();
        // Role restriction.
        let params = DslResolver
            .resolve(&graph, "evaluation_0", "host", PartyId::new(100), &provider())
            .unwrap();
        assert!(params.is_none());

        // Party not playing the role.
        let params = DslResolver
            .resolve(&graph, "hetero_lr_0", "host", PartyId::new(9999), &provider())
            .unwrap();
        assert!(params.is_none());
    }

    #[test]
    fn test_resolve_faults() {
        let graph = graph();
        let err = DslResolver
            .resolve(&graph, "missing_0", "host", PartyId::new(100), &provider())
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownComponent(_)));

        let err = DslResolver
            .resolve(&graph, "broken_0", "guest", PartyId::new(9999), &provider())
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidParameters { .. }));
    }
}
