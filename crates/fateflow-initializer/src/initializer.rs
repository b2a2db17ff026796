//! The task initialization pass.
//!
//! For one (job, role, party) the initializer walks the job's declared
//! components in order, asks the resolver whether this party runs each one,
//! creates a task for every component it does run, and finally writes the
//! per-component result the scheduler waits for. Any fault aborts the whole
//! pass before the result is written.

use std::collections::HashSet;

use chrono::Utc;
use fateflow_core::{CommonTaskInfo, JobId, ModulePath, PartyId, Provider, TaskDescriptor};
use serde::Deserialize;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::artifact::{dump_json_atomic, load_json, remove_stale, JobArtifacts};
use crate::catalog::ProviderCatalog;
use crate::cli::LaunchArgs;
use crate::config::{runtime_versions, ProcessConfig, RuntimeContext};
use crate::controller::TaskController;
use crate::error::{ArtifactError, ConfigError, InitError};
use crate::resolver::ComponentResolver;
use crate::result::InitializationResult;

/// Provider fields as written in the initialization config.
#[derive(Debug, Clone, Deserialize)]
struct ProviderFields {
    name: String,
    version: String,
    path: ModulePath,
}

/// The initialization config handed to this process by the scheduler.
#[derive(Debug, Clone, Deserialize)]
pub struct InitConfig {
    provider: ProviderFields,

    /// Metadata copied into every created task.
    pub common_task_info: CommonTaskInfo,

    /// Components to consider, in order.
    pub components: Vec<String>,
}

impl InitConfig {
    /// Load and validate an initialization config.
    pub fn load(path: &std::path::Path) -> Result<Self, InitError> {
        let config: Self = load_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs listing a component twice.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let mut seen = HashSet::new();
        for component in &self.components {
            if !seen.insert(component.as_str()) {
                return Err(ArtifactError::invalid(
                    "initialization config",
                    format!("component {} is listed more than once", component),
                ));
            }
        }
        Ok(())
    }

    /// The provider the components run under.
    pub fn provider(&self) -> Result<Provider, InitError> {
        let name = self
            .provider
            .name
            .parse()
            .map_err(|_| InitError::UnsupportedProvider(self.provider.name.clone()))?;
        Ok(Provider::new(
            name,
            self.provider.version.clone(),
            self.provider.path.clone(),
        ))
    }
}

/// Runs initialization passes with a resolver and a task controller.
pub struct TaskInitializer<R, C> {
    resolver: R,
    controller: C,
}

impl<R, C> TaskInitializer<R, C>
where
    R: ComponentResolver,
    C: TaskController,
{
    /// Create a new TaskInitializer.
    pub fn new(resolver: R, controller: C) -> Self {
        Self {
            resolver,
            controller,
        }
    }

    /// Run one full pass for the job, role and party in `args`.
    ///
    /// On success the result artifact exists at `args.result`; on failure it
    /// does not, and the error has been logged together with `args`.
    pub async fn run(&self, args: &LaunchArgs) -> Result<InitializationResult, InitError> {
        let span = info_span!(
            "task_initializer",
            job_id = %args.job_id,
            role = %args.role,
            party_id = args.party_id
        );

        async {
            info!(args = ?args, "Enter task initializer process");
            let result = self.run_pass(args).await;
            if let Err(e) = &result {
                error!(error = %e, args = ?args, "Task initializer failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_pass(&self, args: &LaunchArgs) -> Result<InitializationResult, InitError> {
        let started_at = Utc::now();
        let job_id = JobId::new(args.job_id.as_str());
        let party_id = PartyId::new(args.party_id);

        remove_stale(&args.result).map_err(InitError::ResultWrite)?;

        let mut config = ProcessConfig::new();
        if let Some(job_server) = &args.job_server {
            config.set_coordinator(job_server)?;
        }
        if let Some(run_ip) = &args.run_ip {
            debug!(run_ip = %run_ip, "Running on host");
        }

        let mut catalog = ProviderCatalog::new();
        catalog.load_with_builtin(&args.provider_registry)?;
        config.set_catalog(catalog);
        config.record_environment(runtime_versions());

        let artifacts = JobArtifacts::load(
            &args.dsl,
            &args.runtime_conf,
            &args.train_runtime_conf,
            &args.pipeline_dsl,
        )?;
        let graph = self.resolver.parse_graph(artifacts)?;

        let init_config = InitConfig::load(&args.config)?;
        let provider = init_config.provider()?;
        if !config.catalog().is_registered(&provider) {
            warn!(provider = %provider, "Provider is not installed in the component registry");
        }
        config.set_active_provider(provider);
        let ctx = config.finalize();

        info!(
            process_role = %ctx.role(),
            coordinator = ?ctx.coordinator(),
            versions = ?ctx.get_all_environment(),
            components = init_config.components.len(),
            "Initializing job components"
        );

        let result = self
            .initialize(&ctx, &graph, &job_id, &args.role, party_id, &init_config)
            .await?;

        dump_json_atomic(&result, &args.result).map_err(InitError::ResultWrite)?;

        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
        info!(
            need_run = ?result.components_to_run(),
            elapsed_ms,
            "job {} components initialized on {} {} in {} ms",
            job_id,
            args.role,
            party_id,
            elapsed_ms
        );
        Ok(result)
    }

    /// Resolve every declared component and create tasks for those this
    /// party runs. Stops at the first fault.
    pub async fn initialize(
        &self,
        ctx: &RuntimeContext,
        graph: &R::Graph,
        job_id: &JobId,
        role: &str,
        party_id: PartyId,
        init_config: &InitConfig,
    ) -> Result<InitializationResult, InitError> {
        let provider = ctx.active_provider().ok_or(ConfigError::NoActiveProvider)?;
        let common = &init_config.common_task_info;
        if common.job_id.as_ref().is_some_and(|id| id != job_id) {
            warn!(
                common_job_id = ?common.job_id,
                "Common task info names a different job; using the launch job id"
            );
        }

        let mut result = InitializationResult::new();
        for component in &init_config.components {
            let parameters = self
                .resolver
                .resolve(graph, component, role, party_id, provider)
                .map_err(|source| InitError::Resolution {
                    component: component.clone(),
                    source,
                })?;

            let Some(parameters) = parameters else {
                debug!(component = %component, "Party does not need to run component");
                result.record(component.as_str(), false);
                continue;
            };

            let task = TaskDescriptor::new(
                job_id.clone(),
                role,
                party_id,
                component.as_str(),
                provider.clone(),
                parameters,
                common,
            );
            self.controller
                .create_task(role, party_id, common.run_on_this_party, task)
                .await
                .map_err(|source| InitError::Submission {
                    component: component.clone(),
                    source,
                })?;
            result.record(component.as_str(), true);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use fateflow_core::ComponentParameters;
    use serde_json::{json, Map, Value};

    use crate::controller::SpoolTaskController;
    use crate::error::{ResolveError, SubmitError};
    use crate::resolver::DslResolver;

    /// Resolver answering from fixed component lists.
    #[derive(Default)]
    struct ScriptedResolver {
        applicable: Vec<&'static str>,
        fail_on: Option<&'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl ComponentResolver for ScriptedResolver {
        type Graph = ();

        fn parse_graph(&self, _artifacts: JobArtifacts) -> Result<(), ArtifactError> {
            Ok(())
        }

        fn resolve(
            &self,
            _graph: &(),
            component_name: &str,
            _role: &str,
            _party_id: PartyId,
            _provider: &Provider,
        ) -> Result<Option<ComponentParameters>, ResolveError> {
            self.calls.borrow_mut().push(component_name.to_string());
            if self.fail_on == Some(component_name) {
                return Err(ResolveError::Failed("boom".to_string()));
            }
            if self.applicable.iter().any(|c| *c == component_name) {
                let mut params = Map::new();
                params.insert("max_iter".to_string(), json!(10));
                return Ok(Some(ComponentParameters::new("HeteroLR", params)));
            }
            Ok(None)
        }
    }

    #[derive(Debug, Clone)]
    struct Submission {
        role: String,
        party_id: PartyId,
        run_on_this_party: bool,
        task: TaskDescriptor,
    }

    #[derive(Default, Clone)]
    struct RecordingController {
        submissions: Arc<Mutex<Vec<Submission>>>,
        reject: bool,
    }

    impl RecordingController {
        fn submissions(&self) -> Vec<Submission> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskController for RecordingController {
        async fn create_task(
            &self,
            role: &str,
            party_id: PartyId,
            run_on_this_party: bool,
            task: TaskDescriptor,
        ) -> Result<(), SubmitError> {
            if self.reject {
                return Err(SubmitError::Rejected("controller unavailable".to_string()));
            }
            self.submissions.lock().unwrap().push(Submission {
                role: role.to_string(),
                party_id,
                run_on_this_party,
                task,
            });
            Ok(())
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(components: &[&str]) -> Self {
            let fixture = Self {
                dir: tempfile::tempdir().unwrap(),
            };
            fixture.write(
                "component_registry.json",
                json!({
                    "provider": {
                        "fate_algorithm": {
                            "default": {"version": "1.7.0"},
                            "1.7.0": {"path": "/data/projects/fate/python/federatedml"}
                        }
                    }
                }),
            );
            fixture.write(
                "init.json",
                json!({
                    "provider": {
                        "name": "fate_algorithm",
                        "version": "1.7.0",
                        "path": "/data/projects/fate/python/federatedml"
                    },
                    "common_task_info": {
                        "job_id": "job-7",
                        "role": "host",
                        "party_id": 100,
                        "run_on_this_party": true,
                        "initiator_role": "guest",
                        "initiator_party_id": 9999
                    },
                    "components": components
                }),
            );
            fixture.write("dsl.json", json!({"components": {}}));
            fixture.write("runtime_conf.json", json!({}));
            fixture.write("train_runtime_conf.json", json!({}));
            fixture.write("pipeline_dsl.json", json!({}));
            fixture
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn write(&self, name: &str, value: Value) {
            std::fs::write(self.path(name), value.to_string()).unwrap();
        }

        fn args(&self) -> LaunchArgs {
            LaunchArgs {
                job_id: "job-7".to_string(),
                role: "host".to_string(),
                party_id: 100,
                config: self.path("init.json"),
                result: self.path("result/initialized.json"),
                dsl: self.path("dsl.json"),
                runtime_conf: self.path("runtime_conf.json"),
                train_runtime_conf: self.path("train_runtime_conf.json"),
                pipeline_dsl: self.path("pipeline_dsl.json"),
                run_ip: None,
                job_server: None,
                provider_registry: self.path("component_registry.json"),
                task_dir: self.path("tasks"),
            }
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_host_party() {
        let fixture = Fixture::new(&["hetero_lr_0", "evaluation_0"]);
        let controller = RecordingController::default();
        let resolver = ScriptedResolver {
            applicable: vec!["hetero_lr_0"],
            ..Default::default()
        };
        let initializer = TaskInitializer::new(resolver, controller.clone());

        let args = fixture.args();
        let result = initializer.run(&args).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(
            read_json(&args.result),
            json!({
                "hetero_lr_0": {"need_run": true},
                "evaluation_0": {"need_run": false}
            })
        );

        let submissions = controller.submissions();
        assert_eq!(submissions.len(), 1);
        let submission = &submissions[0];
        assert_eq!(submission.role, "host");
        assert_eq!(submission.party_id, PartyId::new(100));
        assert!(submission.run_on_this_party);
        assert_eq!(submission.task.job_id, JobId::new("job-7"));
        assert_eq!(submission.task.role, "host");
        assert_eq!(submission.task.party_id, PartyId::new(100));
        assert_eq!(submission.task.component_name, "hetero_lr_0");
        assert_eq!(submission.task.component_module, "HeteroLR");
        assert_eq!(submission.task.provider_info.version, "1.7.0");
        assert_eq!(submission.task.extra.get("initiator_party_id"), Some(&json!(9999)));
    }

    #[tokio::test]
    async fn test_resolver_fault_aborts_without_result() {
        let fixture = Fixture::new(&["reader_0", "hetero_lr_0", "evaluation_0"]);
        let args = fixture.args();
        std::fs::create_dir_all(args.result.parent().unwrap()).unwrap();
        std::fs::write(&args.result, r#"{"reader_0": {"need_run": true}}"#).unwrap();

        let controller = RecordingController::default();
        let resolver = ScriptedResolver {
            applicable: vec!["reader_0", "hetero_lr_0", "evaluation_0"],
            fail_on: Some("hetero_lr_0"),
            ..Default::default()
        };
        let initializer = TaskInitializer::new(resolver, controller.clone());

        let err = initializer.run(&args).await.unwrap_err();

        assert!(matches!(
            err,
            InitError::Resolution { ref component, .. } if component == "hetero_lr_0"
        ));
        assert!(!args.result.exists());
        // The third component is never considered.
        assert_eq!(
            *initializer.resolver.calls.borrow(),
            vec!["reader_0".to_string(), "hetero_lr_0".to_string()]
        );
        assert_eq!(controller.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_controller_rejection_aborts() {
        let fixture = Fixture::new(&["hetero_lr_0"]);
        let controller = RecordingController {
            reject: true,
            ..Default::default()
        };
        let resolver = ScriptedResolver {
            applicable: vec!["hetero_lr_0"],
            ..Default::default()
        };
        let initializer = TaskInitializer::new(resolver, controller);

        let args = fixture.args();
        let err = initializer.run(&args).await.unwrap_err();
        assert!(matches!(err, InitError::Submission { .. }));
        assert!(!args.result.exists());
    }

    #[tokio::test]
    async fn test_unsupported_registry_provider_aborts() {
        let fixture = Fixture::new(&["hetero_lr_0"]);
        fixture.write(
            "component_registry.json",
            json!({"provider": {"sklearn": {"1.0": {"path": "/opt/sklearn"}}}}),
        );
        let initializer = TaskInitializer::new(
            ScriptedResolver::default(),
            RecordingController::default(),
        );

        let args = fixture.args();
        let err = initializer.run(&args).await.unwrap_err();
        assert!(matches!(err, InitError::UnsupportedProvider(ref name) if name == "sklearn"));
        assert!(initializer.resolver.calls.borrow().is_empty());
        assert!(!args.result.exists());
    }

    #[tokio::test]
    async fn test_unsupported_config_provider_aborts() {
        let fixture = Fixture::new(&[]);
        fixture.write(
            "init.json",
            json!({
                "provider": {"name": "sklearn", "version": "1.0", "path": "/opt/sklearn"},
                "common_task_info": {"run_on_this_party": true},
                "components": ["hetero_lr_0"]
            }),
        );
        let initializer = TaskInitializer::new(
            ScriptedResolver::default(),
            RecordingController::default(),
        );

        let err = initializer.run(&fixture.args()).await.unwrap_err();
        assert!(matches!(err, InitError::UnsupportedProvider(_)));
    }

    #[tokio::test]
    async fn test_duplicate_components_rejected() {
        let fixture = Fixture::new(&["reader_0", "reader_0"]);
        let initializer = TaskInitializer::new(
            ScriptedResolver::default(),
            RecordingController::default(),
        );

        let err = initializer.run(&fixture.args()).await.unwrap_err();
        assert!(matches!(err, InitError::ArtifactLoad(ArtifactError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_missing_artifact_aborts() {
        let fixture = Fixture::new(&["reader_0"]);
        std::fs::remove_file(fixture.path("train_runtime_conf.json")).unwrap();
        let initializer = TaskInitializer::new(
            ScriptedResolver::default(),
            RecordingController::default(),
        );

        let err = initializer.run(&fixture.args()).await.unwrap_err();
        assert!(matches!(err, InitError::ArtifactLoad(ArtifactError::Read { .. })));
    }

    #[tokio::test]
    async fn test_invalid_coordinator_aborts() {
        let fixture = Fixture::new(&["reader_0"]);
        let mut args = fixture.args();
        args.job_server = Some("10.0.0.5".to_string());
        let initializer = TaskInitializer::new(
            ScriptedResolver::default(),
            RecordingController::default(),
        );

        let err = initializer.run(&args).await.unwrap_err();
        assert!(matches!(err, InitError::Config(ConfigError::InvalidCoordinator(_))));
    }

    #[tokio::test]
    async fn test_dsl_resolver_with_spool_controller() {
        let fixture = Fixture::new(&["reader_0", "hetero_lr_0", "evaluation_0"]);
        fixture.write(
            "dsl.json",
            json!({
                "components": {
                    "reader_0": {"module": "Reader"},
                    "hetero_lr_0": {"module": "HeteroLR"},
                    "evaluation_0": {"module": "Evaluation", "roles": ["guest"]}
                }
            }),
        );
        fixture.write(
            "runtime_conf.json",
            json!({
                "role": {"guest": [9999], "host": [100]},
                "component_parameters": {
                    "role": {"host": {"0": {"reader_0": {"table": {"name": "breast_hetero_host", "namespace": "experiment"}}}}}
                }
            }),
        );

        let mut args = fixture.args();
        args.job_server = Some("10.0.0.5:9380".to_string());
        let initializer =
            TaskInitializer::new(DslResolver::new(), SpoolTaskController::new(&args.task_dir));

        let result = initializer.run(&args).await.unwrap();

        assert_eq!(result.components_to_run(), vec!["reader_0", "hetero_lr_0"]);
        assert_eq!(
            read_json(&args.result),
            json!({
                "reader_0": {"need_run": true},
                "hetero_lr_0": {"need_run": true},
                "evaluation_0": {"need_run": false}
            })
        );

        let reader = read_json(&args.task_dir.join("job-7/host/100/reader_0.json"));
        assert_eq!(reader["component_module"], json!("Reader"));
        assert_eq!(
            reader["component_parameters"]["table"]["name"],
            json!("breast_hetero_host")
        );
        assert_eq!(reader["initiator_role"], json!("guest"));
        assert!(!args.task_dir.join("job-7/host/100/evaluation_0.json").exists());
    }
}
