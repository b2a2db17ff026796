//! Process configuration.
//!
//! `ProcessConfig` is filled in while the process starts up, then frozen
//! into a `RuntimeContext` that later stages only read.

use std::collections::BTreeMap;

use fateflow_core::{ProcessRole, Provider};
use tracing::debug;

use crate::catalog::ProviderCatalog;
use crate::error::ConfigError;
use crate::RUNNER_VERSION;

/// Configuration fields that can be set by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    JobServerHost,
    JobServerVip,
    HttpPort,
    ComputingEngine,
    FederationEngine,
    FederatedMode,
    WorkMode,
    IsServer,
    UseLocalDatabase,
}

impl ConfigField {
    fn from_key(key: &str) -> Option<Self> {
        let field = match key.to_ascii_uppercase().as_str() {
            "JOB_SERVER_HOST" => Self::JobServerHost,
            "JOB_SERVER_VIP" => Self::JobServerVip,
            "HTTP_PORT" => Self::HttpPort,
            "COMPUTING_ENGINE" => Self::ComputingEngine,
            "FEDERATION_ENGINE" => Self::FederationEngine,
            "FEDERATED_MODE" => Self::FederatedMode,
            "WORK_MODE" => Self::WorkMode,
            "IS_SERVER" => Self::IsServer,
            "USE_LOCAL_DATABASE" => Self::UseLocalDatabase,
            _ => return None,
        };
        Some(field)
    }
}

/// Mutable process configuration, used during startup only.
#[derive(Debug, Clone, Default)]
pub struct ProcessConfig {
    role: Option<ProcessRole>,
    job_server_host: Option<String>,
    job_server_vip: Option<String>,
    http_port: Option<u16>,
    computing_engine: Option<String>,
    federation_engine: Option<String>,
    federated_mode: Option<String>,
    work_mode: Option<u8>,
    is_server: bool,
    use_local_database: bool,
    environment: BTreeMap<String, String>,
    catalog: ProviderCatalog,
    provider: Option<Provider>,
}

impl ProcessConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set every recognised field in `fields`; unknown keys are ignored.
    pub fn init<I, K, V>(&mut self, fields: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in fields {
            let (key, value) = (key.as_ref(), value.as_ref());
            let Some(field) = ConfigField::from_key(key) else {
                debug!(key = %key, "Ignoring unknown config field");
                continue;
            };

            match field {
                ConfigField::JobServerHost => self.job_server_host = Some(value.to_string()),
                ConfigField::JobServerVip => self.job_server_vip = Some(value.to_string()),
                ConfigField::HttpPort => self.http_port = Some(parse_value(key, value)?),
                ConfigField::ComputingEngine => self.computing_engine = Some(value.to_string()),
                ConfigField::FederationEngine => self.federation_engine = Some(value.to_string()),
                ConfigField::FederatedMode => self.federated_mode = Some(value.to_string()),
                ConfigField::WorkMode => self.work_mode = Some(parse_value(key, value)?),
                ConfigField::IsServer => self.is_server = parse_bool(key, value)?,
                ConfigField::UseLocalDatabase => self.use_local_database = parse_bool(key, value)?,
            }
        }
        Ok(())
    }

    /// Install the coordinator reported to by this process.
    ///
    /// A process told its coordinator on the command line is an executor.
    pub fn set_coordinator(&mut self, address: &str) -> Result<(), ConfigError> {
        let (host, port) = address
            .rsplit_once(':')
            .filter(|(host, port)| !host.is_empty() && !port.is_empty())
            .ok_or_else(|| ConfigError::InvalidCoordinator(address.to_string()))?;

        let port: u16 = port
            .parse()
            .map_err(|_| ConfigError::InvalidCoordinator(address.to_string()))?;

        self.job_server_host = Some(host.to_string());
        self.http_port = Some(port);
        self.set_role(ProcessRole::Executor);
        Ok(())
    }

    pub fn set_role(&mut self, role: ProcessRole) {
        self.role = Some(role);
    }

    pub fn set_catalog(&mut self, catalog: ProviderCatalog) {
        self.catalog = catalog;
    }

    pub fn set_active_provider(&mut self, provider: Provider) {
        self.provider = Some(provider);
    }

    /// Merge a version/environment snapshot; later values win.
    pub fn record_environment<I, K, V>(&mut self, snapshot: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment
            .extend(snapshot.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn get_environment(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str)
    }

    pub fn get_all_environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn role(&self) -> Option<ProcessRole> {
        self.role
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    /// Freeze the configuration. The role defaults to driver.
    pub fn finalize(self) -> RuntimeContext {
        RuntimeContext {
            role: self.role.unwrap_or_default(),
            job_server_host: self.job_server_host,
            job_server_vip: self.job_server_vip,
            http_port: self.http_port,
            computing_engine: self.computing_engine,
            federation_engine: self.federation_engine,
            federated_mode: self.federated_mode,
            work_mode: self.work_mode,
            is_server: self.is_server,
            use_local_database: self.use_local_database,
            environment: self.environment,
            catalog: self.catalog,
            provider: self.provider,
        }
    }
}

/// Read-only process configuration shared by every later stage.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    role: ProcessRole,
    job_server_host: Option<String>,
    job_server_vip: Option<String>,
    http_port: Option<u16>,
    computing_engine: Option<String>,
    federation_engine: Option<String>,
    federated_mode: Option<String>,
    work_mode: Option<u8>,
    is_server: bool,
    use_local_database: bool,
    environment: BTreeMap<String, String>,
    catalog: ProviderCatalog,
    provider: Option<Provider>,
}

impl RuntimeContext {
    pub fn role(&self) -> ProcessRole {
        self.role
    }

    /// Coordinator host and port, when both are known.
    pub fn coordinator(&self) -> Option<(&str, u16)> {
        Some((self.job_server_host.as_deref()?, self.http_port?))
    }

    pub fn job_server_vip(&self) -> Option<&str> {
        self.job_server_vip.as_deref()
    }

    pub fn computing_engine(&self) -> Option<&str> {
        self.computing_engine.as_deref()
    }

    pub fn federation_engine(&self) -> Option<&str> {
        self.federation_engine.as_deref()
    }

    pub fn federated_mode(&self) -> Option<&str> {
        self.federated_mode.as_deref()
    }

    pub fn work_mode(&self) -> Option<u8> {
        self.work_mode
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }

    pub fn use_local_database(&self) -> bool {
        self.use_local_database
    }

    pub fn get_environment(&self, key: &str) -> Option<&str> {
        self.environment.get(key).map(String::as_str)
    }

    pub fn get_all_environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn catalog(&self) -> &ProviderCatalog {
        &self.catalog
    }

    pub fn active_provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }
}

/// Version snapshot of this runner.
pub fn runtime_versions() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("FATEFlow".to_string(), RUNNER_VERSION.to_string()),
        ("OS".to_string(), std::env::consts::OS.to_string()),
        ("ARCH".to_string(), std::env::consts::ARCH.to_string()),
    ])
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
