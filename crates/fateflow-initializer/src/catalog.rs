//! Component provider registry.
//!
//! The catalog maps each trusted provider family to its installed versions.
//! It is filled once at startup from the registry file, after which the
//! runner's own tool provider is injected.

use std::collections::BTreeMap;
use std::path::Path;

use fateflow_core::{Provider, ProviderName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::artifact::load_json;
use crate::error::{ArtifactError, CatalogError};
use crate::RUNNER_VERSION;

/// Registry section holding the providers.
const PROVIDER_SECTION: &str = "provider";

/// Version key naming a provider's default version.
const DEFAULT_VERSION_KEY: &str = "default";

/// Module path of the runner's bundled tool components.
pub const BUILTIN_PROVIDER_PATH: [&str; 2] = ["fate_flow", "components"];

/// One version entry of a provider, kept exactly as written in the registry.
///
/// The `default` entry carries a `version` pointing at another version key.
/// Installed versions carry a `path`, whose shape depends on the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderEntry(Value);

impl ProviderEntry {
    /// The version a `default` entry points at.
    pub fn version(&self) -> Option<&str> {
        self.0.get("version")?.as_str()
    }

    /// Install location of a version entry.
    pub fn path(&self) -> Option<&Value> {
        self.0.get("path")
    }
}

/// Installed versions of one provider, keyed by version (or `default`).
pub type ProviderVersions = BTreeMap<String, ProviderEntry>;

/// Versioned registry of trusted component providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderCatalog {
    provider: BTreeMap<ProviderName, ProviderVersions>,

    /// Other registry sections, kept verbatim.
    #[serde(flatten)]
    sections: Map<String, Value>,
}

impl ProviderCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `name` is a known provider identity.
    pub fn contains(name: &str) -> bool {
        ProviderName::contains(name)
    }

    /// Load a registry file and merge it into the catalog.
    ///
    /// Sections present in the file replace existing ones. The whole
    /// document is validated first: on error the catalog is left unchanged.
    pub fn load(&mut self, path: &Path) -> Result<(), CatalogError> {
        let document: Map<String, Value> = load_json(path)?;
        self.merge(document)?;

        info!(
            path = %path.display(),
            providers = self.provider.len(),
            "Loaded component provider registry"
        );
        Ok(())
    }

    /// Load a registry file, then inject the built-in provider.
    pub fn load_with_builtin(&mut self, path: &Path) -> Result<(), CatalogError> {
        self.load(path)?;
        self.inject_builtin_provider();
        Ok(())
    }

    /// Merge an already-parsed registry document.
    pub fn merge(&mut self, mut document: Map<String, Value>) -> Result<(), CatalogError> {
        let providers = match document.remove(PROVIDER_SECTION) {
            Some(section) => Some(parse_provider_section(section)?),
            None => None,
        };

        if let Some(providers) = providers {
            self.provider = providers;
        }
        self.sections.extend(document);
        Ok(())
    }

    /// (Re)install the runner's own tool provider under its version.
    pub fn inject_builtin_provider(&mut self) {
        let mut versions = ProviderVersions::new();
        versions.insert(
            DEFAULT_VERSION_KEY.to_string(),
            ProviderEntry(json!({ "version": RUNNER_VERSION })),
        );
        versions.insert(
            RUNNER_VERSION.to_string(),
            ProviderEntry(json!({ "path": BUILTIN_PROVIDER_PATH })),
        );
        self.provider.insert(ProviderName::FateFlowTools, versions);
    }

    /// Registered versions of one provider.
    pub fn versions(&self, name: ProviderName) -> Option<&ProviderVersions> {
        self.provider.get(&name)
    }

    /// The version a provider's `default` marker points at.
    pub fn default_version(&self, name: ProviderName) -> Option<&str> {
        self.versions(name)?.get(DEFAULT_VERSION_KEY)?.version()
    }

    /// Check whether `provider`'s exact version is installed.
    pub fn is_registered(&self, provider: &Provider) -> bool {
        self.versions(provider.name)
            .and_then(|versions| versions.get(&provider.version))
            .is_some_and(|entry| entry.path().is_some())
    }

    /// A non-provider registry section.
    pub fn section(&self, key: &str) -> Option<&Value> {
        self.sections.get(key)
    }
}

fn parse_provider_section(
    section: Value,
) -> Result<BTreeMap<ProviderName, ProviderVersions>, CatalogError> {
    let raw: BTreeMap<String, ProviderVersions> = serde_json::from_value(section)
        .map_err(|e| ArtifactError::invalid("provider registry", e.to_string()))?;

    let mut providers = BTreeMap::new();
    for (name, versions) in raw {
        let name: ProviderName = name
            .parse()
            .map_err(|_| CatalogError::UnsupportedProvider(name.clone()))?;
        providers.insert(name, versions);
    }
    Ok(providers)
}
