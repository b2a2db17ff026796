//! Component provider identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Closed set of provider families FATE Flow knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderName {
    /// The federated machine learning algorithm library.
    FateAlgorithm,
    /// Third-party algorithms packaged for FATE.
    AvatarAlgorithm,
    /// FATE Flow's own bundled tool components (reader, upload, ...).
    FateFlowTools,
}

impl ProviderName {
    /// Every known provider family.
    pub const ALL: [ProviderName; 3] = [
        ProviderName::FateAlgorithm,
        ProviderName::AvatarAlgorithm,
        ProviderName::FateFlowTools,
    ];

    /// Wire name of the provider family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FateAlgorithm => "fate_algorithm",
            Self::AvatarAlgorithm => "avatar_algorithm",
            Self::FateFlowTools => "fate_flow_tools",
        }
    }

    /// Check whether `name` is a known provider identity.
    pub fn contains(name: &str) -> bool {
        Self::ALL.iter().any(|p| p.as_str() == name)
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedProvider(s.to_string()))
    }
}

/// Where an executor finds a provider's implementation.
///
/// Registries describe it either as a filesystem location or as a list of
/// module path segments (e.g. `["fate_flow", "components"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModulePath {
    Segments(Vec<String>),
    Location(String),
}

impl ModulePath {
    /// Build a segmented module path.
    pub fn segments<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Segments(parts.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segments(parts) => write!(f, "{}", parts.join(".")),
            Self::Location(location) => write!(f, "{}", location),
        }
    }
}

/// A versioned source of component implementations.
///
/// Serializes to the `provider_info` object carried by every task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider family.
    pub name: ProviderName,

    /// Provider version, e.g. "1.7.0".
    pub version: String,

    /// Implementation location used by the executor.
    pub path: ModulePath,
}

impl Provider {
    /// Create a new Provider.
    pub fn new(name: ProviderName, version: impl Into<String>, path: ModulePath) -> Self {
        Self {
            name,
            version: version.into(),
            path,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
