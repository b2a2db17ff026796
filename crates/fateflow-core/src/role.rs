//! Process role of a FATE Flow process.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether this process drives jobs or executes work handed to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessRole {
    /// The long-running server process that schedules jobs.
    #[default]
    Driver,
    /// A short-lived process launched to do work for a driver.
    Executor,
}

impl ProcessRole {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Executor => "executor",
        }
    }
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
