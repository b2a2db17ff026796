//! FATE Flow Task Initializer
//!
//! Given a job's dsl and runtime settings, decides which of the job's
//! components one party runs under one role, creates a task for each of
//! them, and writes the per-component result the scheduler waits for.

pub mod artifact;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
pub mod initializer;
pub mod logging;
pub mod resolver;
pub mod result;

/// Version of this runner, also the version of its built-in tool provider.
pub const RUNNER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use catalog::ProviderCatalog;
pub use cli::LaunchArgs;
pub use config::{ProcessConfig, RuntimeContext};
pub use controller::{SpoolTaskController, TaskController};
pub use error::{InitError, FAILURE_EXIT_CODE};
pub use graph::JobGraph;
pub use initializer::{InitConfig, TaskInitializer};
pub use resolver::{ComponentResolver, DslResolver};
pub use result::InitializationResult;
