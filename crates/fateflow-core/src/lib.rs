//! FATE Flow Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Filesystem or network I/O
//! - Runtime specifics
//!
//! All types here describe what a task initializer reads and produces:
//! provider identities, task descriptors and the per-party process role.

pub mod error;
pub mod ids;
pub mod provider;
pub mod role;
pub mod task;

// Re-export commonly used types
pub use error::CoreError;
pub use ids::{JobId, PartyId, TaskId};
pub use provider::{ModulePath, Provider, ProviderName};
pub use role::ProcessRole;
pub use task::{CommonTaskInfo, ComponentParameters, TaskDescriptor, TaskStatus};
