//! Launch parameters of the task initializer process.

use std::path::PathBuf;

use clap::Parser;

/// Default location of the component provider registry.
pub const DEFAULT_PROVIDER_REGISTRY: &str = "conf/component_registry.json";

/// Default spool directory for created tasks.
pub const DEFAULT_TASK_DIR: &str = "tasks";

/// FATE Flow task initializer - creates this party's tasks for a job
#[derive(Debug, Clone, Parser)]
#[command(name = "task-initializer")]
#[command(
    about = "Decide which job components this party runs and create their tasks",
    long_about = None
)]
pub struct LaunchArgs {
    /// Job id
    #[arg(short = 'j', long = "job_id")]
    pub job_id: String,

    /// Role of this party in the job
    #[arg(short = 'r', long = "role")]
    pub role: String,

    /// Party id
    #[arg(short = 'p', long = "party_id")]
    pub party_id: u64,

    /// Initialization config: provider, common task info and components
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,

    /// Where to write the initialization result
    #[arg(long = "result")]
    pub result: PathBuf,

    /// Job dsl
    #[arg(long = "dsl")]
    pub dsl: PathBuf,

    /// Job runtime conf
    #[arg(long = "runtime_conf")]
    pub runtime_conf: PathBuf,

    /// Runtime conf of the training job a predict job continues from
    #[arg(long = "train_runtime_conf")]
    pub train_runtime_conf: PathBuf,

    /// Pipeline dsl
    #[arg(long = "pipeline_dsl")]
    pub pipeline_dsl: PathBuf,

    /// Address of the host running this process
    #[arg(long = "run_ip")]
    pub run_ip: Option<String>,

    /// Coordinator (job server) address as host:port
    #[arg(long = "job_server")]
    pub job_server: Option<String>,

    /// Component provider registry
    #[arg(
        long = "provider_registry",
        env = "FATE_FLOW_COMPONENT_REGISTRY",
        default_value = DEFAULT_PROVIDER_REGISTRY
    )]
    pub provider_registry: PathBuf,

    /// Spool directory for created tasks
    #[arg(long = "task_dir", env = "FATE_FLOW_TASK_DIR", default_value = DEFAULT_TASK_DIR)]
    pub task_dir: PathBuf,
}
