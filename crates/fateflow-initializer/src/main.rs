//! FATE Flow Task Initializer

use std::process::ExitCode;

use clap::Parser;

use fateflow_initializer::logging::init_tracing;
use fateflow_initializer::{
    DslResolver, LaunchArgs, SpoolTaskController, TaskInitializer, FAILURE_EXIT_CODE,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = LaunchArgs::parse();

    // Initialize tracing
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(FAILURE_EXIT_CODE);
    }

    let initializer = TaskInitializer::new(
        DslResolver::new(),
        SpoolTaskController::new(args.task_dir.clone()),
    );

    // Errors are logged inside the pass, together with the launch arguments.
    match initializer.run(&args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::from(FAILURE_EXIT_CODE),
    }
}
