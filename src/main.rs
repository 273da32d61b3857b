//! cfn-deploy - CloudFormation deploy step for CI pipelines.

use cfn_deploy::{action, cli::Inputs, outputs::escape_annotation};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    // RUNNER_DEBUG is set when a workflow is re-run with debug logging.
    let default = match std::env::var("RUNNER_DEBUG").as_deref() {
        Ok("1") => "cfn_deploy=debug,cfn_deploy_aws=debug,info",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let inputs = Inputs::parse();
    init_logging();

    match action::run(&inputs).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{}", err);
            println!("::error::{}", escape_annotation(&err.to_string()));
            ExitCode::FAILURE
        }
    }
}
