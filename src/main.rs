//! codebox - confined code execution from the command line.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use codebox::cli::{self, Cli, Commands};
use codebox_config::CodeboxConfig;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    let config = cli::load_config(&args)?;
    initialize_tracing(&config);

    let success = match &args.command {
        Commands::Run(run_args) => cli::run::handle_run_command(config, run_args).await?,
        Commands::Request { path } => {
            cli::request::handle_request_command(config, path.as_deref()).await?
        }
        Commands::Config => {
            cli::config::handle_config_command(&config)?;
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `RUST_LOG` takes precedence; otherwise `[debug]` decides. Logs go to
/// stderr so stdout carries only the response.
fn initialize_tracing(config: &CodeboxConfig) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if config.debug.enable_tracing {
        EnvFilter::new(config.debug.filter_directive())
    } else {
        return;
    };

    let initialized = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .try_init();

    if initialized.is_ok() && config.debug.enable_tracing {
        tracing::info!(
            level = %config.debug.trace_level,
            targets = ?config.debug.trace_targets,
            "debug tracing enabled"
        );
    }
}
