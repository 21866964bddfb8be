use std::path::Path;

use anyhow::{Context, Result};
use codebox_config::CodeboxConfig;
use codebox_core::{ExecutionRequest, ExecutionResponse, Executor};
use tracing::warn;

use super::read_input;
use super::run::print_response;

/// Parse a JSON request; malformed input becomes a failed response.
pub fn parse_request(raw: &str) -> Result<ExecutionRequest, ExecutionResponse> {
    serde_json::from_str(raw).map_err(|error| {
        warn!(%error, "rejecting malformed request");
        ExecutionResponse::failure(format!("Invalid request: {error}"))
    })
}

/// Handle `codebox request`. The response is always JSON on stdout.
pub async fn handle_request_command(config: CodeboxConfig, path: Option<&Path>) -> Result<bool> {
    let raw = read_input(path, "request")?;
    let response = match parse_request(&raw) {
        Ok(request) => {
            let executor = Executor::new(config).context("Failed to initialize executor")?;
            executor.execute(&request).await
        }
        Err(response) => response,
    };
    print_response(&response, true)?;
    Ok(response.success)
}
