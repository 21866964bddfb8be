use anyhow::{Context, Result};
use codebox_config::CodeboxConfig;
use codebox_core::{ExecutionRequest, ExecutionResponse, Executor};

use super::args::RunArgs;
use super::read_input;

/// Source code from `--file`, the positional argument, or stdin.
pub fn resolve_code(args: &RunArgs) -> Result<String> {
    if let Some(file) = &args.file {
        return read_input(Some(file), "code");
    }
    match args.code.as_deref() {
        Some(code) if code != "-" => Ok(code.to_string()),
        _ => read_input(None, "code"),
    }
}

pub fn build_request(args: &RunArgs, code: String) -> ExecutionRequest {
    let mut request = ExecutionRequest::new(code)
        .with_timeout(args.timeout_ms)
        .with_packages(args.install.iter().cloned())
        .with_workspace(args.workspace_mode())
        .with_return_format(args.format.into());
    if let Some(target) = &args.target_directory {
        request = request.with_target_directory(target.clone());
    }
    request
}

/// Run one snippet and print the response. Returns whether it succeeded.
pub async fn handle_run_command(config: CodeboxConfig, args: &RunArgs) -> Result<bool> {
    let code = resolve_code(args)?;
    let request = build_request(args, code);
    let executor = Executor::new(config).context("Failed to initialize executor")?;
    let response = executor.execute(&request).await;
    print_response(&response, args.json)?;
    Ok(response.success)
}

pub(crate) fn print_response(response: &ExecutionResponse, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(response).context("Failed to serialize response")?;
        println!("{rendered}");
    } else if response.success {
        println!("{}", response.text());
    } else {
        eprintln!("{}", response.text());
    }
    Ok(())
}
