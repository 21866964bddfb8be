//! Request orchestration: validate, resolve the workspace, install
//! dependencies, render the shim, run the guest, format, clean up.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use codebox_commons::is_case_insensitive_dir;
use codebox_config::CodeboxConfig;
use codebox_process::{DEPENDENCY_PATH_VAR, ProcessRunner, ProcessSpec, host_minimal_env};
use tracing::{debug, info, warn};

use crate::error::{ExecError, ExecResult};
use crate::formatter::{ExecutionResponse, RunDetails, format_outcome};
use crate::installer::{DependencyInstaller, InstallReport};
use crate::interpreter::Interpreter;
use crate::policy::ConfinementPolicy;
use crate::request::ExecutionRequest;
use crate::shim::{self, ShimInputs};
use crate::workspace::{ScratchDir, WorkspaceResolver};

const TEMP_VARS: &[&str] = &["TMPDIR", "TEMP", "TMP"];

/// Runs one request at a time to completion. Concurrent calls share
/// nothing except, in persistent mode, the persistent directory itself.
#[derive(Debug, Clone)]
pub struct Executor {
    config: CodeboxConfig,
    resolver: WorkspaceResolver,
    interpreter: Interpreter,
    base_env: BTreeMap<String, String>,
}

impl Executor {
    /// Executor rooted at the current directory, with the interpreter
    /// detected from configuration and the host's minimal environment.
    pub fn new(config: CodeboxConfig) -> ExecResult<Self> {
        let resolver = WorkspaceResolver::from_config(&config.workspace)?;
        Ok(Self::with_resolver(config, resolver))
    }

    pub fn with_resolver(config: CodeboxConfig, resolver: WorkspaceResolver) -> Self {
        let interpreter = Interpreter::detect(&config.interpreter);
        Self {
            config,
            resolver,
            interpreter,
            base_env: host_minimal_env(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Interpreter) -> Self {
        self.interpreter = interpreter;
        self
    }

    pub fn config(&self) -> &CodeboxConfig {
        &self.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Execute `request`; engine errors become failed responses.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResponse {
        match self.try_execute(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(%error, "execution request failed");
                ExecutionResponse::from_error(&error)
            }
        }
    }

    pub async fn try_execute(&self, request: &ExecutionRequest) -> ExecResult<ExecutionResponse> {
        request.validate()?;

        let timeout_ms = request.effective_timeout_ms(&self.config.execution);
        let mut scratch = ScratchDir::create()?;
        info!(
            scratch = %scratch.path().display(),
            workspace = %request.workspace.label(),
            timeout_ms,
            packages = ?request.install_packages,
            "starting execution"
        );

        let result = self.run_in_scratch(request, timeout_ms, &mut scratch).await;
        scratch.cleanup();
        result
    }

    async fn run_in_scratch(
        &self,
        request: &ExecutionRequest,
        timeout_ms: u64,
        scratch: &mut ScratchDir,
    ) -> ExecResult<ExecutionResponse> {
        let workdir = self.resolver.resolve(
            &request.workspace,
            request.target_directory.as_deref(),
            scratch,
        )?;
        let timeout = Duration::from_millis(timeout_ms);

        let case_insensitive = is_case_insensitive_dir(scratch.path());
        let policy = ConfinementPolicy::new([workdir.as_path(), scratch.path()], case_insensitive)?;
        let script_path = scratch.script_path();
        policy.require(&workdir)?;
        policy.require(&script_path)?;
        debug!(roots = ?policy.roots(), case_insensitive, "confinement policy ready");

        let base_env = with_temp_dir(self.base_env.clone(), scratch.path());
        let deps_dir = scratch.deps_dir();
        let report = if request.has_dependencies() {
            DependencyInstaller::new(
                &self.interpreter,
                &self.config.installer,
                self.config.execution.max_output_bytes,
            )
            .install(&request.install_packages, &deps_dir, base_env.clone(), timeout)
            .await?
        } else {
            InstallReport::default()
        };

        let script = shim::render(ShimInputs {
            code: &request.code,
            policy: &policy,
            workdir: &workdir,
            scratch: scratch.path(),
        })?;
        tokio::fs::write(&script_path, script)
            .await
            .map_err(|source| ExecError::io("writing the guest script", source))?;

        let installed = (!report.packages.is_empty()).then_some(deps_dir.as_path());
        let spec = ProcessSpec::new(self.interpreter.program.as_os_str())
            .with_args([std::ffi::OsString::from("-u"), script_path.into_os_string()])
            .with_current_dir(&workdir)
            .with_env(guest_env(base_env, installed))
            .with_timeout(Some(timeout))
            .with_max_output_bytes(self.config.execution.max_output_bytes);

        let outcome = ProcessRunner::run(spec).await?;
        info!(
            exit = %outcome.exit,
            timed_out = outcome.timed_out,
            duration_ms = outcome.duration.as_millis(),
            "guest finished"
        );

        Ok(format_outcome(
            &outcome,
            request.return_format,
            &RunDetails {
                working_dir: workdir,
                timeout_ms,
                packages: report.packages,
            },
        ))
    }
}

fn with_temp_dir(mut env: BTreeMap<String, String>, scratch: &Path) -> BTreeMap<String, String> {
    let scratch = scratch.to_string_lossy().into_owned();
    for var in TEMP_VARS {
        env.insert((*var).to_string(), scratch.clone());
    }
    env
}

/// Guest environment: the minimal set plus interpreter hygiene flags. The
/// dependency path is set only when packages were installed.
fn guest_env(mut env: BTreeMap<String, String>, deps_dir: Option<&Path>) -> BTreeMap<String, String> {
    env.remove(DEPENDENCY_PATH_VAR);
    if let Some(dir) = deps_dir {
        env.insert(
            DEPENDENCY_PATH_VAR.to_string(),
            dir.to_string_lossy().into_owned(),
        );
    }
    env.insert("PYTHONNOUSERSITE".to_string(), "1".to_string());
    env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());
    env.insert("PYTHONIOENCODING".to_string(), "utf-8".to_string());
    env
}
