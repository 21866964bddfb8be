//! Confinement shim generator.
//!
//! The guest preamble lives in `confine.py` as a versioned template. Both
//! the caller's source and the policy are embedded base64-encoded, so no
//! caller-controlled text is ever interpolated into guest syntax.
//!
//! Generated script layout:
//! 1. `_codebox_install()` captures the originals, installs the guarded
//!    bindings (low-level primitives, `shutil`, `pathlib`, `tempfile`),
//!    changes into the working directory and prepares a fresh `__main__`.
//! 2. The installer removes itself from the script namespace.
//! 3. Caller code is compiled as [`GUEST_FILENAME`] and executed in the
//!    fresh namespace.

use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::{ExecError, ExecResult};
use crate::policy::ConfinementPolicy;

/// Bumped whenever the template's observable behavior changes.
pub const SHIM_VERSION: &str = "4";

/// Filename caller code is compiled under; tracebacks show it.
pub const GUEST_FILENAME: &str = "<codebox>";

const TEMPLATE: &str = include_str!("confine.py");

const VERSION_SLOT: &str = "{{SHIM_VERSION}}";
const CONFIG_SLOT: &str = "{{CONFIG_B64}}";
const CODE_SLOT: &str = "{{CODE_B64}}";

#[derive(Debug, Serialize)]
struct ShimConfig<'a> {
    version: &'static str,
    roots: &'a [String],
    scratch: String,
    workdir: String,
    case_insensitive: bool,
    filename: &'static str,
}

/// Inputs for one generated script.
#[derive(Debug, Clone, Copy)]
pub struct ShimInputs<'a> {
    pub code: &'a str,
    pub policy: &'a ConfinementPolicy,
    pub workdir: &'a Path,
    pub scratch: &'a Path,
}

/// Render the self-contained guest script for `inputs`.
pub fn render(inputs: ShimInputs<'_>) -> ExecResult<String> {
    let config = ShimConfig {
        version: SHIM_VERSION,
        roots: inputs.policy.roots(),
        scratch: inputs.scratch.to_string_lossy().into_owned(),
        workdir: inputs.workdir.to_string_lossy().into_owned(),
        case_insensitive: inputs.policy.case_insensitive(),
        filename: GUEST_FILENAME,
    };
    let config_json = serde_json::to_vec(&config).map_err(|error| {
        ExecError::io("encoding shim configuration", std::io::Error::other(error))
    })?;

    Ok(TEMPLATE
        .replace(VERSION_SLOT, SHIM_VERSION)
        .replace(CONFIG_SLOT, &STANDARD.encode(config_json))
        .replace(CODE_SLOT, &STANDARD.encode(inputs.code.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> (tempfile::TempDir, tempfile::TempDir, ConfinementPolicy) {
        let work = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let policy = ConfinementPolicy::new([work.path(), scratch.path()], false).unwrap();
        (work, scratch, policy)
    }

    fn embedded(script: &str, marker: &str) -> Vec<u8> {
        let line = script
            .lines()
            .find(|line| line.contains(marker) && line.contains("b64decode(\""))
            .unwrap();
        let start = line.find("b64decode(\"").unwrap() + "b64decode(\"".len();
        let end = start + line[start..].find('"').unwrap();
        STANDARD.decode(&line[start..end]).unwrap()
    }

    #[test]
    fn caller_code_is_never_interpolated_raw() {
        let (work, scratch, policy) = fixture();
        let code = "print(\"\"\"'''\\\"\"\")\nimport os; os.system('id')";
        let script = render(ShimInputs {
            code,
            policy: &policy,
            workdir: work.path(),
            scratch: scratch.path(),
        })
        .unwrap();

        assert!(!script.contains("os.system('id')"));
        assert_eq!(embedded(&script, "source ="), code.as_bytes());
    }

    #[test]
    fn all_slots_are_filled() {
        let (work, scratch, policy) = fixture();
        let script = render(ShimInputs {
            code: "print(1)",
            policy: &policy,
            workdir: work.path(),
            scratch: scratch.path(),
        })
        .unwrap();

        assert!(!script.contains("{{"));
        assert!(script.starts_with(&format!("# codebox confinement shim v{SHIM_VERSION}")));
    }

    #[test]
    fn config_carries_policy_and_directories() {
        let (work, scratch, policy) = fixture();
        let script = render(ShimInputs {
            code: "pass",
            policy: &policy,
            workdir: work.path(),
            scratch: scratch.path(),
        })
        .unwrap();

        let config: serde_json::Value =
            serde_json::from_slice(&embedded(&script, "config =")).unwrap();
        assert_eq!(config["roots"].as_array().unwrap().len(), 2);
        assert_eq!(config["workdir"], work.path().to_string_lossy().as_ref());
        assert_eq!(config["filename"], GUEST_FILENAME);
        assert_eq!(config["case_insensitive"], false);
    }

    #[test]
    fn installer_removes_itself_before_caller_code_runs() {
        let script = TEMPLATE;
        let install = script.find("_codebox_run = _codebox_install()").unwrap();
        let delete = script.find("del _codebox_install").unwrap();
        let run = script.rfind("_codebox_run()").unwrap();
        assert!(install < delete && delete < run);
    }
}
