//! Minimal environment construction for child processes.
//!
//! The host environment is never inherited. A child receives only the
//! whitelisted variables below, copied from the host when present and
//! non-empty; everything else (API keys, cloud credentials, tokens, linker
//! overrides) is dropped by omission.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Dependency search path variable. Never copied from the host; callers set
/// it explicitly to the isolated install directory.
pub const DEPENDENCY_PATH_VAR: &str = "PYTHONPATH";

/// Executable search path, home directory, temp-directory variables.
pub const BASE_ENV_VARS: &[&str] = &["PATH", "HOME", "TMPDIR", "TEMP", "TMP"];

/// System/user identity and locale.
#[cfg(not(windows))]
pub const PLATFORM_ENV_VARS: &[&str] = &["USER", "LOGNAME", "LANG", "LC_ALL", "LC_CTYPE"];

/// System root, user profile, and app-data locations.
#[cfg(windows)]
pub const PLATFORM_ENV_VARS: &[&str] = &[
    "SYSTEMROOT",
    "WINDIR",
    "USERPROFILE",
    "APPDATA",
    "LOCALAPPDATA",
];

/// Whether `key` belongs to the whitelist.
pub fn is_whitelisted(key: &str) -> bool {
    if key.eq_ignore_ascii_case(DEPENDENCY_PATH_VAR) {
        return false;
    }
    BASE_ENV_VARS
        .iter()
        .chain(PLATFORM_ENV_VARS)
        .any(|allowed| names_match(allowed, key))
}

#[cfg(windows)]
fn names_match(allowed: &str, key: &str) -> bool {
    allowed.eq_ignore_ascii_case(key)
}

#[cfg(not(windows))]
fn names_match(allowed: &str, key: &str) -> bool {
    allowed == key
}

/// Build the minimal environment from an arbitrary source of variables.
///
/// Empty values are dropped.
pub fn build_minimal_env<I, K, V>(source: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    source
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .filter(|(key, value)| !value.is_empty() && is_whitelisted(key))
        .collect()
}

/// Build the minimal environment from the current process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
pub fn host_minimal_env() -> BTreeMap<String, String> {
    build_minimal_env(std::env::vars_os().filter_map(unicode_pair))
}

fn unicode_pair((key, value): (OsString, OsString)) -> Option<(String, String)> {
    Some((key.into_string().ok()?, value.into_string().ok()?))
}
