//! Dependency specifier grammar shared by request validation and the
//! installer. Both boundaries call [`validate_package_spec`] independently.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DependencyError;

static SPEC_CHARSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-\[\]!=<>,]+$").expect("Failed to compile specifier regex")
});

const CONSTRAINT_CHARS: &[char] = &['[', ']', '!', '=', '<', '>', ','];

/// Check a single specifier such as `requests`, `numpy>=1.26,<2` or
/// `httpx[http2]==0.27.0`.
pub fn validate_package_spec(spec: &str) -> Result<(), DependencyError> {
    let reject = |reason: &str| {
        Err(DependencyError::InvalidSpecifier {
            spec: spec.to_string(),
            reason: reason.to_string(),
        })
    };

    if spec.is_empty() {
        return reject("specifier is empty");
    }
    if spec.starts_with('-') {
        return reject("specifier must not start with '-'");
    }
    if spec.contains("..") {
        return reject("specifier must not contain '..'");
    }
    if spec.contains("--") {
        return reject("specifier must not contain '--'");
    }
    if !SPEC_CHARSET.is_match(spec) {
        return reject(
            "only letters, digits, '_', '.', '-' and version constraints ([ ] ! = < > ,) are allowed",
        );
    }
    if package_name(spec).is_empty() {
        return reject("specifier has no package name");
    }
    Ok(())
}

/// Validate every specifier, failing on the first offender.
pub fn validate_package_specs<S: AsRef<str>>(specs: &[S]) -> Result<(), DependencyError> {
    specs
        .iter()
        .try_for_each(|spec| validate_package_spec(spec.as_ref()))
}

/// Bare package name with extras and version constraints removed.
pub fn package_name(spec: &str) -> &str {
    spec.split(CONSTRAINT_CHARS).next().unwrap_or(spec).trim()
}
