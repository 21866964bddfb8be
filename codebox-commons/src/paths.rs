use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use url::Url;

/// Normalize a path by resolving `.` and `..` components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Rebuild a path from its components, which drops trailing separators
/// (`/tmp/x/` becomes `/tmp/x`) while keeping a bare root intact.
pub fn strip_trailing_separators(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Resolve symlinks for an absolute path whose tail may not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing
/// remainder is appended lexically. Missing components cannot be
/// symlinks, so a `..` inside the remainder only cancels a missing part.
pub fn canonicalize_allow_missing(path: &Path) -> io::Result<PathBuf> {
    if !path.is_absolute() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path `{}` is not absolute", path.display()),
        ));
    }

    let mut existing = path.to_path_buf();
    let mut missing: Vec<std::ffi::OsString> = Vec::new();
    loop {
        match fs::symlink_metadata(&existing) {
            Ok(_) => break,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name().map(|name| name.to_os_string()) else {
                    return Err(error);
                };
                missing.push(name);
                if !existing.pop() {
                    return Err(error);
                }
            }
            Err(error) => return Err(error),
        }
    }

    let mut resolved = dunce::canonicalize(&existing)?;
    for part in missing.iter().rev() {
        resolved.push(part);
    }
    Ok(normalize_path(&resolved))
}

/// Join `candidate` onto `base` and return the lexically normalized result
/// only when it stays inside `base`.
///
/// Absolute candidates and candidates whose normalized form walks above
/// `base` are rejected.
pub fn relative_within(base: &Path, candidate: &Path) -> Option<PathBuf> {
    if candidate.is_absolute() || candidate.has_root() {
        return None;
    }

    let base = normalize_path(base);
    let resolved = normalize_path(&base.join(candidate));
    let relative = resolved.strip_prefix(&base).ok()?;

    let escapes = matches!(
        relative.components().next(),
        Some(Component::ParentDir | Component::RootDir | Component::Prefix(_))
    );
    if escapes || relative.is_absolute() {
        return None;
    }
    Some(resolved)
}

/// Render an absolute path as a `file://` URI with forward slashes.
pub fn file_uri(path: &Path) -> String {
    match Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => {
            let display = path.display().to_string().replace('\\', "/");
            if display.starts_with('/') {
                format!("file://{display}")
            } else {
                format!("file:///{display}")
            }
        }
    }
}

/// Probe whether the filesystem hosting `dir` folds case.
///
/// Creates a short-lived mixed-case file and checks whether its lower-cased
/// name resolves. Falls back to the platform default when the probe cannot
/// run.
pub fn is_case_insensitive_dir(dir: &Path) -> bool {
    let platform_default = cfg!(any(windows, target_os = "macos"));
    let probe_name = format!("CodeboxCaseProbe-{}", uuid::Uuid::new_v4().simple());
    let probe = dir.join(&probe_name);

    if let Err(error) = fs::write(&probe, b"") {
        warn!(
            dir = %dir.display(),
            %error,
            "case-sensitivity probe failed; using platform default"
        );
        return platform_default;
    }

    let folded = fs::symlink_metadata(dir.join(probe_name.to_lowercase())).is_ok();
    if let Err(error) = fs::remove_file(&probe) {
        debug!(probe = %probe.display(), %error, "failed to remove case probe");
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_resolves_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/tmp/a/./b/../c")),
            PathBuf::from("/tmp/a/c")
        );
    }

    #[test]
    fn trailing_separators_are_dropped() {
        assert_eq!(
            strip_trailing_separators(Path::new("/tmp/x/")),
            PathBuf::from("/tmp/x")
        );
        assert_eq!(strip_trailing_separators(Path::new("/")), PathBuf::from("/"));
    }

    #[test]
    fn relative_within_accepts_nested_paths() {
        let base = Path::new("/srv/invocation");
        assert_eq!(
            relative_within(base, Path::new("jobs/./one")),
            Some(PathBuf::from("/srv/invocation/jobs/one"))
        );
        assert_eq!(
            relative_within(base, Path::new("jobs/../two")),
            Some(PathBuf::from("/srv/invocation/two"))
        );
    }

    #[test]
    fn relative_within_rejects_escapes() {
        let base = Path::new("/srv/invocation");
        assert_eq!(relative_within(base, Path::new("../elsewhere")), None);
        assert_eq!(relative_within(base, Path::new("a/../../b")), None);
        assert_eq!(relative_within(base, Path::new("/etc")), None);
    }

    #[test]
    fn canonicalize_allow_missing_keeps_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let candidate = root.join("not").join("there.txt");
        assert_eq!(canonicalize_allow_missing(&candidate).unwrap(), candidate);
    }

    #[cfg(unix)]
    #[test]
    fn canonicalize_allow_missing_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let target = root.join("target");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

        let resolved = canonicalize_allow_missing(&root.join("link").join("file")).unwrap();
        assert_eq!(resolved, target.join("file"));
    }

    #[test]
    fn canonicalize_allow_missing_rejects_relative() {
        assert!(canonicalize_allow_missing(Path::new("relative/path")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn file_uri_uses_forward_slashes() {
        assert_eq!(file_uri(Path::new("/tmp/work dir")), "file:///tmp/work%20dir");
    }

    #[test]
    fn case_probe_cleans_up_after_itself() {
        let dir = tempfile::tempdir().unwrap();
        let _ = is_case_insensitive_dir(dir.path());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
