//! Host-side model of the confinement policy.
//!
//! The same boundary rule is rendered into the guest shim; this type owns
//! root normalization and lets the host reason about paths with identical
//! semantics.

use std::path::{MAIN_SEPARATOR, Path};

use codebox_commons::{canonicalize_allow_missing, strip_trailing_separators};
use serde::Serialize;

use crate::error::{ExecError, ExecResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfinementPolicy {
    roots: Vec<String>,
    case_insensitive: bool,
}

impl ConfinementPolicy {
    /// Build a policy from absolute directory roots. Each root is
    /// symlink-resolved, stripped of trailing separators and, on
    /// case-insensitive filesystems, lower-cased. Duplicates are dropped
    /// while keeping first-seen order.
    pub fn new<I, P>(roots: I, case_insensitive: bool) -> ExecResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut normalized = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let resolved = canonicalize_allow_missing(root).map_err(|source| {
                ExecError::io(
                    format!("resolving confinement root `{}`", root.display()),
                    source,
                )
            })?;
            let folded = fold(&strip_trailing_separators(&resolved), case_insensitive);
            if !normalized.contains(&folded) {
                normalized.push(folded);
            }
        }
        Ok(Self {
            roots: normalized,
            case_insensitive,
        })
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// True iff the resolved `candidate` equals a root or lies below one
    /// at a separator boundary. Resolution failures deny.
    pub fn allows(&self, candidate: &Path) -> bool {
        let Ok(resolved) = canonicalize_allow_missing(candidate) else {
            return false;
        };
        let folded = fold(&strip_trailing_separators(&resolved), self.case_insensitive);
        self.roots.iter().any(|root| within_root(root, &folded))
    }

    /// Like [`ConfinementPolicy::allows`], as an error for the host's own
    /// paths.
    pub fn require(&self, path: &Path) -> ExecResult<()> {
        if self.allows(path) {
            Ok(())
        } else {
            Err(ExecError::Confinement {
                path: path.to_path_buf(),
            })
        }
    }
}

fn fold(path: &Path, case_insensitive: bool) -> String {
    let text = path.to_string_lossy();
    if case_insensitive {
        text.to_lowercase()
    } else {
        text.into_owned()
    }
}

/// Boundary rule: equal, or prefixed by `root` followed by a separator.
pub(crate) fn within_root(root: &str, candidate: &str) -> bool {
    if candidate == root {
        return true;
    }
    let Some(rest) = candidate.strip_prefix(root) else {
        return false;
    };
    // A bare filesystem root already ends in a separator.
    root.ends_with(MAIN_SEPARATOR) || rest.starts_with(MAIN_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn boundary_rule_requires_separator() {
        assert!(within_root("/tmp/x", "/tmp/x"));
        assert!(within_root("/tmp/x", "/tmp/x/file.txt"));
        assert!(within_root("/tmp/x", "/tmp/x/a/b"));
        assert!(!within_root("/tmp/x", "/tmp/xyz"));
        assert!(!within_root("/tmp/x", "/tmp/x.bak/file"));
        assert!(!within_root("/tmp/x", "/tmp"));
    }

    #[cfg(unix)]
    #[test]
    fn filesystem_root_allows_everything_below() {
        assert!(within_root("/", "/etc/passwd"));
    }

    #[test]
    fn allows_paths_inside_roots_only() {
        let work = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let policy = ConfinementPolicy::new([work.path(), scratch.path()], false).unwrap();

        assert!(policy.allows(work.path()));
        assert!(policy.allows(&work.path().join("new.txt")));
        assert!(policy.allows(&scratch.path().join("deps").join("pkg")));
        assert!(!policy.allows(&work.path().join("..").join("outside")));
        assert!(!policy.allows(Path::new("relative.txt")));

        let sibling = PathBuf::from(format!("{}xyz", work.path().display()));
        assert!(!policy.allows(&sibling));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_escaping_a_root_are_denied() {
        let work = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), work.path().join("escape")).unwrap();

        let policy = ConfinementPolicy::new([work.path()], false).unwrap();
        assert!(!policy.allows(&work.path().join("escape").join("secret.txt")));
    }

    #[test]
    fn require_names_the_rejected_path() {
        let work = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let policy = ConfinementPolicy::new([work.path()], false).unwrap();

        policy.require(&work.path().join("__codebox_main__.py")).unwrap();
        let err = policy.require(outside.path()).unwrap_err();
        assert!(matches!(err, ExecError::Confinement { ref path } if path == outside.path()));
        assert!(err.to_string().contains("outside the confinement roots"));
    }

    #[test]
    fn case_insensitive_roots_are_folded() {
        let work = tempfile::tempdir().unwrap();
        let policy = ConfinementPolicy::new([work.path()], true).unwrap();
        let root = &policy.roots()[0];
        assert_eq!(root, &root.to_lowercase());
    }

    #[test]
    fn duplicate_roots_collapse() {
        let work = tempfile::tempdir().unwrap();
        let policy =
            ConfinementPolicy::new([work.path().to_path_buf(), work.path().join(".")], false)
                .unwrap();
        assert_eq!(policy.roots().len(), 1);
    }
}
