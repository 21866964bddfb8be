//! Working-directory resolution and the per-request scratch directory.
//!
//! Precedence: an explicit `target_directory` overrides the directory the
//! workspace mode would produce. The mode only decides the default when no
//! target is given, and is not consulted (nothing is created for it)
//! otherwise.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use codebox_commons::{normalize_path, relative_within};
use codebox_config::WorkspaceConfig;
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

use crate::error::{ExecError, ExecResult, WorkspaceError};
use crate::request::WorkspaceMode;

const SCRATCH_PREFIX: &str = "codebox-";
const DEPS_DIR_NAME: &str = "deps";
const SCRIPT_FILE_NAME: &str = "__codebox_main__.py";

/// Per-request temporary directory, removed on every exit path.
///
/// [`ScratchDir::cleanup`] is idempotent and never fails; dropping the
/// guard performs the same cleanup if it has not run yet.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl ScratchDir {
    pub fn create() -> ExecResult<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(parent: &Path) -> ExecResult<Self> {
        let dir = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|source| ExecError::Workspace(WorkspaceError::from_io(parent, source)))?;
        // On failure the TempDir guard removes the directory as it drops.
        let path = dunce::canonicalize(dir.path()).map_err(|source| {
            ExecError::Workspace(WorkspaceError::from_io(dir.path(), source))
        })?;
        debug!(scratch = %path.display(), "created scratch directory");
        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Isolated install target for dependencies.
    pub fn deps_dir(&self) -> PathBuf {
        self.path.join(DEPS_DIR_NAME)
    }

    /// Location of the generated guest script.
    pub fn script_path(&self) -> PathBuf {
        self.path.join(SCRIPT_FILE_NAME)
    }

    pub fn is_removed(&self) -> bool {
        self.dir.is_none()
    }

    pub fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => debug!(scratch = %self.path.display(), "removed scratch directory"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => warn!(
                scratch = %self.path.display(),
                %error,
                "failed to remove scratch directory"
            ),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    persistent_root: PathBuf,
    invocation_dir: PathBuf,
}

impl WorkspaceResolver {
    pub fn new(persistent_root: impl Into<PathBuf>, invocation_dir: impl Into<PathBuf>) -> Self {
        Self {
            persistent_root: persistent_root.into(),
            invocation_dir: invocation_dir.into(),
        }
    }

    /// Resolver rooted at the process's current directory.
    pub fn from_config(config: &WorkspaceConfig) -> ExecResult<Self> {
        let invocation_dir = std::env::current_dir()
            .map_err(|source| ExecError::io("reading the invocation directory", source))?;
        Ok(Self::new(config.persistent_dir(), invocation_dir))
    }

    pub fn persistent_root(&self) -> &Path {
        &self.persistent_root
    }

    pub fn invocation_dir(&self) -> &Path {
        &self.invocation_dir
    }

    /// Return the absolute, symlink-resolved working directory.
    ///
    /// On failure the scratch directory is removed before the error is
    /// returned.
    pub fn resolve(
        &self,
        mode: &WorkspaceMode,
        target_directory: Option<&Path>,
        scratch: &mut ScratchDir,
    ) -> Result<PathBuf, WorkspaceError> {
        let resolved = match target_directory {
            Some(target) => self.resolve_target(target),
            None => self.resolve_mode(mode, scratch.path()),
        }
        .and_then(|dir| verify_directory(&dir));

        match resolved {
            Ok(dir) => {
                debug!(
                    workspace = %dir.display(),
                    mode = %mode.label(),
                    explicit_target = target_directory.is_some(),
                    "resolved working directory"
                );
                Ok(dir)
            }
            Err(error) => {
                scratch.cleanup();
                Err(error)
            }
        }
    }

    fn resolve_mode(&self, mode: &WorkspaceMode, scratch: &Path) -> Result<PathBuf, WorkspaceError> {
        match mode {
            WorkspaceMode::Ephemeral => Ok(scratch.to_path_buf()),
            WorkspaceMode::Persistent => {
                ensure_directory(&self.persistent_root)?;
                Ok(self.persistent_root.clone())
            }
            WorkspaceMode::Custom(path) => {
                let dir = self.anchor(path)?;
                ensure_directory(&dir)?;
                Ok(dir)
            }
        }
    }

    /// Explicit targets must already exist.
    fn resolve_target(&self, target: &Path) -> Result<PathBuf, WorkspaceError> {
        let dir = self.anchor(target)?;
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(WorkspaceError::NotADirectory { path: dir }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(WorkspaceError::NotFound { path: dir })
            }
            Err(error) => Err(WorkspaceError::from_io(dir, error)),
        }
    }

    /// Absolute paths are normalized and trusted; relative ones must stay
    /// inside the invocation directory.
    fn anchor(&self, path: &Path) -> Result<PathBuf, WorkspaceError> {
        if path.is_absolute() {
            return Ok(normalize_path(path));
        }
        relative_within(&self.invocation_dir, path).ok_or_else(|| WorkspaceError::EscapesBase {
            requested: path.to_path_buf(),
            base: self.invocation_dir.clone(),
        })
    }
}

fn ensure_directory(path: &Path) -> Result<(), WorkspaceError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(WorkspaceError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(WorkspaceError::from_io(path, error)),
    }
    fs::create_dir_all(path).map_err(|error| WorkspaceError::from_io(path, error))?;
    debug!(workspace = %path.display(), "created workspace directory");
    Ok(())
}

fn verify_directory(path: &Path) -> Result<PathBuf, WorkspaceError> {
    let canonical = dunce::canonicalize(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => WorkspaceError::NotFound {
            path: path.to_path_buf(),
        },
        _ => WorkspaceError::from_io(path, error),
    })?;
    let meta = fs::metadata(&canonical).map_err(|error| WorkspaceError::from_io(path, error))?;
    if !meta.is_dir() {
        return Err(WorkspaceError::NotADirectory { path: canonical });
    }
    Ok(canonical)
}
