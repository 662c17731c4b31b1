use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories under the workspace root that are never patch targets.
const FORBIDDEN_WORKSPACE_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Workspace safety checks to keep the patcher from writing outside the project.
#[derive(Debug, Clone)]
pub struct WorkspaceGuard {
    /// Absolute path to workspace root
    workspace_root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside workspace: {path} (workspace: {workspace})")]
    OutsideWorkspace { path: PathBuf, workspace: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to resolve {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SafetyError {
    /// The underlying filesystem error, when resolution failed.
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            SafetyError::Canonicalize { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize()
        .map_err(|source| SafetyError::Canonicalize {
            path: path.to_path_buf(),
            source,
        })
}

impl WorkspaceGuard {
    /// Create a new workspace guard with the given root.
    ///
    /// The workspace root is canonicalized to handle symlinks correctly.
    pub fn new(workspace_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;

        let mut forbidden_paths = Vec::new();

        // Toolchain and dependency caches
        if let Some(home) = home::home_dir() {
            for dir in [".cargo", ".rustup"] {
                if let Ok(path) = home.join(dir).canonicalize() {
                    forbidden_paths.push(path);
                }
            }
        }

        for dir in FORBIDDEN_WORKSPACE_DIRS {
            if let Ok(path) = workspace_root.join(dir).canonicalize() {
                forbidden_paths.push(path);
            }
        }

        Ok(Self {
            workspace_root,
            forbidden_paths,
        })
    }

    /// Check if a path is safe to patch.
    ///
    /// Relative paths resolve against the workspace root. Containment is
    /// judged on the directory holding the target: a symlinked target file is
    /// followed like a plain open would, while a symlinked directory that
    /// leaves the workspace is rejected. Returns the absolute path with its
    /// directory canonicalized. A missing file surfaces as
    /// [`SafetyError::Canonicalize`] carrying the `NotFound` I/O error.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        };

        let located = match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => canonicalize(parent)?.join(name),
            _ => canonicalize(&absolute)?,
        };
        fs::metadata(&located).map_err(|source| SafetyError::Canonicalize {
            path: absolute.clone(),
            source,
        })?;

        if !located.starts_with(&self.workspace_root) {
            return Err(SafetyError::OutsideWorkspace {
                path: located,
                workspace: self.workspace_root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if located.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: located,
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(located)
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Create a guard with custom forbidden paths (for testing).
    #[cfg(test)]
    pub fn with_forbidden(
        workspace_root: impl AsRef<Path>,
        forbidden: Vec<PathBuf>,
    ) -> Result<Self, SafetyError> {
        let workspace_root = canonicalize(workspace_root.as_ref())?;
        Ok(Self {
            workspace_root,
            forbidden_paths: forbidden,
        })
    }
}
