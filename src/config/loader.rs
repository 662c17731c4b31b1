use crate::config::schema::{PatchSet, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read patch set {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot scan {} for patch sets: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("patch set{} is not valid TOML: {source}", origin(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("patch set{} rejected, check replacement(s) {}:\n{source}", origin(.path), .source.replacement_ids().join(", "))]
    Invalid {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}

fn parse(input: &str, path: Option<&Path>) -> Result<PatchSet, ConfigError> {
    let path = path.map(Path::to_path_buf);
    let set: PatchSet = match toml_edit::de::from_str(input) {
        Ok(set) => set,
        Err(source) => return Err(ConfigError::Parse { path, source }),
    };
    match set.validate() {
        Ok(()) => Ok(set),
        Err(source) => Err(ConfigError::Invalid { path, source }),
    }
}

pub fn load_from_str(input: &str) -> Result<PatchSet, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchSet, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}

/// List the `*.toml` files directly inside `dir`, sorted by path.
///
/// Sorting gives a stable application order when several patch sets
/// target the same file.
pub fn discover_patch_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}
