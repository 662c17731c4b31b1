//! Sequential literal patching of a single file.
//!
//! A [`Patcher`] reads the whole target as text, runs each [`Replacement`] in
//! order against the output of the previous one, and writes the result back
//! to the same path. A replacement whose search text is absent is skipped,
//! not treated as an error, and the file is rewritten even when nothing
//! matched.

use crate::builtin;
use crate::config::PatchSet;
use crate::replace::{ReplaceOutcome, Replacement};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Replacements not found in {file}: {}", .ids.join(", "))]
    Unmatched { file: PathBuf, ids: Vec<String> },
}

/// Outcome of one replacement within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub id: String,
    #[serde(flatten)]
    pub outcome: ReplaceOutcome,
}

/// Summary of a patch run against one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "PatchReport should be checked for skipped replacements"]
pub struct PatchReport {
    pub file: PathBuf,
    pub steps: Vec<StepReport>,
    pub bytes_before: usize,
    pub bytes_after: usize,
    /// xxh3-64 of the content before patching, hex encoded
    pub hash_before: String,
    pub hash_after: String,
    /// False for dry runs
    pub written: bool,
    #[serde(skip)]
    original: String,
    #[serde(skip)]
    patched: String,
}

impl PatchReport {
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    pub fn applied_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_replaced()).count()
    }

    /// Ids of replacements whose search text was not present.
    pub fn skipped_ids(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| !s.outcome.is_replaced())
            .map(|s| s.id.as_str())
            .collect()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn patched(&self) -> &str {
        &self.patched
    }
}

#[derive(Debug, Clone)]
pub struct Patcher {
    replacements: Vec<Replacement>,
    strict: bool,
}

impl Patcher {
    pub fn new(replacements: Vec<Replacement>) -> Self {
        Self {
            replacements,
            strict: false,
        }
    }

    /// Patcher for the built-in tool output replacements.
    pub fn builtin() -> Self {
        Self::new(builtin::replacements())
    }

    pub fn from_patch_set(set: &PatchSet) -> Self {
        Self::new(set.replacements())
    }

    /// In strict mode a missing search text fails the run before anything is written.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Run every replacement over `content` in order, without touching the filesystem.
    pub fn apply_to_str(&self, content: &str) -> (String, Vec<StepReport>) {
        let mut current = content.to_string();
        let mut steps = Vec::with_capacity(self.replacements.len());

        for replacement in &self.replacements {
            let (next, outcome) = replacement.apply(&current);
            match outcome {
                ReplaceOutcome::Replaced { occurrences } => {
                    debug!(id = %replacement.id, occurrences, "replacement applied");
                }
                ReplaceOutcome::NotFound => {
                    warn!(id = %replacement.id, "search text not found, skipping");
                }
            }
            current = next;
            steps.push(StepReport {
                id: replacement.id.clone(),
                outcome,
            });
        }

        (current, steps)
    }

    /// Patch `path` in place.
    ///
    /// The file is rewritten unconditionally, even when no replacement matched.
    pub fn patch(&self, path: impl AsRef<Path>) -> Result<PatchReport, PatchError> {
        self.run(path.as_ref(), true)
    }

    /// Compute the report for `path` without writing anything.
    pub fn check(&self, path: impl AsRef<Path>) -> Result<PatchReport, PatchError> {
        self.run(path.as_ref(), false)
    }

    fn run(&self, path: &Path, write: bool) -> Result<PatchReport, PatchError> {
        let io_err = |source: std::io::Error| PatchError::Io {
            path: path.to_path_buf(),
            source,
        };

        let original = fs::read_to_string(path).map_err(io_err)?;
        debug!(file = %path.display(), bytes = original.len(), "read target");

        let (patched, steps) = self.apply_to_str(&original);

        if self.strict {
            let ids: Vec<String> = steps
                .iter()
                .filter(|s| !s.outcome.is_replaced())
                .map(|s| s.id.clone())
                .collect();
            if !ids.is_empty() {
                return Err(PatchError::Unmatched {
                    file: path.to_path_buf(),
                    ids,
                });
            }
        }

        if write {
            write_in_place(path, patched.as_bytes()).map_err(io_err)?;
            debug!(file = %path.display(), bytes = patched.len(), "wrote target");
        }

        Ok(PatchReport {
            file: path.to_path_buf(),
            steps,
            bytes_before: original.len(),
            bytes_after: patched.len(),
            hash_before: fingerprint(&original),
            hash_after: fingerprint(&patched),
            written: write,
            original,
            patched,
        })
    }
}

fn fingerprint(text: &str) -> String {
    format!("{:016x}", xxh3_64(text.as_bytes()))
}

/// Overwrite `path` in place.
///
/// Opening the existing file for writing is what enforces its permissions,
/// and the inode, owner and hard links stay as they were. A crash mid-write
/// can leave the file truncated.
fn write_in_place(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).truncate(true).open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    fn sample_patcher() -> Patcher {
        Patcher::new(vec![
            Replacement::new("first", "alpha", "ALPHA"),
            Replacement::new("second", "beta", "BETA"),
        ])
    }

    #[test]
    fn test_apply_to_str_sequential() {
        // Second step sees the first step's output
        let patcher = Patcher::new(vec![
            Replacement::new("a", "one", "two"),
            Replacement::new("b", "two", "three"),
        ]);
        let (out, steps) = patcher.apply_to_str("one");
        assert_eq!(out, "three");
        assert!(steps.iter().all(|s| s.outcome.is_replaced()));
    }

    #[test]
    fn test_apply_to_str_skips_missing() {
        let (out, steps) = sample_patcher().apply_to_str("alpha gamma");
        assert_eq!(out, "ALPHA gamma");
        assert_eq!(steps[0].outcome, ReplaceOutcome::Replaced { occurrences: 1 });
        assert_eq!(steps[1].outcome, ReplaceOutcome::NotFound);
    }

    #[test]
    fn test_patch_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha beta").unwrap();

        let report = sample_patcher().patch(&file).unwrap();
        assert!(report.written);
        assert!(report.changed());
        assert_eq!(report.applied_count(), 2);
        assert_eq!(fs::read_to_string(&file).unwrap(), "ALPHA BETA");
    }

    #[test]
    fn test_patch_rewrites_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "gamma").unwrap();
        let stale = FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&file, stale).unwrap();

        let report = sample_patcher().patch(&file).unwrap();
        assert!(report.written);
        assert!(!report.changed());
        assert_eq!(report.hash_before, report.hash_after);
        assert_eq!(report.skipped_ids(), vec!["first", "second"]);
        assert_eq!(fs::read_to_string(&file).unwrap(), "gamma");

        let mtime = FileTime::from_last_modification_time(&fs::metadata(&file).unwrap());
        assert!(mtime > stale, "unchanged content must still be written back");
    }

    #[test]
    fn test_check_leaves_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha").unwrap();
        let stale = FileTime::from_unix_time(1_000_000, 0);
        filetime::set_file_mtime(&file, stale).unwrap();

        let _ = sample_patcher().check(&file).unwrap();
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&file).unwrap());
        assert_eq!(mtime, stale);
    }

    #[test]
    fn test_check_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha").unwrap();

        let report = sample_patcher().check(&file).unwrap();
        assert!(!report.written);
        assert_eq!(report.patched(), "ALPHA");
        assert_eq!(fs::read_to_string(&file).unwrap(), "alpha");
    }

    #[test]
    fn test_strict_refuses_partial_match() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha").unwrap();

        let err = sample_patcher().strict(true).patch(&file).unwrap_err();
        match err {
            PatchError::Unmatched { ids, .. } => assert_eq!(ids, vec!["second".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "alpha");
    }

    #[test]
    fn test_missing_file_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = sample_patcher()
            .patch(dir.path().join("missing.ts"))
            .unwrap_err();
        match err {
            PatchError::Io { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_permissions_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        let _ = sample_patcher().patch(&file).unwrap();
        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    #[cfg(unix)]
    fn test_read_only_target_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        fs::write(&file, "alpha").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();

        // root ignores mode bits
        if OpenOptions::new().write(true).open(&file).is_ok() {
            return;
        }

        let err = sample_patcher().patch(&file).unwrap_err();
        match err {
            PatchError::Io { path, source } => {
                assert_eq!(path, file);
                assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&file).unwrap(), "alpha");
    }

    #[test]
    #[cfg(unix)]
    fn test_writable_file_in_read_only_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let file = locked.join("route.ts");
        fs::write(&file, "alpha").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = sample_patcher().patch(&file);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let report = result.unwrap();
        assert!(report.written);
        assert_eq!(fs::read_to_string(&file).unwrap(), "ALPHA");
    }

    #[test]
    #[cfg(unix)]
    fn test_hard_link_shares_patch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("route.ts");
        let link = dir.path().join("route.link.ts");
        fs::write(&file, "alpha").unwrap();
        fs::hard_link(&file, &link).unwrap();

        let _ = sample_patcher().patch(&file).unwrap();
        assert_eq!(fs::read_to_string(&link).unwrap(), "ALPHA");
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let (_, steps) = sample_patcher().apply_to_str("beta");
        let json = serde_json::to_value(&steps).unwrap();
        assert_eq!(json[0]["id"], "first");
        assert_eq!(json[0]["status"], "not_found");
        assert_eq!(json[1]["status"], "replaced");
        assert_eq!(json[1]["occurrences"], 1);
    }
}
