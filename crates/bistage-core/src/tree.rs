use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use bistage_domain::{RuntimeFamily, StageError};

/// Removes and recreates a family build tree so a run never inherits
/// stale output.
pub(crate) fn reset_tree(tree: &Path) -> Result<()> {
    match fs::remove_dir_all(tree) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to remove {}", tree.display()))
        }
    }
    fs::create_dir_all(tree).with_context(|| format!("failed to create {}", tree.display()))
}

/// Deletes the generated module if present and reports whether a file
/// was actually removed. Absence is success; the removal is idempotent.
pub(crate) fn remove_generated_artifact(
    family: RuntimeFamily,
    path: &Path,
) -> Result<bool, StageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(StageError::ArtifactRemoval {
            family,
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

/// Content digests of every file under a tree, keyed by path relative to
/// the tree root.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct TreeSnapshot {
    entries: BTreeMap<PathBuf, String>,
}

/// Digests a build tree. `exclude` names one relative path to leave out
/// of the snapshot, for files that are deliberately stripped.
pub(crate) fn snapshot_tree(root: &Path, exclude: Option<&Path>) -> Result<TreeSnapshot> {
    let mut entries = BTreeMap::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .with_context(|| format!("walked outside {}", root.display()))?
            .to_path_buf();
        if exclude == Some(rel.as_path()) {
            continue;
        }
        let bytes = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        entries.insert(rel, hex::encode(Sha256::digest(&bytes)));
    }
    Ok(TreeSnapshot { entries })
}

/// Relative paths that were added, removed, or rewritten between two
/// snapshots, sorted for stable reporting.
pub(crate) fn diff_snapshots(previous: &TreeSnapshot, current: &TreeSnapshot) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for (path, digest) in &current.entries {
        match previous.entries.get(path) {
            Some(existing) if existing == digest => {}
            _ => paths.push(path.clone()),
        }
    }
    for path in previous.entries.keys() {
        if !current.entries.contains_key(path) {
            paths.push(path.clone());
        }
    }
    paths.sort();
    paths
}
