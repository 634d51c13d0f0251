//! Workspace support for monorepos.
//!
//! Expands the glob patterns of the `workspaces` field in package.json into
//! the directories of the workspace packages.

use super::error::PkgError;
use super::manifest::Manifest;
use super::root::MANIFEST_NAME;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// List the workspace package directories declared by the manifest in `cwd`.
///
/// Returns absolute paths, deduplicated and sorted. Patterns that match nothing
/// and directories without a package.json are skipped.
///
/// # Errors
/// Returns `PkgError` if the manifest in `cwd` is missing or invalid.
pub fn workspaces(cwd: &Path) -> Result<Vec<PathBuf>, PkgError> {
    let manifest = Manifest::read(&cwd.join(MANIFEST_NAME))?;
    let patterns = manifest.workspace_patterns();
    if patterns.is_empty() {
        return Ok(Vec::new());
    }

    Ok(expand_patterns(cwd, &patterns).into_iter().collect())
}

/// Expand glob patterns relative to `root` into workspace directories.
fn expand_patterns(root: &Path, patterns: &[String]) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    // `[`, `*` and `?` in the project path are literal
    let escaped_root = PathBuf::from(glob::Pattern::escape(&root.to_string_lossy()));

    for pattern in patterns {
        let full_pattern = escaped_root.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let entries = match glob::glob(&pattern_str) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "ignoring invalid workspace pattern");
                continue;
            }
        };

        for entry in entries.flatten() {
            if is_workspace_package(&entry) {
                dirs.insert(entry);
            } else {
                debug!(path = %entry.display(), "not a workspace package");
            }
        }
    }

    dirs
}

fn is_workspace_package(dir: &Path) -> bool {
    dir.is_dir() && dir.join(MANIFEST_NAME).is_file()
}
