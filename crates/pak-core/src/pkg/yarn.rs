//! Pieces shared by the yarn classic and yarn berry adapters.

use super::error::PkgError;
use super::exec::CommandResult;
use super::manager::PackageManager;
use super::manifest::Manifest;
use super::options::InstallOptions;
use super::root::MANIFEST_NAME;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Lockfile filename.
pub const LOCKFILE_NAME: &str = "yarn.lock";

pub(crate) const PROGRAM: &str = "yarn";

/// Override through the root manifest's `resolutions` block, then reinstall.
pub(crate) async fn override_with_resolutions(
    manager: &(impl PackageManager + ?Sized),
    dependencies: &BTreeMap<String, String>,
) -> CommandResult {
    let root = match manager.find_root(Some(LOCKFILE_NAME)) {
        Ok(root) => root,
        Err(e) => return CommandResult::fail(format!("Error updating root package.json: {e}")),
    };

    if let Err(e) = pin_resolutions(&root, dependencies) {
        return CommandResult::fail(format!(
            "Error updating root package.json: {}",
            e.message()
        ));
    }
    info!(root = %root.display(), count = dependencies.len(), "pinned resolutions");

    manager
        .relocate(root)
        .install(&[], &InstallOptions::default())
        .await
}

fn pin_resolutions(root: &Path, dependencies: &BTreeMap<String, String>) -> Result<(), PkgError> {
    let mut manifest = Manifest::read(&root.join(MANIFEST_NAME))?;
    manifest.merge_resolutions(dependencies);
    manifest.write()
}
