//! The package-manager abstraction.

use super::error::PkgError;
use super::exec::{CommandResult, Session};
use super::options::{InstallOptions, PackOptions, UninstallOptions, UpdateOptions};
use super::root;
use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// The supported package managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageManagerKind {
    Npm,
    YarnClassic,
    YarnBerry,
}

impl PackageManagerKind {
    /// Detection order.
    pub const ALL: [Self; 3] = [Self::Npm, Self::YarnClassic, Self::YarnBerry];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::YarnClassic => "yarn-classic",
            Self::YarnBerry => "yarn-berry",
        }
    }

    /// Executable name.
    #[must_use]
    pub fn program(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::YarnClassic | Self::YarnBerry => "yarn",
        }
    }

    /// Lockfile that marks a project managed by this package manager.
    #[must_use]
    pub fn lockfile_name(&self) -> &'static str {
        match self {
            Self::Npm => super::lockfile::LOCKFILE_NAME,
            Self::YarnClassic | Self::YarnBerry => super::yarn::LOCKFILE_NAME,
        }
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(Self::Npm),
            "yarn-classic" | "yarn1" => Ok(Self::YarnClassic),
            "yarn-berry" | "berry" => Ok(Self::YarnBerry),
            other => Err(format!(
                "unknown package manager '{other}' (expected npm, yarn-classic or yarn-berry)"
            )),
        }
    }
}

/// Uniform interface over npm, yarn classic and yarn berry.
///
/// Adapters never change their working directory. Operations that must run
/// elsewhere build a relocated copy via [`PackageManager::relocate`].
/// Recoverable failures come back as an unsuccessful [`CommandResult`];
/// [`Error`] is reserved for misuse.
#[async_trait]
pub trait PackageManager: Send + Sync + fmt::Debug {
    fn kind(&self) -> PackageManagerKind;

    /// Shared configuration, runner and output sinks.
    fn session(&self) -> &Session;

    /// The same adapter rooted at `cwd`.
    fn relocate(&self, cwd: PathBuf) -> Box<dyn PackageManager>;

    fn cwd(&self) -> &Path {
        self.session().cwd()
    }

    /// Whether this package manager manages the project around `cwd`.
    ///
    /// Returns the package root on success. Any failure along the way,
    /// including a missing binary, yields `None`.
    async fn detect(&self, require_lockfile: bool) -> Option<PathBuf>;

    /// Install `packages`, or all dependencies of the project when empty.
    async fn install(&self, packages: &[String], options: &InstallOptions) -> CommandResult;

    async fn uninstall(&self, packages: &[String], options: &UninstallOptions) -> CommandResult;

    /// Update `packages` (or everything), rewriting manifest ranges.
    async fn update(&self, packages: &[String], options: &UpdateOptions) -> CommandResult;

    /// Rebuild native modules.
    async fn rebuild(&self, packages: &[String]) -> CommandResult;

    /// Pack a workspace into a tarball. On success `stdout` is the tarball's path.
    async fn pack(&self, options: &PackOptions) -> CommandResult;

    /// Version of the package-manager binary.
    ///
    /// # Errors
    /// Returns [`Error::VersionUnknown`] if `<bin> -v` fails.
    async fn version(&self) -> Result<String, Error>;

    /// Force the given packages (name -> exact version) everywhere in the
    /// dependency tree and reinstall.
    async fn override_dependencies(&self, dependencies: &BTreeMap<String, String>)
        -> CommandResult;

    /// Find the package root above `cwd`, optionally requiring a lockfile.
    ///
    /// # Errors
    /// Returns [`Error::ProjectNotFound`] when no matching directory exists.
    fn find_root(&self, lockfile: Option<&str>) -> Result<PathBuf, Error> {
        root::find_root(self.cwd(), lockfile)
    }

    /// Workspace package directories of the project in `cwd`.
    ///
    /// # Errors
    /// Returns `PkgError` if the manifest in `cwd` is missing or invalid.
    fn workspaces(&self) -> Result<Vec<PathBuf>, PkgError> {
        super::workspaces::workspaces(self.cwd())
    }
}

/// Run `<program> -v` and return the trimmed version.
pub(crate) async fn program_version(session: &Session, kind: PackageManagerKind) -> Result<String, Error> {
    let result = session.exec(kind.program(), &["-v".to_string()]).await;
    if !result.success {
        return Err(Error::VersionUnknown {
            manager: kind.program(),
            stderr: result.stderr,
            exit_code: result.exit_code,
        });
    }
    Ok(result.stdout.trim().to_string())
}

/// Shared detection: locate the root, then ask the binary whether it is the right flavor.
pub(crate) async fn detect_root(
    manager: &(impl PackageManager + ?Sized),
    require_lockfile: bool,
    accepts_version: impl Fn(&str) -> bool + Send,
) -> Option<PathBuf> {
    let kind = manager.kind();
    let lockfile = require_lockfile.then(|| kind.lockfile_name());
    let root = match manager.find_root(lockfile) {
        Ok(root) => root,
        Err(e) => {
            debug!(manager = %kind, error = %e, "no package root");
            return None;
        }
    };

    match manager.version().await {
        Ok(version) if accepts_version(&version) => Some(root),
        Ok(version) => {
            debug!(manager = %kind, %version, "version does not match");
            None
        }
        Err(e) => {
            debug!(manager = %kind, error = %e, "version check failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in PackageManagerKind::ALL {
            assert_eq!(kind.as_str().parse::<PackageManagerKind>(), Ok(kind));
        }
        assert!("pnpm".parse::<PackageManagerKind>().is_err());
    }

    #[test]
    fn test_kind_program_and_lockfile() {
        assert_eq!(PackageManagerKind::Npm.program(), "npm");
        assert_eq!(PackageManagerKind::YarnBerry.program(), "yarn");
        assert_eq!(PackageManagerKind::Npm.lockfile_name(), "package-lock.json");
        assert_eq!(PackageManagerKind::YarnClassic.lockfile_name(), "yarn.lock");
    }
}
