//! Building and detecting package-manager adapters.

use super::exec::Session;
use super::manager::{PackageManager, PackageManagerKind};
use super::npm::Npm;
use super::yarn_berry::YarnBerry;
use super::yarn_classic::YarnClassic;
use crate::config::Config;
use crate::error::Error;
use tracing::{debug, info};

/// Options for [`detect_package_manager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    /// Only accept a package manager whose lockfile sits next to the manifest.
    pub require_lockfile: bool,
    /// Return the adapter rooted at the package root instead of the original cwd.
    pub set_cwd_to_package_root: bool,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            require_lockfile: true,
            set_cwd_to_package_root: false,
        }
    }
}

impl DetectOptions {
    #[must_use]
    pub fn with_require_lockfile(mut self, require: bool) -> Self {
        self.require_lockfile = require;
        self
    }

    #[must_use]
    pub fn with_set_cwd_to_package_root(mut self, set: bool) -> Self {
        self.set_cwd_to_package_root = set;
        self
    }
}

/// Build an adapter of the given kind.
#[must_use]
pub fn create(kind: PackageManagerKind, config: Config) -> Box<dyn PackageManager> {
    create_with_session(kind, Session::new(config))
}

/// Build an adapter of the given kind around an existing session.
#[must_use]
pub fn create_with_session(kind: PackageManagerKind, session: Session) -> Box<dyn PackageManager> {
    match kind {
        PackageManagerKind::Npm => Box::new(Npm::with_session(session)),
        PackageManagerKind::YarnClassic => Box::new(YarnClassic::with_session(session)),
        PackageManagerKind::YarnBerry => Box::new(YarnBerry::with_session(session)),
    }
}

/// Find the package manager in charge of the project around `config.cwd`.
///
/// # Errors
/// Returns [`Error::NoPackageManager`] if no adapter accepts the directory.
pub async fn detect_package_manager(
    config: Config,
    options: DetectOptions,
) -> Result<Box<dyn PackageManager>, Error> {
    detect_with_session(Session::new(config), options).await
}

/// [`detect_package_manager`] with a preconfigured session.
///
/// # Errors
/// Returns [`Error::NoPackageManager`] if no adapter accepts the directory.
pub async fn detect_with_session(
    session: Session,
    options: DetectOptions,
) -> Result<Box<dyn PackageManager>, Error> {
    for kind in PackageManagerKind::ALL {
        let manager = create_with_session(kind, session.clone());
        let Some(root) = manager.detect(options.require_lockfile).await else {
            debug!(manager = %kind, "not detected");
            continue;
        };

        info!(manager = %kind, root = %root.display(), "detected package manager");
        if options.set_cwd_to_package_root {
            return Ok(manager.relocate(root));
        }
        return Ok(manager);
    }

    Err(Error::NoPackageManager {
        start: session.cwd().to_path_buf(),
    })
}
