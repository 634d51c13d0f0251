//! Package manager functionality.
//!
//! Provides:
//! - One [`PackageManager`] trait with npm, yarn classic and yarn berry adapters
//! - Detection of the package manager in charge of a directory
//! - Package root discovery and workspace expansion
//! - Process execution with streamed, captured output
//! - Dependency overrides (npm lockfile patching, yarn `resolutions`)
//! - Version lookups against the npm registry

pub mod detect;
pub mod error;
pub mod exec;
pub mod lockfile;
pub mod manager;
pub mod manifest;
pub mod npm;
pub mod options;
pub mod registry;
pub mod root;
#[cfg(test)]
pub(crate) mod testing;
pub mod workspaces;
pub mod yarn;
pub mod yarn_berry;
pub mod yarn_classic;

pub use detect::{
    create, create_with_session, detect_package_manager, detect_with_session, DetectOptions,
};
pub use error::{codes as pkg_codes, PkgError};
pub use exec::{
    CommandResult, CommandRunner, Invocation, OutputSink, OutputSinks, ProcessOutcome,
    ProcessRunner, Session,
};
pub use lockfile::{LockfileVersion, NpmLockfile, LOCKFILE_NAME};
pub use manager::{PackageManager, PackageManagerKind};
pub use manifest::Manifest;
pub use npm::Npm;
pub use options::{DependencyType, InstallOptions, PackOptions, UninstallOptions, UpdateOptions};
pub use registry::{
    DependencyResolver, RegistryClient, ResolvedDependency, DEFAULT_REGISTRY, REGISTRY_ENV,
};
pub use root::{find_root, MANIFEST_NAME};
pub use workspaces::workspaces;
pub use yarn::LOCKFILE_NAME as YARN_LOCKFILE_NAME;
pub use yarn_berry::YarnBerry;
pub use yarn_classic::YarnClassic;
