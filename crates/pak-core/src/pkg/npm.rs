//! npm adapter.

use super::error::{codes, PkgError};
use super::exec::{CommandResult, Session};
use super::lockfile::{NpmLockfile, LOCKFILE_NAME};
use super::manager::{program_version, PackageManager, PackageManagerKind};
use super::manifest::Manifest;
use super::options::{DependencyType, InstallOptions, PackOptions, UninstallOptions, UpdateOptions};
use super::registry::{DependencyResolver, RegistryClient, ResolvedDependency};
use super::root::MANIFEST_NAME;
use crate::config::{Config, Environment};
use crate::error::Error;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const PROGRAM: &str = "npm";

/// Whether a package spec pins an exact version, e.g. `is-odd@3.0.1`.
fn is_exact_version_spec(spec: &str) -> bool {
    static RE: OnceLock<Option<regex_lite::Regex>> = OnceLock::new();
    RE.get_or_init(|| regex_lite::Regex::new(r".+@\d+").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(spec))
}

/// npm adapter.
#[derive(Clone)]
pub struct Npm {
    session: Session,
    resolver: Option<Arc<dyn DependencyResolver>>,
}

impl fmt::Debug for Npm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Npm")
            .field("session", &self.session)
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Npm {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_session(Session::new(config))
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            resolver: None,
        }
    }

    /// Resolve override versions through `resolver` instead of the registry.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    fn relocated(&self, cwd: PathBuf) -> Self {
        Self {
            session: self.session.relocate(cwd),
            resolver: self.resolver.clone(),
        }
    }

    fn push_loglevel(&self, args: &mut Vec<String>) {
        if let Some(level) = self.session.config().loglevel {
            args.push("--loglevel".into());
            args.push(level.as_str().into());
        }
    }

    pub(crate) fn install_args(&self, packages: &[String], options: &InstallOptions) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if options.dependency_type == DependencyType::Dev {
            args.push("--save-dev".into());
        }
        if options.exact || packages.iter().any(|p| is_exact_version_spec(p)) {
            args.push("--save-exact".into());
        }
        if options.global {
            args.push("--global".into());
        }
        if options.force {
            args.push("--force".into());
        }
        self.push_loglevel(&mut args);
        args.extend(packages.iter().cloned());

        if packages.is_empty() {
            if self.session.config().environment == Environment::Production {
                args.push("--production".into());
            }
            if options.ignore_scripts {
                args.push("--ignore-scripts".into());
            }
        }

        args.extend(options.additional_args.iter().cloned());
        args
    }

    pub(crate) fn uninstall_args(&self, packages: &[String], options: &UninstallOptions) -> Vec<String> {
        let mut args = vec!["uninstall".to_string()];
        if options.dependency_type == DependencyType::Dev {
            args.push("--save-dev".into());
        }
        if options.global {
            args.push("--global".into());
        }
        self.push_loglevel(&mut args);
        args.extend(packages.iter().cloned());
        args.extend(options.additional_args.iter().cloned());
        args
    }

    pub(crate) fn update_args(&self, packages: &[String], options: &UpdateOptions) -> Vec<String> {
        let mut args = vec!["update".to_string()];
        if options.dependency_type == DependencyType::Dev {
            args.push("--save-dev".into());
        }
        if options.global {
            args.push("-g".into());
        }
        self.push_loglevel(&mut args);
        args.extend(packages.iter().cloned());
        args.extend(options.additional_args.iter().cloned());
        args
    }

    async fn command(&self, args: &[String]) -> CommandResult {
        self.session.exec(PROGRAM, args).await
    }

    fn resolver(&self) -> Result<Arc<dyn DependencyResolver>, PkgError> {
        if let Some(resolver) = &self.resolver {
            return Ok(Arc::clone(resolver));
        }
        let registry = self.session.config().registry.as_deref();
        Ok(Arc::new(RegistryClient::from_config(registry)?))
    }

    /// Look up every requested version. The first failure aborts.
    async fn resolve_overrides(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, ResolvedDependency>, PkgError> {
        let resolver = self.resolver()?;
        let mut overrides = BTreeMap::new();
        for (name, version) in dependencies {
            let resolved = resolver.resolve(name, version).await?;
            debug!(%name, version = %resolved.version, "resolved override");
            overrides.insert(name.clone(), resolved);
        }
        Ok(overrides)
    }

    /// npm 7+ writes the tarball straight into the target directory.
    async fn pack_to_destination(&self, workspace_dir: &Path, target_dir: &Path) -> CommandResult {
        let args = vec![
            "pack".to_string(),
            "--pack-destination".to_string(),
            target_dir.to_string_lossy().into_owned(),
        ];
        let result = self.session.exec_in(PROGRAM, &args, workspace_dir).await;
        if !result.success {
            return result;
        }

        let Some(file_name) = last_line(&result.stdout) else {
            return result;
        };
        let tarball = target_dir.join(file_name);
        result.with_stdout(tarball.to_string_lossy())
    }

    /// npm 6 packs into the workspace; the tarball is moved afterwards.
    async fn pack_and_move(&self, workspace_dir: &Path, target_dir: &Path) -> CommandResult {
        let manifest = match Manifest::read(&workspace_dir.join(MANIFEST_NAME)) {
            Ok(manifest) => manifest,
            Err(e) => return CommandResult::fail(e.message()),
        };
        let target_path = match manifest.tarball_file_name() {
            Ok(name) => target_dir.join(name),
            Err(e) => return CommandResult::fail(e.message()),
        };

        let result = self
            .session
            .exec_in(PROGRAM, &["pack".to_string()], workspace_dir)
            .await;
        if !result.success {
            return result;
        }

        if let Some(file_name) = last_line(&result.stdout) {
            let packed = workspace_dir.join(file_name);
            if packed != target_path {
                if let Err(e) = pak_util::fs::move_file(&packed, &target_path) {
                    return CommandResult::fail(format!(
                        "Failed to move {} to {}: {e}",
                        packed.display(),
                        target_path.display()
                    ));
                }
            }
        }

        result.with_stdout(target_path.to_string_lossy())
    }
}

fn load_error(detail: &str) -> String {
    format!("Error loading root package.json and package-lock.json: {detail}")
}

fn last_line(output: &str) -> Option<&str> {
    output.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

/// `npm pack --pack-destination` exists since npm 7.
fn supports_pack_destination(version: &str) -> bool {
    semver::Version::parse(version.trim())
        .map(|v| v >= semver::Version::new(7, 0, 0))
        .unwrap_or(false)
}

/// Rewrite direct dependencies on override targets in each existing manifest.
fn pin_manifests(
    paths: &BTreeSet<PathBuf>,
    overrides: &BTreeMap<String, ResolvedDependency>,
) -> Result<usize, PkgError> {
    let mut written = 0;
    for path in paths {
        if !path.is_file() {
            debug!(path = %path.display(), "skipping missing manifest");
            continue;
        }
        let mut manifest = Manifest::read(path)?;
        let versions = overrides
            .iter()
            .map(|(name, target)| (name.as_str(), target.version.as_str()));
        if manifest.set_dependency_versions(versions) {
            manifest.write()?;
            written += 1;
        }
    }
    Ok(written)
}

#[async_trait]
impl PackageManager for Npm {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::Npm
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn relocate(&self, cwd: PathBuf) -> Box<dyn PackageManager> {
        Box::new(self.relocated(cwd))
    }

    async fn detect(&self, require_lockfile: bool) -> Option<PathBuf> {
        let lockfile = require_lockfile.then_some(LOCKFILE_NAME);
        self.find_root(lockfile).ok()
    }

    async fn install(&self, packages: &[String], options: &InstallOptions) -> CommandResult {
        self.command(&self.install_args(packages, options)).await
    }

    async fn uninstall(&self, packages: &[String], options: &UninstallOptions) -> CommandResult {
        self.command(&self.uninstall_args(packages, options)).await
    }

    async fn update(&self, packages: &[String], options: &UpdateOptions) -> CommandResult {
        self.command(&self.update_args(packages, options)).await
    }

    async fn rebuild(&self, packages: &[String]) -> CommandResult {
        let mut args = vec!["rebuild".to_string()];
        self.push_loglevel(&mut args);
        args.extend(packages.iter().cloned());
        self.command(&args).await
    }

    async fn pack(&self, options: &PackOptions) -> CommandResult {
        let version = match self.version().await {
            Ok(version) => version,
            Err(e) => return CommandResult::fail(e.to_string()),
        };
        let workspace_dir = options.workspace_dir(self.cwd());
        let target_dir = options.target_dir(self.cwd());

        let modern = supports_pack_destination(&version);
        if !modern && !options.is_root_workspace() {
            return CommandResult::fail(format!("npm {version} does not support monorepos"));
        }

        if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
            return CommandResult::fail(format!(
                "Failed to create {}: {e}",
                target_dir.display()
            ));
        }

        if modern {
            self.pack_to_destination(&workspace_dir, &target_dir).await
        } else {
            self.pack_and_move(&workspace_dir, &target_dir).await
        }
    }

    async fn version(&self) -> Result<String, Error> {
        program_version(&self.session, PackageManagerKind::Npm).await
    }

    async fn override_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> CommandResult {
        let root = match self.find_root(Some(LOCKFILE_NAME)) {
            Ok(root) => root,
            Err(e) => return CommandResult::fail(load_error(&e.to_string())),
        };
        let mut lockfile = match NpmLockfile::read(&root.join(LOCKFILE_NAME)) {
            Ok(lockfile) => lockfile,
            Err(e) if e.code() == codes::PKG_LOCK_VERSION_UNSUPPORTED => {
                return CommandResult::fail(e.message())
            }
            Err(e) => return CommandResult::fail(load_error(e.message())),
        };

        let overrides = match self.resolve_overrides(dependencies).await {
            Ok(overrides) => overrides,
            Err(e) => return CommandResult::fail(e.message()),
        };

        let mut affected = lockfile.apply_overrides(&root, &overrides);
        affected.insert(root.join(MANIFEST_NAME));

        // Manifests first: an interrupted run leaves the old lockfile in place
        let persisted = pin_manifests(&affected, &overrides).and_then(|written| {
            lockfile.write()?;
            Ok(written)
        });
        match persisted {
            Ok(written) => info!(
                root = %root.display(),
                lockfile_version = %lockfile.version(),
                manifests = written,
                "rewrote package files"
            ),
            Err(e) => {
                return CommandResult::fail(format!(
                    "Error updating package files: {}",
                    e.message()
                ))
            }
        }

        let in_root = self.relocated(root);
        let result = in_root.install(&[], &InstallOptions::default()).await;
        // Restore npm's deduplicated tree layout
        let dedupe = in_root.command(&["dedupe".to_string()]).await;
        if !dedupe.success {
            warn!(exit_code = dedupe.exit_code, "npm dedupe failed");
        }
        result
    }
}
