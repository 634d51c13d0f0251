//! yarn classic (1.x) adapter.

use super::exec::{CommandResult, Session};
use super::manager::{detect_root, program_version, PackageManager, PackageManagerKind};
use super::options::{DependencyType, InstallOptions, PackOptions, UninstallOptions, UpdateOptions};
use super::yarn::{override_with_resolutions, PROGRAM};
use crate::config::{Config, Environment, LogLevel};
use crate::error::Error;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// yarn classic adapter.
#[derive(Debug, Clone)]
pub struct YarnClassic {
    session: Session,
}

impl YarnClassic {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_session(Session::new(config))
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self { session }
    }

    /// yarn 1 only knows `--silent` and `--verbose`.
    fn push_loglevel(&self, args: &mut Vec<String>) {
        match self.session.config().loglevel {
            Some(LogLevel::Silent) => args.push("--silent".into()),
            Some(LogLevel::Verbose) => args.push("--verbose".into()),
            _ => {}
        }
    }

    pub(crate) fn install_args(&self, packages: &[String], options: &InstallOptions) -> Vec<String> {
        let mut args = Vec::new();
        if packages.is_empty() {
            args.push("install".to_string());
            if self.session.config().environment == Environment::Production {
                args.push("--production".into());
            }
            if options.ignore_scripts {
                args.push("--ignore-scripts".into());
            }
            if options.force {
                args.push("--force".into());
            }
        } else {
            if options.global {
                args.push("global".into());
            }
            args.push("add".into());
            args.extend(packages.iter().cloned());
            if options.dependency_type == DependencyType::Dev {
                args.push("--dev".into());
            }
            if options.exact {
                args.push("--exact".into());
            }
        }
        self.push_loglevel(&mut args);
        args.extend(options.additional_args.iter().cloned());
        args
    }

    pub(crate) fn uninstall_args(&self, packages: &[String], options: &UninstallOptions) -> Vec<String> {
        let mut args = Vec::new();
        if options.global {
            args.push("global".to_string());
        }
        args.push("remove".into());
        args.extend(packages.iter().cloned());
        if options.dependency_type == DependencyType::Dev {
            args.push("--dev".into());
        }
        self.push_loglevel(&mut args);
        args.extend(options.additional_args.iter().cloned());
        args
    }
}

#[async_trait]
impl PackageManager for YarnClassic {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::YarnClassic
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn relocate(&self, cwd: PathBuf) -> Box<dyn PackageManager> {
        Box::new(Self::with_session(self.session.relocate(cwd)))
    }

    async fn detect(&self, require_lockfile: bool) -> Option<PathBuf> {
        detect_root(self, require_lockfile, |version| version.starts_with("1.")).await
    }

    async fn install(&self, packages: &[String], options: &InstallOptions) -> CommandResult {
        self.session
            .exec(PROGRAM, &self.install_args(packages, options))
            .await
    }

    async fn uninstall(&self, packages: &[String], options: &UninstallOptions) -> CommandResult {
        self.session
            .exec(PROGRAM, &self.uninstall_args(packages, options))
            .await
    }

    // `add` is the only yarn command that rewrites manifest ranges
    async fn update(&self, packages: &[String], options: &UpdateOptions) -> CommandResult {
        self.install(packages, &InstallOptions::from(options)).await
    }

    async fn rebuild(&self, _packages: &[String]) -> CommandResult {
        CommandResult::fail(r#"yarn classic does not support the "rebuild" command!"#)
    }

    async fn pack(&self, _options: &PackOptions) -> CommandResult {
        CommandResult::fail("yarn classic does not support packing tarballs!")
    }

    async fn version(&self) -> Result<String, Error> {
        program_version(&self.session, PackageManagerKind::YarnClassic).await
    }

    async fn override_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> CommandResult {
        override_with_resolutions(self, dependencies).await
    }
}
