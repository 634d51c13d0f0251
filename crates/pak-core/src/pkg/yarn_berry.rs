//! yarn berry (2.x and later) adapter.
//!
//! Berry has no global installs and no log level flags. `yarn pack --out`
//! needs the full output path up front, so it is computed from the
//! workspace manifest.

use super::exec::{CommandResult, Session};
use super::manager::{detect_root, program_version, PackageManager, PackageManagerKind};
use super::manifest::Manifest;
use super::options::{DependencyType, InstallOptions, PackOptions, UninstallOptions, UpdateOptions};
use super::root::MANIFEST_NAME;
use super::yarn::{override_with_resolutions, PROGRAM};
use crate::config::Config;
use crate::error::Error;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

const SUPPORTED_MAJORS: [&str; 3] = ["2.", "3.", "4."];

/// yarn berry adapter.
#[derive(Debug, Clone)]
pub struct YarnBerry {
    session: Session,
}

impl YarnBerry {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_session(Session::new(config))
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self { session }
    }

    pub(crate) fn install_args(packages: &[String], options: &InstallOptions) -> Vec<String> {
        let mut args = Vec::new();
        if packages.is_empty() {
            args.push("install".to_string());
        } else {
            args.push("add".into());
            args.extend(packages.iter().cloned());
            if options.dependency_type == DependencyType::Dev {
                args.push("--dev".into());
            }
            if options.exact {
                args.push("--exact".into());
            }
        }
        args.extend(options.additional_args.iter().cloned());
        args
    }
}

#[async_trait]
impl PackageManager for YarnBerry {
    fn kind(&self) -> PackageManagerKind {
        PackageManagerKind::YarnBerry
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn relocate(&self, cwd: PathBuf) -> Box<dyn PackageManager> {
        Box::new(Self::with_session(self.session.relocate(cwd)))
    }

    async fn detect(&self, require_lockfile: bool) -> Option<PathBuf> {
        detect_root(self, require_lockfile, |version| {
            SUPPORTED_MAJORS.iter().any(|major| version.starts_with(major))
        })
        .await
    }

    async fn install(&self, packages: &[String], options: &InstallOptions) -> CommandResult {
        if options.global {
            return CommandResult::fail("yarn berry does not support global installs!");
        }
        self.session
            .exec(PROGRAM, &Self::install_args(packages, options))
            .await
    }

    async fn uninstall(&self, packages: &[String], options: &UninstallOptions) -> CommandResult {
        if options.global {
            return CommandResult::fail("yarn berry does not support global uninstalls!");
        }
        let mut args = vec!["remove".to_string()];
        args.extend(packages.iter().cloned());
        args.extend(options.additional_args.iter().cloned());
        self.session.exec(PROGRAM, &args).await
    }

    async fn update(&self, packages: &[String], options: &UpdateOptions) -> CommandResult {
        self.install(packages, &InstallOptions::from(options)).await
    }

    async fn rebuild(&self, packages: &[String]) -> CommandResult {
        let mut args = vec!["rebuild".to_string()];
        args.extend(packages.iter().cloned());
        self.session.exec(PROGRAM, &args).await
    }

    async fn pack(&self, options: &PackOptions) -> CommandResult {
        let workspace_dir = options.workspace_dir(self.cwd());
        let target_dir = options.target_dir(self.cwd());

        if let Err(e) = tokio::fs::create_dir_all(&target_dir).await {
            return CommandResult::fail(format!(
                "Failed to create {}: {e}",
                target_dir.display()
            ));
        }

        let target_path = match Manifest::read(&workspace_dir.join(MANIFEST_NAME))
            .and_then(|manifest| manifest.tarball_file_name())
        {
            Ok(name) => target_dir.join(name),
            Err(e) => return CommandResult::fail(e.message()),
        };

        let args = vec![
            "pack".to_string(),
            "--out".to_string(),
            target_path.to_string_lossy().into_owned(),
        ];
        // yarn prints a progress report, not the tarball path
        self.session
            .exec_in(PROGRAM, &args, &workspace_dir)
            .await
            .with_stdout(target_path.to_string_lossy())
    }

    async fn version(&self) -> Result<String, Error> {
        program_version(&self.session, PackageManagerKind::YarnBerry).await
    }

    async fn override_dependencies(
        &self,
        dependencies: &BTreeMap<String, String>,
    ) -> CommandResult {
        override_with_resolutions(self, dependencies).await
    }
}
