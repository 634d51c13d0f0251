//! Option records shared by all adapters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which dependency section an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    #[default]
    Prod,
    Dev,
}

/// Options for `install`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub dependency_type: DependencyType,
    /// Install globally.
    pub global: bool,
    /// Save the exact version instead of a range.
    pub exact: bool,
    /// Force re-fetching / overwriting.
    pub force: bool,
    /// Skip lifecycle scripts (bare installs only).
    pub ignore_scripts: bool,
    /// Raw flags appended verbatim.
    pub additional_args: Vec<String>,
}

impl InstallOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    #[must_use]
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    #[must_use]
    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_ignore_scripts(mut self, ignore_scripts: bool) -> Self {
        self.ignore_scripts = ignore_scripts;
        self
    }

    #[must_use]
    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }
}

/// Options for `uninstall`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallOptions {
    pub dependency_type: DependencyType,
    pub global: bool,
    pub additional_args: Vec<String>,
}

impl UninstallOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    #[must_use]
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    #[must_use]
    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }
}

/// Options for `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub dependency_type: DependencyType,
    pub global: bool,
    pub additional_args: Vec<String>,
}

impl UpdateOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dependency_type(mut self, dependency_type: DependencyType) -> Self {
        self.dependency_type = dependency_type;
        self
    }

    #[must_use]
    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    #[must_use]
    pub fn with_additional_args(mut self, args: Vec<String>) -> Self {
        self.additional_args = args;
        self
    }
}

/// yarn implements `update` as `add`, the only command that rewrites manifest ranges.
impl From<&UpdateOptions> for InstallOptions {
    fn from(options: &UpdateOptions) -> Self {
        Self {
            dependency_type: options.dependency_type,
            global: options.global,
            additional_args: options.additional_args.clone(),
            ..Self::default()
        }
    }
}

/// Options for `pack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    /// Workspace to pack, relative to the adapter's cwd.
    pub workspace: PathBuf,
    /// Where the tarball ends up. Defaults to the adapter's cwd.
    pub target_dir: Option<PathBuf>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            target_dir: None,
        }
    }
}

impl PackOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    #[must_use]
    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = Some(target_dir.into());
        self
    }

    /// Whether the workspace is the adapter's own directory.
    #[must_use]
    pub fn is_root_workspace(&self) -> bool {
        self.workspace.as_os_str().is_empty() || self.workspace == std::path::Path::new(".")
    }

    /// Directory of the workspace to pack.
    #[must_use]
    pub fn workspace_dir(&self, cwd: &std::path::Path) -> PathBuf {
        if self.is_root_workspace() {
            cwd.to_path_buf()
        } else {
            cwd.join(&self.workspace)
        }
    }

    /// Directory the tarball is placed in. Relative paths resolve against `cwd`.
    #[must_use]
    pub fn target_dir(&self, cwd: &std::path::Path) -> PathBuf {
        self.target_dir
            .as_ref()
            .map_or_else(|| cwd.to_path_buf(), |dir| cwd.join(dir))
    }
}
