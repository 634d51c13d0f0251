//! package.json reading and editing.
//!
//! Manifests are kept as order-preserving JSON so that rewriting a single
//! dependency range leaves the rest of the file as the user wrote it.

use super::error::PkgError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// An editable package.json.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
    trailing_newline: bool,
}

impl Manifest {
    /// Read and parse a package.json file.
    ///
    /// # Errors
    /// Returns `PkgError` if the file is missing, unreadable or not a JSON object.
    pub fn read(path: &Path) -> Result<Self, PkgError> {
        let content = pak_util::fs::read_to_string_lossy(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PkgError::package_json_not_found(path)
            } else {
                PkgError::package_json_invalid(format!(
                    "Failed to read {}: {e}",
                    path.display()
                ))
            }
        })?;
        Self::parse(path, &content)
    }

    /// Parse package.json content that belongs to `path`.
    ///
    /// # Errors
    /// Returns `PkgError` if the content is not a JSON object.
    pub fn parse(path: &Path, content: &str) -> Result<Self, PkgError> {
        let value: Value = serde_json::from_str(content).map_err(|e| {
            PkgError::package_json_invalid(format!("Invalid JSON in {}: {e}", path.display()))
        })?;

        let root = match value {
            Value::Object(root) => root,
            other => {
                return Err(PkgError::package_json_invalid(format!(
                    "{} must be a JSON object, got {}",
                    path.display(),
                    json_type_name(&other)
                )))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            root,
            trailing_newline: content.ends_with('\n'),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The manifest as a JSON object.
    #[must_use]
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.root
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root.get("version").and_then(Value::as_str)
    }

    /// Range declared for `name` in `section` (e.g. `devDependencies`).
    #[must_use]
    pub fn dependency(&self, section: &str, name: &str) -> Option<&str> {
        self.root.get(section)?.get(name)?.as_str()
    }

    /// Glob patterns from the `workspaces` field.
    ///
    /// Accepts both the array form and yarn's `{ "packages": [...] }` form.
    #[must_use]
    pub fn workspace_patterns(&self) -> Vec<String> {
        let patterns = match self.root.get("workspaces") {
            Some(Value::Array(arr)) => Some(arr),
            Some(Value::Object(obj)) => obj.get("packages").and_then(Value::as_array),
            _ => None,
        };

        patterns
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pin direct `dependencies` on override targets to their new version.
    ///
    /// Only entries that already exist are touched. Returns whether anything changed.
    pub fn set_dependency_versions<'a>(
        &mut self,
        versions: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> bool {
        let Some(Value::Object(deps)) = self.root.get_mut("dependencies") else {
            return false;
        };

        let mut changed = false;
        for (name, version) in versions {
            if let Some(range) = deps.get_mut(name) {
                if range.as_str() != Some(version) {
                    *range = Value::String(version.to_string());
                    changed = true;
                }
            }
        }
        changed
    }

    /// Merge `resolutions` into the manifest's `resolutions` block.
    ///
    /// Existing entries are kept unless the same package is overridden again.
    pub fn merge_resolutions(&mut self, resolutions: &BTreeMap<String, String>) {
        let block = self
            .root
            .entry("resolutions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !block.is_object() {
            *block = Value::Object(Map::new());
        }
        if let Value::Object(block) = block {
            for (name, version) in resolutions {
                block.insert(name.clone(), Value::String(version.clone()));
            }
        }
    }

    /// File name npm gives the packed tarball: `@scope/name` becomes `scope-name-<version>.tgz`.
    ///
    /// # Errors
    /// Returns `PkgError` if `name` or `version` is missing.
    pub fn tarball_file_name(&self) -> Result<String, PkgError> {
        let name = self.name().ok_or_else(|| {
            PkgError::package_json_invalid(format!("{} has no name", self.path.display()))
        })?;
        let version = self.version().ok_or_else(|| {
            PkgError::package_json_invalid(format!("{} has no version", self.path.display()))
        })?;

        let flat = name.replacen('/', "-", 1);
        let flat = flat.strip_prefix('@').unwrap_or(&flat);
        Ok(format!("{flat}-{version}.tgz"))
    }

    /// Serialize with 2-space indentation, keeping the source's trailing newline.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.root).unwrap_or_else(|_| "{}".into());
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Write the manifest back to its path.
    ///
    /// # Errors
    /// Returns `PkgError` if the file cannot be written.
    pub fn write(&self) -> Result<(), PkgError> {
        pak_util::fs::atomic_write(&self.path, self.to_json_string().as_bytes()).map_err(|e| {
            PkgError::package_json_write_failed(format!(
                "Failed to write {}: {e}",
                self.path.display()
            ))
        })
    }
}

/// Get a human-readable type name for a JSON value.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
