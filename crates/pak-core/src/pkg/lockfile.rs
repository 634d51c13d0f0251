//! npm lockfile (`package-lock.json`) patching.
//!
//! Overriding a transitive dependency means editing every place the lockfile
//! mentions it, then pinning the ranges that point at it. npm has used two
//! layouts over time:
//!
//! - `lockfileVersion: 1` stores a nested `dependencies` tree mirroring
//!   `node_modules`, with `requires` holding each node's ranges.
//! - `lockfileVersion: 3` stores a flat `packages` map keyed by install path
//!   (`node_modules/a/node_modules/b`), with `dependencies` holding ranges.
//! - `lockfileVersion: 2` carries both, so both are patched.
//!
//! The document is kept as order-preserving JSON so untouched entries are
//! written back unchanged.

use super::error::PkgError;
use super::manifest::json_type_name;
use super::registry::ResolvedDependency;
use super::root::MANIFEST_NAME;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lockfile filename.
pub const LOCKFILE_NAME: &str = "package-lock.json";

const NODE_MODULES_SEGMENT: &str = "node_modules/";

/// Supported `lockfileVersion` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockfileVersion {
    V1,
    V2,
    V3,
}

impl LockfileVersion {
    /// Read `lockfileVersion` from a lockfile document.
    ///
    /// # Errors
    /// Returns `PKG_LOCK_VERSION_UNSUPPORTED` for anything but 1, 2 or 3.
    pub fn from_document(document: &Map<String, Value>) -> Result<Self, PkgError> {
        match document.get("lockfileVersion") {
            Some(value) => match value.as_u64() {
                Some(1) => Ok(Self::V1),
                Some(2) => Ok(Self::V2),
                Some(3) => Ok(Self::V3),
                _ => Err(PkgError::lock_version_unsupported(&value.to_string())),
            },
            None => Err(PkgError::lock_version_unsupported("(missing)")),
        }
    }

    /// Whether this version has the flat `packages` map.
    #[must_use]
    pub fn has_packages_map(self) -> bool {
        matches!(self, Self::V2 | Self::V3)
    }

    /// Whether this version has the nested `dependencies` tree.
    #[must_use]
    pub fn has_dependency_tree(self) -> bool {
        matches!(self, Self::V1 | Self::V2)
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl fmt::Display for LockfileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A parsed `package-lock.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct NpmLockfile {
    path: PathBuf,
    version: LockfileVersion,
    document: Map<String, Value>,
    trailing_newline: bool,
}

impl NpmLockfile {
    /// Read and validate a lockfile.
    ///
    /// # Errors
    /// Returns `PkgError` if the file is missing, not a JSON object or has an
    /// unsupported `lockfileVersion`.
    pub fn read(path: &Path) -> Result<Self, PkgError> {
        let content = pak_util::fs::read_to_string_lossy(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PkgError::lock_not_found(path)
            } else {
                PkgError::lock_invalid_json(format!("Failed to read lockfile: {e}"))
            }
        })?;
        Self::parse(path, &content)
    }

    /// Parse lockfile content that belongs to `path`.
    ///
    /// # Errors
    /// Returns `PkgError` if the content is not a supported lockfile.
    pub fn parse(path: &Path, content: &str) -> Result<Self, PkgError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| PkgError::lock_invalid_json(format!("Invalid lockfile JSON: {e}")))?;

        let document = match value {
            Value::Object(document) => document,
            other => {
                return Err(PkgError::lock_invalid_json(format!(
                    "Lockfile must be a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let version = LockfileVersion::from_document(&document)?;

        Ok(Self {
            path: path.to_path_buf(),
            version,
            document,
            trailing_newline: content.ends_with('\n'),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn version(&self) -> LockfileVersion {
        self.version
    }

    #[must_use]
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Rewrite the lockfile so every package in `overrides` resolves to the
    /// given version.
    ///
    /// `root` is the directory holding the lockfile. Returns the package.json
    /// paths of packages whose ranges now point at an override target.
    pub fn apply_overrides(
        &mut self,
        root: &Path,
        overrides: &BTreeMap<String, ResolvedDependency>,
    ) -> BTreeSet<PathBuf> {
        let mut affected = BTreeSet::new();

        if self.version.has_packages_map() {
            walk_packages_map(&mut self.document, root, overrides, &mut affected);
        }
        if self.version.has_dependency_tree() {
            walk_dependency_tree(&mut self.document, root, overrides, &mut affected);
        }

        debug!(
            lockfile_version = %self.version,
            affected = affected.len(),
            "patched lockfile"
        );
        affected
    }

    /// Serialize with 2-space indentation, keeping the source's trailing newline.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        let mut out =
            serde_json::to_string_pretty(&self.document).unwrap_or_else(|_| "{}".into());
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Write the lockfile back to its path atomically.
    ///
    /// # Errors
    /// Returns `PkgError` if the file cannot be written.
    pub fn write(&self) -> Result<(), PkgError> {
        pak_util::fs::atomic_write(&self.path, self.to_json_string().as_bytes())
            .map_err(|e| PkgError::lock_write_failed(format!("Failed to write lockfile: {e}")))
    }
}

/// How one lockfile layout names the fields of an entry.
#[derive(Debug, Clone, Copy)]
struct EntryShape {
    /// Field holding the entry's dependency ranges.
    ranges_field: &'static str,
    /// Drop `integrity` when the override has none.
    clear_stale_integrity: bool,
}

const TREE_ENTRY: EntryShape = EntryShape {
    ranges_field: "requires",
    clear_stale_integrity: false,
};

const PACKAGES_ENTRY: EntryShape = EntryShape {
    ranges_field: "dependencies",
    clear_stale_integrity: true,
};

/// Point an entry at the override's version.
fn override_entry(entry: &mut Value, target: &ResolvedDependency, shape: EntryShape) {
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    let Value::Object(entry) = entry else {
        return;
    };

    entry.insert("version".into(), Value::String(target.version.clone()));

    if entry.contains_key("tarball") {
        entry.insert("tarball".into(), Value::String(target.tarball.clone()));
    } else {
        entry.insert("resolved".into(), Value::String(target.tarball.clone()));
        match &target.integrity {
            Some(integrity) => {
                entry.insert("integrity".into(), Value::String(integrity.clone()));
            }
            None if shape.clear_stale_integrity => {
                entry.shift_remove("integrity");
            }
            None => {}
        }
    }

    if target.dependencies.is_empty() {
        entry.shift_remove(shape.ranges_field);
    } else {
        let ranges = target
            .dependencies
            .iter()
            .map(|(name, range)| (name.clone(), Value::String(range.clone())))
            .collect();
        entry.insert(shape.ranges_field.into(), Value::Object(ranges));
    }
}

/// Pin ranges that reference an override target. Returns whether any did.
fn pin_ranges(
    entry: &mut Map<String, Value>,
    overrides: &BTreeMap<String, ResolvedDependency>,
    shape: EntryShape,
) -> bool {
    let Some(Value::Object(ranges)) = entry.get_mut(shape.ranges_field) else {
        return false;
    };

    let mut pinned = false;
    for (name, target) in overrides {
        if let Some(range) = ranges.get_mut(name) {
            *range = Value::String(target.version.clone());
            pinned = true;
        }
    }
    pinned
}

/// Walk the nested `dependencies` tree below `node`, which lives in `dir`.
fn walk_dependency_tree(
    node: &mut Map<String, Value>,
    dir: &Path,
    overrides: &BTreeMap<String, ResolvedDependency>,
    affected: &mut BTreeSet<PathBuf>,
) {
    let Some(Value::Object(dependencies)) = node.get_mut("dependencies") else {
        return;
    };

    for (name, entry) in dependencies.iter_mut() {
        if let Some(target) = overrides.get(name) {
            override_entry(entry, target, TREE_ENTRY);
            continue;
        }

        let Value::Object(entry) = entry else {
            continue;
        };
        let package_dir = dir.join("node_modules").join(name);
        if pin_ranges(entry, overrides, TREE_ENTRY) {
            affected.insert(package_dir.join(MANIFEST_NAME));
        }
        walk_dependency_tree(entry, &package_dir, overrides, affected);
    }
}

/// Walk the flat `packages` map.
fn walk_packages_map(
    document: &mut Map<String, Value>,
    root: &Path,
    overrides: &BTreeMap<String, ResolvedDependency>,
    affected: &mut BTreeSet<PathBuf>,
) {
    let Some(Value::Object(packages)) = document.get_mut("packages") else {
        return;
    };

    for (key, entry) in packages.iter_mut() {
        let name = package_entry_name(key, entry).to_string();
        if let Some(target) = overrides.get(&name) {
            override_entry(entry, target, PACKAGES_ENTRY);
        } else if let Value::Object(entry) = entry {
            if pin_ranges(entry, overrides, PACKAGES_ENTRY) {
                affected.insert(root.join(key).join(MANIFEST_NAME));
            }
        }
    }
}

/// Package name of a `packages` entry: its `name` field, else the part of the
/// key after the last `node_modules/`, else the key itself.
fn package_entry_name<'a>(key: &'a str, entry: &'a Value) -> &'a str {
    if let Some(name) = entry.get("name").and_then(Value::as_str) {
        return name;
    }
    key.rfind(NODE_MODULES_SEGMENT)
        .map_or(key, |idx| &key[idx + NODE_MODULES_SEGMENT.len()..])
}
