//! Package root discovery.

use crate::error::Error;
use std::path::{Path, PathBuf};

/// Manifest filename.
pub const MANIFEST_NAME: &str = "package.json";

/// Find the nearest directory containing a `package.json`, walking up from `start`.
///
/// When `lockfile` is given, the lockfile must sit next to the manifest. A
/// manifest without it does not stop the walk, since monorepo packages carry
/// their own `package.json` while the lockfile lives at the repository root.
///
/// # Errors
/// Returns [`Error::ProjectNotFound`] when the filesystem root is reached.
pub fn find_root(start: &Path, lockfile: Option<&str>) -> Result<PathBuf, Error> {
    let mut current = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir()?.join(start)
    };

    loop {
        if is_root(&current, lockfile) {
            return Ok(current);
        }

        if !current.pop() {
            return Err(Error::ProjectNotFound {
                start: start.to_path_buf(),
                lockfile: lockfile.map(String::from),
            });
        }
    }
}

fn is_root(dir: &Path, lockfile: Option<&str>) -> bool {
    if !dir.join(MANIFEST_NAME).is_file() {
        return false;
    }
    lockfile.map_or(true, |name| dir.join(name).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_finds_manifest_with_lockfile() {
        let root = tempdir().unwrap();
        let project = root.path().join("a").join("b");
        let nested = project.join("c").join("d");
        fs::create_dir_all(&nested).unwrap();
        fs::write(project.join("package.json"), "{}").unwrap();
        fs::write(project.join("lock.json"), "{}").unwrap();

        let found = find_root(&nested, Some("lock.json")).unwrap();
        assert_eq!(found, project);
    }

    #[test]
    fn test_missing_lockfile_fails() {
        let root = tempdir().unwrap();
        let project = root.path().join("a").join("b");
        let nested = project.join("c").join("d");
        fs::create_dir_all(&nested).unwrap();
        fs::write(project.join("package.json"), "{}").unwrap();

        let err = find_root(&nested, Some("lock.json")).unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound { .. }));
    }

    #[test]
    fn test_without_lockfile_returns_nearest_manifest() {
        let root = tempdir().unwrap();
        let pkg = root.path().join("packages").join("a");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(root.path().join("package.json"), "{}").unwrap();
        fs::write(pkg.join("package.json"), "{}").unwrap();

        assert_eq!(find_root(&pkg, None).unwrap(), pkg);
    }

    #[test]
    fn test_skips_manifest_without_lockfile() {
        let root = tempdir().unwrap();
        let pkg = root.path().join("packages").join("a");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(root.path().join("package.json"), "{}").unwrap();
        fs::write(root.path().join("yarn.lock"), "").unwrap();
        fs::write(pkg.join("package.json"), "{}").unwrap();

        assert_eq!(find_root(&pkg, Some("yarn.lock")).unwrap(), root.path());
    }

    #[test]
    fn test_directory_named_like_manifest_is_ignored() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("package.json")).unwrap();

        assert!(find_root(root.path(), None).is_err());
    }
}
