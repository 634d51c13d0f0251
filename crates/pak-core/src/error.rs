use std::path::PathBuf;
use thiserror::Error;

/// Core error type for misuse conditions.
///
/// Recoverable package-manager failures are reported through
/// [`crate::pkg::CommandResult`] instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No package.json{} found from {start}", lockfile_suffix(.lockfile))]
    ProjectNotFound {
        start: PathBuf,
        lockfile: Option<String>,
    },

    #[error("Could not detect {manager} version: {stderr}! Exit code: {exit_code}.")]
    VersionUnknown {
        manager: &'static str,
        stderr: String,
        exit_code: i32,
    },

    #[error("This directory tree does not contain a package.json managed by a supported package manager (searched from {start})")]
    NoPackageManager { start: PathBuf },
}

fn lockfile_suffix(lockfile: &Option<String>) -> String {
    lockfile
        .as_ref()
        .map(|name| format!(" with {name}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_not_found_mentions_lockfile() {
        let err = Error::ProjectNotFound {
            start: PathBuf::from("/a/b"),
            lockfile: Some("yarn.lock".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("yarn.lock"));
        assert!(msg.contains("/a/b"));

        let err = Error::ProjectNotFound {
            start: PathBuf::from("/a/b"),
            lockfile: None,
        };
        assert_eq!(err.to_string(), "No package.json found from /a/b");
    }

    #[test]
    fn test_version_unknown_message() {
        let err = Error::VersionUnknown {
            manager: "npm",
            stderr: "command not found".to_string(),
            exit_code: 127,
        };
        assert_eq!(
            err.to_string(),
            "Could not detect npm version: command not found! Exit code: 127."
        );
    }
}
