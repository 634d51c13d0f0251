//! Subcommand implementations and the plumbing they share.
//!
//! Every command prints either human text or a single JSON object on stdout.
//! Failures in JSON mode look like `{"ok":false,"error":{"code":..,"message":..}}`.

pub mod deps;
pub mod detect;
pub mod overrides;
pub mod pack;
pub mod pm_version;
pub mod root;
pub mod version;
pub mod workspaces;

use pak_core::pkg::{
    create_with_session, detect_with_session, CommandResult, DetectOptions, OutputSinks,
    PackageManager, PackageManagerKind, ProcessRunner, Session,
};
use pak_core::{Config, Error};
use std::sync::Arc;
use std::time::Duration;

/// CLI error codes. Package errors carry their own `PKG_*` codes.
pub mod codes {
    pub const NO_PACKAGE_MANAGER: &str = "PAK_NO_PACKAGE_MANAGER";
    pub const PROJECT_NOT_FOUND: &str = "PAK_PROJECT_NOT_FOUND";
    pub const VERSION_UNKNOWN: &str = "PAK_VERSION_UNKNOWN";
    pub const INVALID_ARGUMENT: &str = "PAK_INVALID_ARGUMENT";
    pub const INTERNAL: &str = "PAK_INTERNAL";
}

/// Everything a command needs from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub json: bool,
    pub pm: Option<PackageManagerKind>,
    pub require_lockfile: bool,
    pub timeout: Option<Duration>,
}

impl Context {
    /// Session that spawns real processes.
    ///
    /// Human mode streams package-manager output as it arrives. JSON mode only
    /// captures it, so stdout carries nothing but the final object.
    pub fn session(&self) -> Session {
        let runner = ProcessRunner::new().with_timeout(self.timeout);
        let sinks = if self.json {
            OutputSinks::none()
        } else {
            OutputSinks::none()
                .with_stdout(Arc::new(|line: &str| println!("{line}")))
                .with_stderr(Arc::new(|line: &str| eprintln!("{line}")))
        };

        Session::new(self.config.clone())
            .with_runner(Arc::new(runner))
            .with_sinks(sinks)
    }

    /// The adapter named by `--pm`, or the detected one.
    ///
    /// Commands run where pak was invoked, so `install` inside a workspace
    /// package edits that package. Only `at_root` moves a detected adapter to
    /// the package root.
    pub async fn manager(&self, at_root: bool) -> Result<Box<dyn PackageManager>, Error> {
        let session = self.session();
        if let Some(kind) = self.pm {
            tracing::debug!(manager = %kind, "using requested package manager");
            return Ok(create_with_session(kind, session));
        }

        let options = DetectOptions::default()
            .with_require_lockfile(self.require_lockfile)
            .with_set_cwd_to_package_root(at_root);
        detect_with_session(session, options).await
    }
}

/// Error code for a core error.
pub fn error_code(err: &Error) -> &'static str {
    match err {
        Error::NoPackageManager { .. } => codes::NO_PACKAGE_MANAGER,
        Error::ProjectNotFound { .. } => codes::PROJECT_NOT_FOUND,
        Error::VersionUnknown { .. } => codes::VERSION_UNKNOWN,
        Error::Io(_) => codes::INTERNAL,
    }
}

/// Print an error and exit with status 1.
pub fn fail(json: bool, code: &str, message: &str) -> ! {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": { "code": code, "message": message }
            })
        );
    } else {
        eprintln!("error: {message}");
    }
    std::process::exit(1);
}

/// [`fail`] for a core error.
pub fn fail_with(json: bool, err: &Error) -> ! {
    fail(json, error_code(err), &err.to_string())
}

/// Print the outcome of a package-manager operation and exit with its status.
///
/// In human mode the output was already streamed; only the messages of
/// failures that never reached a process are repeated on stderr.
pub fn finish(ctx: &Context, manager: &dyn PackageManager, result: &CommandResult) -> ! {
    if ctx.json {
        println!(
            "{}",
            serde_json::json!({
                "ok": result.success,
                "manager": manager.kind().as_str(),
                "cwd": manager.cwd().to_string_lossy(),
                "result": result,
            })
        );
    } else if !result.success && result.combined_output == result.stderr {
        eprintln!("error: {}", result.stderr);
    }

    std::process::exit(exit_status(result));
}

/// Process exit status for a result. Signals and other non-positive failures map to 1.
pub fn exit_status(result: &CommandResult) -> i32 {
    match (result.success, result.exit_code) {
        (true, _) => 0,
        (false, code) if code > 0 => code,
        (false, _) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(success: bool, exit_code: i32) -> CommandResult {
        CommandResult {
            success,
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
            combined_output: String::new(),
        }
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(&result(true, 0)), 0);
        assert_eq!(exit_status(&result(false, 2)), 2);
        assert_eq!(exit_status(&result(false, -1)), 1);
        // timed out with a clean exit
        assert_eq!(exit_status(&result(false, 0)), 1);
    }

    #[test]
    fn test_error_codes() {
        let err = Error::NoPackageManager {
            start: PathBuf::from("/x"),
        };
        assert_eq!(error_code(&err), codes::NO_PACKAGE_MANAGER);

        let err = Error::ProjectNotFound {
            start: PathBuf::from("/x"),
            lockfile: None,
        };
        assert_eq!(error_code(&err), codes::PROJECT_NOT_FOUND);
        let err = Error::Io(std::io::Error::other("boom"));
        assert_eq!(error_code(&err), codes::INTERNAL);
    }
}
