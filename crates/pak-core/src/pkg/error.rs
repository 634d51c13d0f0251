//! Package manager error types.

use std::fmt;
use std::io;

/// Package manager error codes.
pub mod codes {
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_VERSION_NOT_FOUND: &str = "PKG_VERSION_NOT_FOUND";
    pub const PKG_REGISTRY_ERROR: &str = "PKG_REGISTRY_ERROR";

    pub const PKG_PACKAGE_JSON_NOT_FOUND: &str = "PKG_PACKAGE_JSON_NOT_FOUND";
    pub const PKG_PACKAGE_JSON_INVALID: &str = "PKG_PACKAGE_JSON_INVALID";
    pub const PKG_PACKAGE_JSON_WRITE_FAILED: &str = "PKG_PACKAGE_JSON_WRITE_FAILED";

    pub const PKG_LOCK_NOT_FOUND: &str = "PKG_LOCK_NOT_FOUND";
    pub const PKG_LOCK_INVALID_JSON: &str = "PKG_LOCK_INVALID_JSON";
    pub const PKG_LOCK_VERSION_UNSUPPORTED: &str = "PKG_LOCK_VERSION_UNSUPPORTED";
    pub const PKG_LOCK_WRITE_FAILED: &str = "PKG_LOCK_WRITE_FAILED";
}

/// Package manager error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a package not found error.
    #[must_use]
    pub fn not_found(name: &str) -> Self {
        Self::new(
            codes::PKG_NOT_FOUND,
            format!("{name} was not found in the npm registry!"),
        )
    }

    /// Create a version not found error.
    #[must_use]
    pub fn version_not_found(name: &str, version: &str) -> Self {
        Self::new(
            codes::PKG_VERSION_NOT_FOUND,
            format!("{name}@{version} was not found in the npm registry!"),
        )
    }

    /// Create a registry error.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_REGISTRY_ERROR, msg)
    }

    /// Create a package.json not found error.
    #[must_use]
    pub fn package_json_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_PACKAGE_JSON_NOT_FOUND,
            format!("package.json not found: {}", path.display()),
        )
    }

    /// Create a package.json invalid error.
    pub fn package_json_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_PACKAGE_JSON_INVALID, msg)
    }

    /// Create a package.json write error.
    pub fn package_json_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_PACKAGE_JSON_WRITE_FAILED, msg)
    }

    #[must_use]
    pub fn lock_not_found(path: &std::path::Path) -> Self {
        Self::new(
            codes::PKG_LOCK_NOT_FOUND,
            format!("Lockfile not found: {}", path.display()),
        )
    }

    pub fn lock_invalid_json(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_LOCK_INVALID_JSON, msg)
    }

    /// Create an unsupported `lockfileVersion` error.
    #[must_use]
    pub fn lock_version_unsupported(version: &str) -> Self {
        Self::new(
            codes::PKG_LOCK_VERSION_UNSUPPORTED,
            format!("Lockfile version {version} is not supported!"),
        )
    }

    pub fn lock_write_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_LOCK_WRITE_FAILED, msg)
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::new(codes::PKG_PACKAGE_JSON_WRITE_FAILED, e.to_string())
    }
}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        let detail = if e.is_timeout() {
            format!("Request timed out: {e}")
        } else if e.is_connect() {
            format!("Connection failed: {e}")
        } else {
            e.to_string()
        };
        Self::registry(format!(
            "Failed to download package info from npm registry: {detail}"
        ))
    }
}
