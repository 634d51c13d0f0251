//! npm registry client.

use super::error::PkgError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "PAK_NPM_REGISTRY";

/// A single published version of a package, as the registry describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    /// Exact version.
    pub version: String,
    /// Subresource integrity hash, if the registry publishes one.
    pub integrity: Option<String>,
    /// Tarball URL.
    pub tarball: String,
    /// Dependencies of this version (name -> range).
    pub dependencies: BTreeMap<String, String>,
}

/// Looks up package versions.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Resolve `name` at the exact `version`.
    ///
    /// # Errors
    /// Returns `PkgError` if the lookup fails or the version does not exist.
    async fn resolve(&self, name: &str, version: &str) -> Result<ResolvedDependency, PkgError>;
}

/// Registry client for fetching package metadata.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        // `Url::join` drops the last segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(crate::version::USER_AGENT)
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, http })
    }

    /// Create a client using the registry URL from environment or default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_env() -> Result<Self, PkgError> {
        let url = std::env::var(REGISTRY_ENV).unwrap_or_else(|_| DEFAULT_REGISTRY.to_string());
        Self::new(&url)
    }

    /// Client for an explicit registry, else the environment, else the default.
    ///
    /// # Errors
    /// Returns an error if the client cannot be created.
    pub fn from_config(registry: Option<&str>) -> Result<Self, PkgError> {
        match registry {
            Some(url) => Self::new(url),
            None => Self::from_env(),
        }
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the packument (package metadata) for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails or the package is not found.
    pub async fn fetch_packument(&self, name: &str) -> Result<serde_json::Value, PkgError> {
        // Scoped names keep the '@' but encode the '/'
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        let url = self
            .base_url
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))?;

        debug!(%url, "fetching packument");
        let response = self.http.get(url.as_str()).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Failed to download package info from npm registry: status {} for '{name}'",
                response.status()
            )));
        }

        let json: serde_json::Value = response.json().await?;
        Ok(json)
    }
}

#[async_trait]
impl DependencyResolver for RegistryClient {
    async fn resolve(&self, name: &str, version: &str) -> Result<ResolvedDependency, PkgError> {
        let packument = self.fetch_packument(name).await?;
        resolved_version(&packument, name, version)
    }
}

/// Extract one published version from a packument.
///
/// # Errors
/// Returns `PKG_VERSION_NOT_FOUND` if the version is not in `versions` and
/// `PKG_REGISTRY_ERROR` if it has no `dist.tarball`.
pub fn resolved_version(
    packument: &serde_json::Value,
    name: &str,
    version: &str,
) -> Result<ResolvedDependency, PkgError> {
    let info = packument
        .get("versions")
        .and_then(|versions| versions.get(version))
        .ok_or_else(|| PkgError::version_not_found(name, version))?;

    let dist = info.get("dist");
    let tarball = dist
        .and_then(|d| d.get("tarball"))
        .and_then(serde_json::Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            PkgError::registry(format!("{name}@{version} has no tarball in the npm registry!"))
        })?;
    let dependencies = info
        .get("dependencies")
        .and_then(serde_json::Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter_map(|(dep, range)| range.as_str().map(|r| (dep.clone(), r.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(ResolvedDependency {
        version: info
            .get("version")
            .and_then(serde_json::Value::as_str)
            .unwrap_or(version)
            .to_string(),
        integrity: dist
            .and_then(|d| d.get("integrity"))
            .and_then(serde_json::Value::as_str)
            .map(String::from),
        tarball: tarball.to_string(),
        dependencies,
    })
}
