use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime configuration shared by every package-manager adapter.
///
/// A config is fixed once an adapter has been built from it. Moving an adapter
/// to another directory produces a new adapter with a new config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the package manager runs in.
    pub cwd: PathBuf,

    /// Log level forwarded to the package manager (where it supports one).
    pub loglevel: Option<LogLevel>,

    /// Whether bare installs skip dev dependencies.
    pub environment: Environment,

    /// Registry base URL used for dependency overrides.
    pub registry: Option<String>,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

/// npm log levels, from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silly,
    Verbose,
    Info,
    Timing,
    Http,
    Notice,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silly => "silly",
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Timing => "timing",
            Self::Http => "http",
            Self::Notice => "notice",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Silent => "silent",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silly" => Ok(Self::Silly),
            "verbose" => Ok(Self::Verbose),
            "info" => Ok(Self::Info),
            "timing" => Ok(Self::Timing),
            "http" => Ok(Self::Http),
            "notice" => Ok(Self::Notice),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "silent" => Ok(Self::Silent),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Install environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Bare installs pass `--production` where supported.
    #[default]
    Production,
    Development,
}

impl Environment {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            loglevel: None,
            environment: Environment::default(),
            registry: None,
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Set the package-manager log level.
    #[must_use]
    pub fn with_loglevel(mut self, loglevel: Option<LogLevel>) -> Self {
        self.loglevel = loglevel;
        self
    }

    /// Set the install environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Set the registry URL.
    #[must_use]
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environment_is_production() {
        let config = Config::new(PathBuf::from("/project"));
        assert_eq!(config.environment, Environment::Production);
        assert!(config.loglevel.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new(PathBuf::from("/a"))
            .with_cwd(PathBuf::from("/b"))
            .with_loglevel(Some(LogLevel::Error))
            .with_environment(Environment::Development)
            .with_registry(Some("http://localhost:4873/".to_string()));

        assert_eq!(config.cwd, PathBuf::from("/b"));
        assert_eq!(config.loglevel, Some(LogLevel::Error));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.registry.as_deref(), Some("http://localhost:4873/"));
    }

    #[test]
    fn test_loglevel_parse() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("SILENT".parse::<LogLevel>(), Ok(LogLevel::Silent));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Verbose.to_string(), "verbose");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("dev".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!(
            "production".parse::<Environment>(),
            Ok(Environment::Production)
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
