use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent to the npm registry.
pub const USER_AGENT: &str = concat!("pak/", env!("CARGO_PKG_VERSION"));

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("pak {VERSION}");

    if let Some(hash) = option_env!("PAK_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_version_string_contains_version() {
        let vs = version_string();
        assert!(vs.contains(VERSION));
        assert!(vs.starts_with("pak "));
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("pak/"));
        assert!(USER_AGENT.ends_with(VERSION));
    }
}
