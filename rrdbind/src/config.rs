//! Client configuration.
//!
//! The only setting is the caching daemon address. librrd's own tools read
//! it from `RRDCACHED_ADDRESS`, so [`Config::from_env`] does the same.

use serde::{Deserialize, Serialize};

/// Environment variable naming the rrdcached address.
pub const DAEMON_ENV: &str = "RRDCACHED_ADDRESS";

/// Settings for building a [`crate::Client`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// rrdcached address (`unix:/path/to/socket`, `host:port`). `None`
    /// works on local files only.
    #[serde(default)]
    pub daemon: Option<String>,
}

impl Config {
    /// Reads the daemon address from `RRDCACHED_ADDRESS`. An unset or empty
    /// variable means no daemon.
    pub fn from_env() -> Self {
        Self::from_daemon_var(std::env::var(DAEMON_ENV).ok())
    }

    fn from_daemon_var(value: Option<String>) -> Self {
        let daemon = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Self { daemon }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_daemon_var() {
        assert_eq!(Config::from_daemon_var(None).daemon, None);
        assert_eq!(Config::from_daemon_var(Some("  ".into())).daemon, None);
        assert_eq!(
            Config::from_daemon_var(Some("unix:/run/rrdcached.sock\n".into())).daemon,
            Some("unix:/run/rrdcached.sock".to_string())
        );
    }

    #[test]
    fn test_deserialize() {
        let config: Config = serde_json::from_str(r#"{"daemon":"127.0.0.1:42217"}"#).unwrap();
        assert_eq!(config.daemon.as_deref(), Some("127.0.0.1:42217"));

        let empty: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Config::default());
    }
}
