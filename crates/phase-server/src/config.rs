//! Configuration management for the Phase server

use anyhow::{Context, Result};
use phase_edms::EdmsConfig;
use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database URL (default: sqlite://./data/phase.db?mode=rwc)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum database connections (default: 10)
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// CORS allowed origins (comma-separated). If empty, mirror_request is used (dev mode).
    pub cors_allowed_origins: Option<String>,

    /// Review workflow, listing, import and search settings
    #[serde(default)]
    pub edms: EdmsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite://./data/phase.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup, defaults for anything unset
    fn from_lookup<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(name: &str, value: Option<String>) -> Result<Option<T>> {
            value
                .map(|v| {
                    v.trim()
                        .parse::<T>()
                        .map_err(|_| anyhow::anyhow!("Invalid value for {}: '{}'", name, v))
                })
                .transpose()
        }
        let get = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        let number = |name: &str| parsed(name, get(name));

        let mut edms = EdmsConfig::new();
        if let Some(days) = number("REVIEW_DURATION_DAYS")? {
            edms.review_duration_days = days;
        }
        if let Some(days) = number("PRIORITARY_REVIEW_DURATION_DAYS")? {
            edms.prioritary_review_duration_days = days;
        }
        if let Some(paginate_by) = parsed("PAGINATE_BY", get("PAGINATE_BY"))? {
            edms.paginate_by = paginate_by;
        }
        if let Some(root) = get("IMPORT_ROOT") {
            edms.import_root = root;
        }
        if let Some(enabled) = get("SEARCH_ENABLED") {
            edms.search.enabled = enabled.eq_ignore_ascii_case("true") || enabled == "1";
        }
        if let Some(url) = get("SEARCH_URL") {
            edms.search.url = url;
        }
        if let Some(index) = get("SEARCH_INDEX") {
            edms.search.index = index;
        }
        if let Some(bulk_size) = parsed("SEARCH_BULK_SIZE", get("SEARCH_BULK_SIZE"))? {
            edms.search.bulk_size = bulk_size;
        }
        if let Some(timeout) = parsed("SEARCH_TIMEOUT_SECS", get("SEARCH_TIMEOUT_SECS"))? {
            edms.search.timeout_secs = timeout;
        }
        if edms.search.bulk_size == 0 {
            anyhow::bail!("SEARCH_BULK_SIZE must be greater than zero");
        }

        Ok(Self {
            host: get("PHASE_SERVER_HOST").unwrap_or_else(default_host),
            port: parsed("PHASE_SERVER_PORT", get("PHASE_SERVER_PORT"))?
                .unwrap_or_else(default_port),
            database_url: get("DATABASE_URL").unwrap_or_else(default_database_url),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"))?
                .unwrap_or_else(default_max_connections),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
            edms,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::from_toml(&content)
    }

    /// Parse a TOML configuration, defaults for anything missing
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config file")?;
        Ok(config)
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url, "sqlite://./data/phase.db?mode=rwc");
        assert_eq!(config.edms.review_duration_days, 13);
        assert!(!config.edms.search.enabled);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PHASE_SERVER_PORT", "9000"),
            ("REVIEW_DURATION_DAYS", "10"),
            ("SEARCH_ENABLED", "true"),
            ("SEARCH_BULK_SIZE", "50"),
            ("SEARCH_TIMEOUT_SECS", "3"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.edms.review_duration_days, 10);
        assert_eq!(config.edms.prioritary_review_duration_days, 5);
        assert!(config.edms.search.enabled);
        assert_eq!(config.edms.search.bulk_size, 50);
        assert_eq!(config.edms.search.timeout_secs, 3);
        assert_eq!(
            config.cors_allowed_origins.as_deref(),
            Some("http://localhost:3000")
        );
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PAGINATE_BY", "many")])).unwrap_err();
        assert!(err.to_string().contains("PAGINATE_BY"));
        assert!(Config::from_lookup(lookup(&[("SEARCH_BULK_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
port = 7000
database_url = "sqlite::memory:"

[edms]
paginate_by = 20

[edms.search]
enabled = true
index = "phase"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.edms.paginate_by, 20);
        assert_eq!(config.edms.review_duration_days, 13);
        assert!(config.edms.search.enabled);
        assert_eq!(config.edms.search.index, "phase");
        assert_eq!(config.edms.search.bulk_size, 150);
    }
}
