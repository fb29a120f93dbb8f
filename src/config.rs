//! TOML configuration plus environment-supplied credentials.
//!
//! Non-secret settings (endpoints, timeouts, candidate tables, bind address)
//! live in a TOML file. Every section has defaults, so a missing file is not
//! an error. Secrets are read from the environment and never from the file:
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `AIRTABLE_BASE_ID` | Data-store base identifier (required) |
//! | `AIRTABLE_API_KEY` | Data-store bearer token (required) |
//! | `CLAUDE_API_KEY` | Language-model API key |
//! | `BRAVE_API_KEY` | Optional Brave Search token |
//! | `SERPAPI_KEY` | Optional SerpAPI key |
//! | `PORT` | Overrides the port of `[server].bind` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    pub base_url: String,
    /// Candidate table names, probed in order until one returns records.
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_store_url(),
            tables: default_tables(),
            timeout_secs: default_store_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "https://api.airtable.com/v0".to_string()
}
fn default_tables() -> Vec<String> {
    [
        "List of Cos",
        "companies_full_history_safe",
        "Companies",
        "Imported table",
        "Portfolio Companies",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_store_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_model_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_model_timeout() -> u64 {
    45
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_max_results() -> usize {
    3
}
fn default_search_timeout() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Opaque secrets taken from the environment. Blank values are `None`.
#[derive(Clone, Default)]
pub struct Credentials {
    pub store_base_id: Option<String>,
    pub store_api_key: Option<String>,
    pub model_api_key: Option<String>,
    pub brave_api_key: Option<String>,
    pub serpapi_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Credentials")
            .field("store_base_id", &mask(&self.store_base_id))
            .field("store_api_key", &mask(&self.store_api_key))
            .field("model_api_key", &mask(&self.model_api_key))
            .field("brave_api_key", &mask(&self.brave_api_key))
            .field("serpapi_key", &mask(&self.serpapi_key))
            .finish()
    }
}

impl Credentials {
    /// Read credentials through `lookup`, trimming values and dropping blanks.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            store_base_id: get("AIRTABLE_BASE_ID"),
            store_api_key: get("AIRTABLE_API_KEY"),
            model_api_key: get("CLAUDE_API_KEY"),
            brave_api_key: get("BRAVE_API_KEY"),
            serpapi_key: get("SERPAPI_KEY"),
        }
    }
}

impl Config {
    /// All defaults, no credentials.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Apply environment overrides: credentials and the `PORT` variable.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").map(|p| p.trim().to_string()) {
            if !port.is_empty() {
                let host = self
                    .server
                    .bind
                    .rsplit_once(':')
                    .map(|(h, _)| h.to_string())
                    .unwrap_or_else(|| "0.0.0.0".to_string());
                self.server.bind = format!("{}:{}", host, port);
            }
        }
        self.credentials = Credentials::from_lookup(lookup);
    }

    /// Fails unless both data-store credentials are present.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.credentials.store_base_id.is_none() || self.credentials.store_api_key.is_none() {
            anyhow::bail!(
                "Missing Airtable credentials: set AIRTABLE_BASE_ID and AIRTABLE_API_KEY"
            );
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.store.tables.is_empty() {
            anyhow::bail!("store.tables must list at least one table name");
        }
        if self.store.timeout_secs == 0
            || self.model.timeout_secs == 0
            || self.search.timeout_secs == 0
        {
            anyhow::bail!("timeout_secs must be > 0");
        }
        if self.model.max_tokens == 0 {
            anyhow::bail!("model.max_tokens must be > 0");
        }
        if !(1..=3).contains(&self.search.max_results) {
            anyhow::bail!("search.max_results must be in [1, 3]");
        }
        Ok(())
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::minimal()
    };

    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

/// Parse and validate TOML configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.store.tables.len(), 5);
        assert_eq!(cfg.store.tables[0], "List of Cos");
        assert_eq!(cfg.store.timeout_secs, 30);
        assert_eq!(cfg.search.timeout_secs, 15);
        assert_eq!(cfg.model.timeout_secs, 45);
        assert_eq!(cfg.model.max_tokens, 4000);
        assert_eq!(cfg.search.max_results, 3);
    }

    #[test]
    fn test_partial_override() {
        let cfg = parse_config(
            r#"
[store]
tables = ["Deals"]

[model]
max_tokens = 1000
"#,
        )
        .unwrap();
        assert_eq!(cfg.store.tables, vec!["Deals".to_string()]);
        assert_eq!(cfg.model.max_tokens, 1000);
        assert_eq!(cfg.model.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(parse_config("[store]\ntables = []").is_err());
        assert!(parse_config("[model]\nmax_tokens = 0").is_err());
        assert!(parse_config("[search]\nmax_results = 0").is_err());
        assert!(parse_config("[search]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_credentials_trimmed_and_blank_dropped() {
        let creds = Credentials::from_lookup(lookup_from(&[
            ("AIRTABLE_BASE_ID", "  app123  "),
            ("AIRTABLE_API_KEY", "key"),
            ("BRAVE_API_KEY", "   "),
        ]));
        assert_eq!(creds.store_base_id.as_deref(), Some("app123"));
        assert_eq!(creds.store_api_key.as_deref(), Some("key"));
        assert!(creds.brave_api_key.is_none());
        assert!(creds.serpapi_key.is_none());
        assert!(creds.model_api_key.is_none());
    }

    #[test]
    fn test_missing_store_credentials_fail_validation() {
        let mut cfg = Config::minimal();
        cfg.apply_env(lookup_from(&[("AIRTABLE_BASE_ID", "app123")]));
        assert!(cfg.validate_credentials().is_err());

        cfg.apply_env(lookup_from(&[
            ("AIRTABLE_BASE_ID", "app123"),
            ("AIRTABLE_API_KEY", "key"),
        ]));
        assert!(cfg.validate_credentials().is_ok());
    }

    #[test]
    fn test_port_overrides_bind() {
        let mut cfg = Config::minimal();
        cfg.apply_env(lookup_from(&[("PORT", "9090")]));
        assert_eq!(cfg.server.bind, "0.0.0.0:9090");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let creds = Credentials::from_lookup(lookup_from(&[("CLAUDE_API_KEY", "sk-secret")]));
        let dbg = format!("{:?}", creds);
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<set>"));
    }
}
