// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "PRICE_SYNC_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/price_sync.toml";

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const MAX_CONCURRENCY: usize = 64;

fn default_timeout_secs() -> u64 {
    20
}
fn default_currency() -> String {
    crate::pricing::http::DEFAULT_CURRENCY.to_string()
}
fn default_table() -> String {
    "products".to_string()
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_history_capacity() -> usize {
    20
}

/// Runtime settings for the sync service.
///
/// Non-secret values usually live in `config/price_sync.toml`; every field can
/// be overridden from the environment (see `apply_env`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub provider_base_url: Option<String>,
    #[serde(default)]
    pub provider_api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub provider_timeout_secs: u64,
    #[serde(default = "default_currency")]
    pub default_currency: String,

    #[serde(default)]
    pub catalog_url: Option<String>,
    #[serde(default)]
    pub catalog_key: Option<String>,
    #[serde(default = "default_table")]
    pub catalog_table: String,
    #[serde(default = "default_timeout_secs")]
    pub catalog_timeout_secs: u64,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Shared secret the trigger endpoint requires. `None` locks the endpoint.
    #[serde(default)]
    pub sync_secret: Option<String>,
    /// Run periodically when set.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            provider_base_url: None,
            provider_api_key: None,
            provider_timeout_secs: default_timeout_secs(),
            default_currency: default_currency(),
            catalog_url: None,
            catalog_key: None,
            catalog_table: default_table(),
            catalog_timeout_secs: default_timeout_secs(),
            concurrency: DEFAULT_CONCURRENCY,
            sync_secret: None,
            interval_secs: None,
            history_capacity: default_history_capacity(),
        }
    }
}

impl SyncConfig {
    /// Load `.env`, then the config file, then environment overrides:
    /// 1) $PRICE_SYNC_CONFIG_PATH (must exist)
    /// 2) config/price_sync.toml (if present)
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            Self::from_file(&pb)?
        } else {
            let default_p = Path::new(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::from_file(default_p)?
            } else {
                Self::default()
            }
        };

        cfg.apply_env(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sync config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing sync config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("PROVIDER_BASE_URL") {
            self.provider_base_url = Some(v);
        }
        if let Some(v) = get("PROVIDER_API_KEY") {
            self.provider_api_key = Some(v);
        }
        if let Some(v) = get("PROVIDER_TIMEOUT_SECS") {
            self.provider_timeout_secs = parse_num("PROVIDER_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PROVIDER_CURRENCY") {
            self.default_currency = v;
        }
        if let Some(v) = get("SUPABASE_URL") {
            self.catalog_url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.catalog_key = Some(v);
        }
        if let Some(v) = get("CATALOG_TABLE") {
            self.catalog_table = v;
        }
        if let Some(v) = get("CATALOG_TIMEOUT_SECS") {
            self.catalog_timeout_secs = parse_num("CATALOG_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("SYNC_CONCURRENCY") {
            self.concurrency = parse_num("SYNC_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("SYNC_SECRET") {
            self.sync_secret = Some(v);
        }
        if let Some(v) = get("SYNC_INTERVAL_SECS") {
            self.interval_secs = Some(parse_num("SYNC_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = get("SYNC_HISTORY_CAPACITY") {
            self.history_capacity = parse_num("SYNC_HISTORY_CAPACITY", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            bail!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            );
        }
        if self.provider_timeout_secs == 0 || self.catalog_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if self.interval_secs == Some(0) {
            bail!("interval_secs must be positive when set");
        }
        if self.catalog_table.trim().is_empty() {
            bail!("catalog_table must not be blank");
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> Result<T> {
    v.parse::<T>()
        .map_err(|_| anyhow!("{key} must be a non-negative integer, got {v:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = SyncConfig::default();
        assert_eq!(cfg.concurrency, 10);
        assert_eq!(cfg.catalog_table, "products");
        assert_eq!(cfg.default_currency, "CLP");
        assert!(cfg.sync_secret.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn toml_then_env_overrides() {
        let mut cfg = SyncConfig::from_toml_str(
            r#"
provider_base_url = "https://prices.example.test/api"
concurrency = 4
catalog_table = "componentes"
"#,
        )
        .unwrap();
        assert_eq!(cfg.concurrency, 4);

        cfg.apply_env(env_of(&[
            ("SYNC_CONCURRENCY", "6"),
            ("SYNC_SECRET", " s3cret "),
            ("PROVIDER_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(cfg.concurrency, 6);
        assert_eq!(cfg.sync_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.catalog_table, "componentes");
        assert!(cfg.provider_api_key.is_none(), "blank env values are ignored");
    }

    #[test]
    fn rejects_bad_numbers_and_unknown_keys() {
        let mut cfg = SyncConfig::default();
        assert!(cfg.apply_env(env_of(&[("SYNC_CONCURRENCY", "ten")])).is_err());
        assert!(SyncConfig::from_toml_str("concurency = 3").is_err());
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let cfg = SyncConfig {
            concurrency: 0,
            ..SyncConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
