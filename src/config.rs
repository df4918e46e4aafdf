//! Server configuration

use std::time::Duration;

const ENV_PREFIX: &str = "API_STAT_";

/// Server configuration. Every field can be overridden through an
/// `API_STAT_<FIELD>` environment variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub listen_addr: String,
    /// How often registry callbacks (gauges) run.
    pub collect_interval_ms: u64,
    /// Lifetime of a stored big response.
    pub brs_ttl_secs: u64,
    /// Responses with more rows than this are split into stored chunks.
    pub chunk_rows: usize,
    pub log_filter: String,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}: expected a positive integer, got {value:?}")]
    InvalidNumber { var: String, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            collect_interval_ms: 1_000,
            brs_ttl_secs: 300,
            chunk_rows: 1_000,
            log_filter: "info,api_stat=debug".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        let var = |field: &str| {
            let key = format!("{ENV_PREFIX}{}", field.to_uppercase());
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, v)) = var("listen_addr") {
            cfg.listen_addr = v;
        }
        if let Some((_, v)) = var("log_filter") {
            cfg.log_filter = v;
        }
        if let Some((k, v)) = var("collect_interval_ms") {
            cfg.collect_interval_ms = parse_positive(k, v)?;
        }
        if let Some((k, v)) = var("brs_ttl_secs") {
            cfg.brs_ttl_secs = parse_positive(k, v)?;
        }
        if let Some((k, v)) = var("chunk_rows") {
            cfg.chunk_rows = parse_positive(k, v)? as usize;
        }
        Ok(cfg)
    }

    pub fn collect_interval(&self) -> Duration {
        Duration::from_millis(self.collect_interval_ms)
    }

    pub fn brs_ttl(&self) -> Duration {
        Duration::from_secs(self.brs_ttl_secs)
    }
}

fn parse_positive(var: String, value: String) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
