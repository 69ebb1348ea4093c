use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::export::{ExportOptions, ManagerConfig};
use crate::layout::PageSize;

/// Exporter configuration loaded from environment variables.
/// Every variable is optional; unset ones fall back to the manager defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_concurrent: usize,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub cache_enabled: bool,
    pub cache_max_size: usize,
    pub cache_ttl_ms: u64,
    pub task_retention: usize,
    pub default_template: String,
    pub page_size: Option<PageSize>,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = ManagerConfig::default();
        Self {
            max_concurrent: defaults.max_concurrent,
            timeout_ms: defaults.timeout.as_millis() as u64,
            retry_attempts: defaults.retry_attempts,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
            cache_enabled: defaults.cache_enabled,
            cache_max_size: defaults.cache_max_size,
            cache_ttl_ms: defaults.cache_ttl.as_millis() as u64,
            task_retention: defaults.task_retention,
            default_template: defaults.default_options.template_id,
            page_size: None,
            rust_log: defaults.log_level,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        Ok(Config {
            max_concurrent: parse_or(&lookup, "EXPORT_MAX_CONCURRENT", defaults.max_concurrent)?,
            timeout_ms: parse_or(&lookup, "EXPORT_TIMEOUT_MS", defaults.timeout_ms)?,
            retry_attempts: parse_or(&lookup, "EXPORT_RETRY_ATTEMPTS", defaults.retry_attempts)?,
            retry_delay_ms: parse_or(&lookup, "EXPORT_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
            cache_enabled: parse_or(&lookup, "EXPORT_CACHE_ENABLED", defaults.cache_enabled)?,
            cache_max_size: parse_or(&lookup, "EXPORT_CACHE_MAX_SIZE", defaults.cache_max_size)?,
            cache_ttl_ms: parse_or(&lookup, "EXPORT_CACHE_TTL_MS", defaults.cache_ttl_ms)?,
            task_retention: parse_or(&lookup, "EXPORT_TASK_RETENTION", defaults.task_retention)?,
            default_template: lookup("EXPORT_DEFAULT_TEMPLATE").unwrap_or(defaults.default_template),
            page_size: lookup("EXPORT_PAGE_SIZE")
                .map(|raw| {
                    raw.parse::<PageSize>()
                        .map_err(|e| anyhow!(e))
                        .context("EXPORT_PAGE_SIZE must be one of A3, A4, Letter, Legal")
                })
                .transpose()?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
        })
    }

    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            default_options: ExportOptions {
                template_id: self.default_template.clone(),
                page_size: self.page_size,
                ..Default::default()
            },
            cache_enabled: self.cache_enabled,
            cache_max_size: self.cache_max_size,
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            max_concurrent: self.max_concurrent.max(1),
            timeout: Duration::from_millis(self.timeout_ms),
            retry_attempts: self.retry_attempts.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            task_retention: self.task_retention,
            log_level: self.rust_log.clone(),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
