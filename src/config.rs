use std::str::FromStr;

use anyhow::Context;

use crate::query::page::{PageLimits, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` runs the server on the in-process store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub page_limits: PageLimits,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let page_limits = PageLimits {
            default_limit: env_or("DEFAULT_PAGE_LIMIT", DEFAULT_LIMIT)?,
            max_limit: env_or("MAX_PAGE_LIMIT", MAX_LIMIT)?,
        };
        anyhow::ensure!(
            0 < page_limits.default_limit && page_limits.default_limit <= page_limits.max_limit,
            "DEFAULT_PAGE_LIMIT must be between 1 and MAX_PAGE_LIMIT"
        );

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            page_limits,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
            host: "0.0.0.0".into(),
            port: 8080,
            page_limits: PageLimits::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key}={raw:?}")),
        Err(_) => Ok(default),
    }
}
