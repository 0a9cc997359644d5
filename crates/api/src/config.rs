use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use salesagent_core::agent::DEFAULT_AGENT_URL;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub default_agent_url: String,
    /// Bound on every outbound creative agent call.
    pub agent_timeout_secs: u64,
    /// In-memory registry TTL per agent.
    pub format_cache_ttl_secs: u64,
    pub format_cache_path: PathBuf,
    pub format_cache_refresh_secs: u64,
    /// Used for generative builds and AI review. Both are disabled without it.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub review_workers: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                                  |
    /// |-------------------------------|------------------------------------------|
    /// | `HOST`                        | `0.0.0.0`                                |
    /// | `PORT`                        | `8080`                                   |
    /// | `DATABASE_URL`                | required                                 |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`                  |
    /// | `REQUEST_TIMEOUT_SECS`        | `60`                                     |
    /// | `DEFAULT_CREATIVE_AGENT_URL`  | `https://creative.adcontextprotocol.org` |
    /// | `CREATIVE_AGENT_TIMEOUT_SECS` | `30`                                     |
    /// | `FORMAT_CACHE_TTL_SECS`       | `3600`                                   |
    /// | `FORMAT_CACHE_PATH`           | `data/format_cache.json`                 |
    /// | `FORMAT_CACHE_REFRESH_SECS`   | `86400`                                  |
    /// | `GEMINI_API_KEY`              | unset                                    |
    /// | `GEMINI_MODEL`                | `gemini-2.5-flash`                       |
    /// | `REVIEW_WORKERS`              | `2`                                      |
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            database_url,
            cors_origins,
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 60)?,
            default_agent_url: env_or("DEFAULT_CREATIVE_AGENT_URL", DEFAULT_AGENT_URL.to_string()),
            agent_timeout_secs: parse_env("CREATIVE_AGENT_TIMEOUT_SECS", 30)?,
            format_cache_ttl_secs: parse_env("FORMAT_CACHE_TTL_SECS", 3600)?,
            format_cache_path: PathBuf::from(env_or(
                "FORMAT_CACHE_PATH",
                "data/format_cache.json".to_string(),
            )),
            format_cache_refresh_secs: parse_env("FORMAT_CACHE_REFRESH_SECS", 86_400)?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.5-flash".to_string()),
            review_workers: parse_env("REVIEW_WORKERS", 2)?,
        })
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn parse_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
