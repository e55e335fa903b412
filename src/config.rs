use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/api";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub http_timeout_ms: u64,
    pub default_window_hours: u32,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let raw_base = env_optional("TILTED_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_base).context("invalid TILTED_API_BASE_URL")?;

        let http_timeout_ms = env_u64("TILTED_HTTP_TIMEOUT_MS", 5000)?;
        let default_window_hours = u32::try_from(env_u64("TILTED_DEFAULT_WINDOW_HOURS", 24)?)
            .context("TILTED_DEFAULT_WINDOW_HOURS out of range")?;

        Ok(Self {
            api_base_url,
            http_timeout_ms,
            default_window_hours,
        })
    }

    pub fn with_base_url(base: &str) -> Result<Self> {
        Ok(Self {
            api_base_url: parse_base_url(base)?,
            http_timeout_ms: 5000,
            default_window_hours: 24,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

/// Parses the API root and makes sure it ends in `/` so relative joins keep
/// the `/api` prefix.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("API base URL is empty"));
    }
    let mut url = Url::parse(trimmed).with_context(|| format!("invalid URL {trimmed}"))?;
    if url.cannot_be_a_base() {
        return Err(anyhow!("{trimmed} cannot be used as a base URL"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env_optional(key) {
        Some(value) => value.parse::<u64>().with_context(|| format!("invalid {key}")),
        None => Ok(default),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
