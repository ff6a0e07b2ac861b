use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if the LLM credential is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_max_attempts: u32,
    pub llm_attempt_timeout_secs: u64,
    pub llm_backoff_base_ms: u64,
    pub regeneration_attempts: u32,
    pub enable_cache: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let llm_max_attempts: u32 = non_zero("LLM_MAX_ATTEMPTS", optional_env("LLM_MAX_ATTEMPTS", 3)?)?;
        let llm_attempt_timeout_secs: u64 = non_zero(
            "LLM_ATTEMPT_TIMEOUT_SECS",
            optional_env("LLM_ATTEMPT_TIMEOUT_SECS", 60)?,
        )?;

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_max_attempts,
            llm_attempt_timeout_secs,
            llm_backoff_base_ms: optional_env("LLM_BACKOFF_BASE_MS", 1000)?,
            regeneration_attempts: optional_env("REGENERATION_ATTEMPTS", 2)?,
            enable_cache: optional_env("ENABLE_CACHE", true)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

/// Attempt counts and timeouts of zero would fail every request.
fn non_zero<T>(key: &str, value: T) -> Result<T>
where
    T: Copy + Default + PartialEq,
{
    if value == T::default() {
        anyhow::bail!("{key} must be at least 1");
    }
    Ok(value)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value: '{raw}'"))
}
