use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    /// Transient storage for uploaded files. Each request writes one
    /// uniquely named file here and deletes it before responding.
    pub upload_dir: String,
    pub model: String,
    pub max_tokens: u32,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "claude-3-sonnet-20240229".to_string()),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .unwrap_or_else(|_| "500".to_string())
                .parse::<u32>()
                .context("LLM_MAX_TOKENS must be a positive integer")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
