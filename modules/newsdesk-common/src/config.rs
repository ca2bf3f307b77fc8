use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "config/newsdesk.toml";

/// Application configuration loaded from environment variables.
/// Contains only secrets and env-specific values; models, dedup tuning and
/// prompts live in the TOML [`FileConfig`](crate::FileConfig).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub config_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .context("ANTHROPIC_API_KEY is required")?,
            config_path: std::env::var("NEWSDESK_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  DATABASE_URL: {}", redact_url(&self.database_url));
        tracing::info!("  NEWSDESK_CONFIG: {}", self.config_path.display());
    }
}

fn preview(val: &str) -> String {
    let n = val
        .char_indices()
        .nth(5)
        .map(|(i, _)| i)
        .unwrap_or(val.len());
    format!("{}...({} chars)", &val[..n], val.len())
}

/// Drop credentials from a connection URL, keeping scheme and host.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
