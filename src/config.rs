use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{IngestError, Result};

pub const DEFAULT_API_BASE: &str = "https://api-web.nhle.com/v1";
const DEFAULT_REQUEST_DELAY_MS: u64 = 150;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub season_override: Option<String>,
    pub api_base: String,
    pub request_delay: Duration,
    pub http_timeout: Duration,
}

impl Config {
    /// Reads `.env.local`/`.env`, the process environment, then command-line flags.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        let args = env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(&args, |key| env::var(key).ok())
    }

    pub fn from_sources<F>(args: &[String], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_url = flag_value(args, "--db")
            .or_else(|| non_blank(lookup("DATABASE_URL")))
            .ok_or_else(|| {
                IngestError::Configuration("DATABASE_URL is not set".to_string())
            })?;

        let season_override =
            flag_value(args, "--season").or_else(|| non_blank(lookup("NHL_SEASON")));

        let api_base = non_blank(lookup("NHL_API_BASE"))
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let request_delay = Duration::from_millis(
            parse_u64(lookup("NHL_REQUEST_DELAY_MS")).unwrap_or(DEFAULT_REQUEST_DELAY_MS),
        );
        let http_timeout = Duration::from_secs(
            parse_u64(lookup("NHL_HTTP_TIMEOUT_SECS"))
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        Ok(Config {
            db_path: db_path_from_url(&db_url),
            season_override,
            api_base,
            request_delay,
            http_timeout,
        })
    }
}

pub fn db_path_from_url(url: &str) -> PathBuf {
    let trimmed = url.trim();
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    PathBuf::from(path)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64(value: Option<String>) -> Option<u64> {
    value?.trim().parse::<u64>().ok()
}
