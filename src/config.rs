use chrono::NaiveTime;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::sources;

/// Service configuration derived from environment variables (a `.env` file is
/// honored at startup).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Allowed `X-API-Key` values. Empty ⇒ auth disabled.
    pub api_keys: Vec<String>,

    /// Directory holding the canonical per-source raw files.
    pub data_dir: PathBuf,
    /// Directory with the static API documentation served at `/api-docs`.
    pub docs_dir: PathBuf,

    /// Remote source URLs, keyed by the env var named in the source registry.
    pub source_urls: HashMap<&'static str, String>,
    pub fetch_timeout_s: u64,

    // ── Scheduled refresh ──────────────────────────────────────────
    pub stocks_refresh_at: NaiveTime,
    pub rates_refresh_at: NaiveTime,
    /// Fixed UTC offset (minutes) the daily times are interpreted in.
    pub sched_utc_offset_minutes: i32,
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u16(name: &str, default: u16) -> u16 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_time(name: &str, default: NaiveTime) -> NaiveTime {
    env::var(name)
        .ok()
        .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let mut source_urls = HashMap::new();
        for spec in sources::SPECS {
            let Some(key) = spec.url_env else { continue };
            if let Some(url) = env::var(key)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
            {
                source_urls.insert(key, url);
            }
        }

        let api_keys = env_str("VALID_API_KEYS", "")
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            host: env_str("HOST", "0.0.0.0"),
            port: env_u16("PORT", 3000),
            api_keys,
            data_dir: PathBuf::from(env_str("DATA_DIR", "data")),
            docs_dir: PathBuf::from(env_str("DOCS_DIR", "docs")),
            source_urls,
            fetch_timeout_s: env_u64("FETCH_TIMEOUT_S", 30),
            stocks_refresh_at: env_time("STOCKS_REFRESH_AT", two_am()),
            rates_refresh_at: env_time("RATES_REFRESH_AT", three_am()),
            sched_utc_offset_minutes: env_i32("SCHED_UTC_OFFSET_MINUTES", 60),
        }
    }
}

fn two_am() -> NaiveTime {
    NaiveTime::from_hms_opt(2, 0, 0).expect("valid default time")
}

fn three_am() -> NaiveTime {
    NaiveTime::from_hms_opt(3, 0, 0).expect("valid default time")
}

#[cfg(test)]
pub(crate) fn test_config(data_dir: PathBuf) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_keys: Vec::new(),
        data_dir,
        docs_dir: PathBuf::from("docs"),
        source_urls: HashMap::new(),
        fetch_timeout_s: 5,
        stocks_refresh_at: two_am(),
        rates_refresh_at: three_am(),
        sched_utc_offset_minutes: 60,
    }
}
