use std::path::PathBuf;
use std::time::Duration;

use crate::error::{IngestError, Result};

const APP_DIR: &str = "riot_ingest";
const DB_FILE: &str = "matches.sqlite";
const DEFAULT_ROUTING: &str = "americas";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Settings shared by the riot client and the match store.
///
/// Built once by the entry point and handed to the constructors that need it.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub account_routing: String,
    pub regional_routing: String,
    /// Replaces `https://{routing}.api.riotgames.com` when set.
    pub base_url: Option<String>,
    pub request_timeout: Duration,
    pub db_path: PathBuf,
}

impl Config {
    pub fn new(api_key: impl Into<String>, db_path: impl Into<PathBuf>) -> Self {
        Self {
            api_key: api_key.into(),
            account_routing: DEFAULT_ROUTING.to_string(),
            regional_routing: DEFAULT_ROUTING.to_string(),
            base_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            db_path: db_path.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every key through `lookup`, so tests can feed a map instead of the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = read("RIOT_API_KEY").ok_or(IngestError::Config { key: "RIOT_API_KEY" })?;
        let db_path = match read("MATCH_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_db_path().ok_or(IngestError::Config {
                key: "MATCH_DB_PATH",
            })?,
        };

        let timeout_secs = match read("RIOT_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| IngestError::Config {
                key: "RIOT_HTTP_TIMEOUT_SECS",
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut config = Self::new(api_key, db_path);
        if let Some(routing) = read("RIOT_ACCOUNT_ROUTING") {
            config.account_routing = routing;
        }
        if let Some(routing) = read("RIOT_REGIONAL_ROUTING") {
            config.regional_routing = routing;
        }
        config.base_url = read("RIOT_API_BASE_URL").map(|url| url.trim_end_matches('/').to_string());
        config.request_timeout = Duration::from_secs(timeout_secs.max(1));
        Ok(config)
    }
}

// Hand-written so the api key never lands in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("account_routing", &self.account_routing)
            .field("regional_routing", &self.regional_routing)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("db_path", &self.db_path)
            .finish()
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}
