use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{IngestError, Result};
use crate::http_client::riot_http_client;
use crate::ingest::MatchSource;
use crate::match_record::PlayerHandle;

/// Largest `count` the match-v5 ids endpoint accepts.
pub const MAX_MATCH_COUNT: u32 = 100;

#[derive(Debug, Deserialize)]
struct AccountDto {
    #[serde(default)]
    puuid: Option<String>,
}

/// Blocking client for the three Riot endpoints used by ingestion.
pub struct RiotClient {
    client: Client,
    account_routing: String,
    regional_routing: String,
    base_url: Option<String>,
}

impl RiotClient {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: riot_http_client(&config.api_key, config.request_timeout)?,
            account_routing: config.account_routing.clone(),
            regional_routing: config.regional_routing.clone(),
            base_url: config.base_url.clone(),
        })
    }

    /// Riot ID to PUUID via account-v1.
    pub fn resolve_account(&self, game_name: &str, tag_line: &str) -> Result<String> {
        let url = self.endpoint(
            &self.account_routing,
            &[
                "riot",
                "account",
                "v1",
                "accounts",
                "by-riot-id",
                game_name,
                tag_line,
            ],
        )?;
        let body = self.get(url)?;
        parse_account(&body)
    }

    /// Most recent match ids first, exactly as Riot orders them.
    pub fn list_recent_matches(&self, puuid: &str, count: u32) -> Result<Vec<String>> {
        if count > MAX_MATCH_COUNT {
            return Err(IngestError::InvalidCount { count });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut url = self.endpoint(
            &self.regional_routing,
            &["lol", "match", "v5", "matches", "by-puuid", puuid, "ids"],
        )?;
        url.query_pairs_mut()
            .append_pair("count", &count.to_string());
        let body = self.get(url)?;
        parse_match_ids(&body)
    }

    pub fn fetch_match(&self, match_id: &str) -> Result<Value> {
        let url = self.endpoint(
            &self.regional_routing,
            &["lol", "match", "v5", "matches", match_id],
        )?;
        let body = self.get(url)?;
        parse_json(&body, "match")
    }

    fn endpoint(&self, routing: &str, segments: &[&str]) -> Result<Url> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => format!("https://{routing}.api.riotgames.com"),
        };
        let bad_base = || IngestError::Config {
            key: "RIOT_API_BASE_URL",
        };
        let mut url = Url::parse(&base).map_err(|_| bad_base())?;
        url.path_segments_mut()
            .map_err(|_| bad_base())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> Result<String> {
        debug!(path = url.path(), "riot request");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(IngestError::transport("request failed"))?;
        let status = resp.status();
        if !status.is_success() {
            // Keep the status even when the error body cannot be read.
            return check_status(status, resp.text().unwrap_or_default());
        }
        let body = resp
            .text()
            .map_err(IngestError::transport("failed reading body"))?;
        check_status(status, body)
    }
}

impl MatchSource for RiotClient {
    fn resolve_account(&self, handle: &PlayerHandle) -> Result<String> {
        RiotClient::resolve_account(self, &handle.game_name, &handle.tag_line)
    }

    fn list_recent_matches(&self, puuid: &str, count: u32) -> Result<Vec<String>> {
        RiotClient::list_recent_matches(self, puuid, count)
    }

    fn fetch_match(&self, match_id: &str) -> Result<Value> {
        RiotClient::fetch_match(self, match_id)
    }
}

fn check_status(status: StatusCode, body: String) -> Result<String> {
    if !status.is_success() {
        return Err(IngestError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn parse_json(body: &str, what: &'static str) -> Result<Value> {
    serde_json::from_str::<Value>(body.trim()).map_err(|_| IngestError::MalformedPayload { field: what })
}

pub fn parse_account(body: &str) -> Result<String> {
    let account = serde_json::from_str::<AccountDto>(body.trim())
        .map_err(|_| IngestError::MalformedPayload { field: "account" })?;
    account
        .puuid
        .filter(|puuid| !puuid.trim().is_empty())
        .ok_or(IngestError::MissingField { field: "puuid" })
}

pub fn parse_match_ids(body: &str) -> Result<Vec<String>> {
    serde_json::from_str::<Vec<String>>(body.trim())
        .map_err(|_| IngestError::MalformedPayload { field: "match ids" })
}
