use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{IngestError, Result};

// Riot documents this as `X-Riot-Token`; `from_static` wants lowercase.
const RIOT_TOKEN_HEADER: &str = "x-riot-token";
const USER_AGENT: &str = concat!("riot_ingest/", env!("CARGO_PKG_VERSION"));

/// Builds a blocking client that sends the api key on every request.
pub fn riot_http_client(api_key: &str, timeout: Duration) -> Result<Client> {
    let mut token = HeaderValue::from_str(api_key).map_err(|_| IngestError::Config {
        key: "RIOT_API_KEY",
    })?;
    token.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(RIOT_TOKEN_HEADER), token);

    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .map_err(IngestError::transport("failed to build http client"))
}
