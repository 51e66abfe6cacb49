use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Everything that can abort an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Riot answered with a non-success status.
    #[error("riot api error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("response is missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("malformed match payload: `{field}` is absent or has the wrong type")]
    MalformedPayload { field: &'static str },

    #[error("storage error: {context}")]
    Storage {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("transport error: {context}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("match count {count} is outside 0..={max}", max = crate::riot_client::MAX_MATCH_COUNT)]
    InvalidCount { count: u32 },

    #[error("invalid riot id {input:?}, expected name#tag")]
    InvalidRiotId { input: String },

    #[error("configuration key {key} is missing or invalid")]
    Config { key: &'static str },
}

impl IngestError {
    pub(crate) fn storage(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| Self::Storage { context, source }
    }

    pub(crate) fn transport(context: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Transport { context, source }
    }
}
