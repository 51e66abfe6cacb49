use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use crate::error::{IngestError, Result};

/// A Riot ID split into its display name and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerHandle {
    pub game_name: String,
    pub tag_line: String,
}

impl PlayerHandle {
    pub fn new(game_name: impl Into<String>, tag_line: impl Into<String>) -> Self {
        Self {
            game_name: game_name.into(),
            tag_line: tag_line.into(),
        }
    }
}

impl FromStr for PlayerHandle {
    type Err = IngestError;

    /// Accepts `name#tag`; exactly one `#`, both halves non-empty.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || IngestError::InvalidRiotId {
            input: s.to_string(),
        };
        let (name, tag) = s.trim().split_once('#').ok_or_else(invalid)?;
        let (name, tag) = (name.trim(), tag.trim());
        if name.is_empty() || tag.is_empty() || tag.contains('#') {
            return Err(invalid());
        }
        Ok(Self::new(name, tag))
    }
}

impl fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.game_name, self.tag_line)
    }
}

/// The slice of a match-v5 payload that gets persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: String,
    pub duration_seconds: i64,
    pub mode: String,
    pub start_time: DateTime<Local>,
}

/// Pulls a [`MatchRecord`] out of a raw match payload.
///
/// Fails on the first required field that is absent or has the wrong type;
/// nothing is returned for a partially valid payload.
pub fn normalize(raw: &Value) -> Result<MatchRecord> {
    let metadata = object_at(raw, "metadata")?;
    let info = object_at(raw, "info")?;

    let match_id = metadata
        .get("matchId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or(malformed("metadata.matchId"))?;
    let duration_seconds = info
        .get("gameDuration")
        .and_then(Value::as_i64)
        .ok_or(malformed("info.gameDuration"))?;
    let mode = info
        .get("gameMode")
        .and_then(Value::as_str)
        .ok_or(malformed("info.gameMode"))?;
    let start_ms = info
        .get("gameStartTimestamp")
        .and_then(Value::as_i64)
        .ok_or(malformed("info.gameStartTimestamp"))?;

    Ok(MatchRecord {
        match_id: match_id.to_string(),
        duration_seconds,
        mode: mode.to_string(),
        start_time: local_from_millis(start_ms).ok_or(malformed("info.gameStartTimestamp"))?,
    })
}

/// Epoch milliseconds to a local timestamp.
pub fn local_from_millis(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}

fn object_at<'a>(raw: &'a Value, field: &'static str) -> Result<&'a Value> {
    raw.get(field)
        .filter(|v| v.is_object())
        .ok_or(malformed(field))
}

fn malformed(field: &'static str) -> IngestError {
    IngestError::MalformedPayload { field }
}
