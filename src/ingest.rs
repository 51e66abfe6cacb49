use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::match_record::{MatchRecord, PlayerHandle, normalize};
use crate::match_store::{MatchStore, SaveOutcome};

/// Default number of recent matches pulled per run.
pub const DEFAULT_MATCH_COUNT: u32 = 5;

/// Where match data comes from. [`crate::riot_client::RiotClient`] in production.
pub trait MatchSource {
    fn resolve_account(&self, handle: &PlayerHandle) -> Result<String>;
    fn list_recent_matches(&self, puuid: &str, count: u32) -> Result<Vec<String>>;
    fn fetch_match(&self, match_id: &str) -> Result<Value>;
}

/// Where normalized matches go. [`MatchStore`] in production.
pub trait MatchSink {
    fn save(&mut self, record: &MatchRecord) -> Result<SaveOutcome>;
}

impl MatchSink for MatchStore {
    fn save(&mut self, record: &MatchRecord) -> Result<SaveOutcome> {
        MatchStore::save(self, record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub puuid: String,
    pub matches_found: usize,
    pub matches_processed: usize,
    /// Processed matches that were new to the store.
    pub matches_inserted: usize,
}

/// Pulls up to `count` recent matches for one player into `sink`.
///
/// Runs strictly in listing order. The first failing match aborts the run;
/// matches saved before it stay saved and the rest are never fetched.
pub fn ingest<S, K>(
    source: &S,
    sink: &mut K,
    handle: &PlayerHandle,
    count: u32,
) -> Result<IngestSummary>
where
    S: MatchSource + ?Sized,
    K: MatchSink + ?Sized,
{
    info!(player = %handle, "searching player");
    let puuid = source.resolve_account(handle)?;
    info!("puuid found");

    let match_ids = source.list_recent_matches(&puuid, count)?;
    info!(count = match_ids.len(), "found matches");

    let mut matches_processed = 0usize;
    let mut matches_inserted = 0usize;
    for match_id in &match_ids {
        info!(%match_id, "downloading match");
        let raw = source.fetch_match(match_id)?;
        let record = normalize(&raw)?;
        match sink.save(&record)? {
            SaveOutcome::Inserted => matches_inserted += 1,
            SaveOutcome::AlreadyPresent => {
                warn!(match_id = %record.match_id, "match already stored, left unchanged");
            }
        }
        matches_processed += 1;
    }

    info!(
        processed = matches_processed,
        inserted = matches_inserted,
        "ingestion completed"
    );
    Ok(IngestSummary {
        puuid,
        matches_found: match_ids.len(),
        matches_processed,
        matches_inserted,
    })
}
