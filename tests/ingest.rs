use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use riot_ingest::{
    IngestError, IngestSummary, MatchRecord, MatchSink, MatchSource, MatchStore, PlayerHandle,
    Result, SaveOutcome, ingest,
};

/// In-memory stand-in for the riot api that records every call.
struct FakeSource {
    puuid: Option<String>,
    listing: Vec<String>,
    failing: HashMap<String, IngestError>,
    calls: RefCell<Vec<String>>,
}

impl FakeSource {
    fn new(listing: &[&str]) -> Self {
        Self {
            puuid: Some("puuid-1".to_string()),
            listing: listing.iter().map(|id| id.to_string()).collect(),
            failing: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn fail_fetch(mut self, match_id: &str, status: u16) -> Self {
        self.failing.insert(
            match_id.to_string(),
            IngestError::Upstream {
                status,
                body: format!("{{\"status\":{{\"status_code\":{status}}}}}"),
            },
        );
        self
    }

    fn fetches(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| call.strip_prefix("fetch:").map(str::to_string))
            .collect()
    }
}

impl MatchSource for FakeSource {
    fn resolve_account(&self, handle: &PlayerHandle) -> Result<String> {
        self.calls.borrow_mut().push(format!("resolve:{handle}"));
        self.puuid.clone().ok_or(IngestError::Upstream {
            status: 404,
            body: "account not found".to_string(),
        })
    }

    fn list_recent_matches(&self, puuid: &str, count: u32) -> Result<Vec<String>> {
        self.calls.borrow_mut().push(format!("list:{puuid}:{count}"));
        Ok(self.listing.iter().take(count as usize).cloned().collect())
    }

    fn fetch_match(&self, match_id: &str) -> Result<Value> {
        self.calls.borrow_mut().push(format!("fetch:{match_id}"));
        if let Some(err) = self.failing.get(match_id) {
            return Err(match err {
                IngestError::Upstream { status, body } => IngestError::Upstream {
                    status: *status,
                    body: body.clone(),
                },
                _ => IngestError::MissingField { field: "unexpected" },
            });
        }
        Ok(match_payload(match_id))
    }
}

/// Sink that only remembers the order of saves.
#[derive(Default)]
struct RecordingSink {
    saved: Vec<String>,
}

impl MatchSink for RecordingSink {
    fn save(&mut self, record: &MatchRecord) -> Result<SaveOutcome> {
        self.saved.push(record.match_id.clone());
        Ok(SaveOutcome::Inserted)
    }
}

fn match_payload(match_id: &str) -> Value {
    json!({
        "metadata": {"matchId": match_id},
        "info": {
            "gameDuration": 1600,
            "gameMode": "CLASSIC",
            "gameStartTimestamp": 1_718_000_000_000_i64
        }
    })
}

fn handle() -> PlayerHandle {
    PlayerHandle::new("Doublelift", "NA1")
}

fn temp_store() -> (TempDir, MatchStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = MatchStore::open(&dir.path().join("matches.sqlite")).expect("store opens");
    (dir, store)
}

fn stored_ids(store: &MatchStore) -> Vec<String> {
    let mut ids = store
        .load_matches()
        .expect("load")
        .into_iter()
        .map(|m| m.match_id)
        .collect::<Vec<_>>();
    ids.sort();
    ids
}

#[test]
fn two_matches_are_found_processed_and_stored() {
    let (_dir, mut store) = temp_store();
    let source = FakeSource::new(&["M1", "M2"]);

    let summary = ingest(&source, &mut store, &handle(), 2).expect("ingest succeeds");

    assert_eq!(
        summary,
        IngestSummary {
            puuid: "puuid-1".to_string(),
            matches_found: 2,
            matches_processed: 2,
            matches_inserted: 2,
        }
    );
    assert_eq!(stored_ids(&store), vec!["M1", "M2"]);
}

#[test]
fn stages_run_in_order_with_the_resolved_puuid() {
    let mut sink = RecordingSink::default();
    let source = FakeSource::new(&["M1"]);

    ingest(&source, &mut sink, &handle(), 5).expect("ingest succeeds");

    assert_eq!(
        *source.calls.borrow(),
        vec!["resolve:Doublelift#NA1", "list:puuid-1:5", "fetch:M1"]
    );
}

#[test]
fn saves_follow_listing_order() {
    for listing in [["M3", "M1", "M2"], ["M2", "M3", "M1"]] {
        let mut sink = RecordingSink::default();
        let source = FakeSource::new(&listing);
        ingest(&source, &mut sink, &handle(), 3).expect("ingest succeeds");
        assert_eq!(sink.saved, listing);
        assert_eq!(source.fetches(), listing);
    }
}

#[test]
fn failed_fetch_aborts_after_earlier_saves() {
    let (_dir, mut store) = temp_store();
    let source = FakeSource::new(&["M1", "M2", "M3"]).fail_fetch("M2", 503);

    let err = ingest(&source, &mut store, &handle(), 3).expect_err("M2 fails");

    assert!(matches!(err, IngestError::Upstream { status: 503, .. }));
    assert_eq!(stored_ids(&store), vec!["M1"]);
    assert_eq!(source.fetches(), vec!["M1", "M2"]);
}

#[test]
fn malformed_match_aborts_the_run() {
    struct BrokenSecond(FakeSource);
    impl MatchSource for BrokenSecond {
        fn resolve_account(&self, handle: &PlayerHandle) -> Result<String> {
            self.0.resolve_account(handle)
        }
        fn list_recent_matches(&self, puuid: &str, count: u32) -> Result<Vec<String>> {
            self.0.list_recent_matches(puuid, count)
        }
        fn fetch_match(&self, match_id: &str) -> Result<Value> {
            let mut raw = self.0.fetch_match(match_id)?;
            if match_id == "M2" {
                raw["info"]
                    .as_object_mut()
                    .expect("info object")
                    .remove("gameDuration");
            }
            Ok(raw)
        }
    }

    let mut sink = RecordingSink::default();
    let source = BrokenSecond(FakeSource::new(&["M1", "M2", "M3"]));
    let err = ingest(&source, &mut sink, &handle(), 3).expect_err("M2 is malformed");

    assert!(matches!(
        err,
        IngestError::MalformedPayload {
            field: "info.gameDuration"
        }
    ));
    assert_eq!(sink.saved, vec!["M1"]);
}

#[test]
fn unknown_player_fails_before_listing() {
    let mut sink = RecordingSink::default();
    let mut source = FakeSource::new(&["M1"]);
    source.puuid = None;

    let err = ingest(&source, &mut sink, &handle(), 5).expect_err("no account");

    assert!(matches!(err, IngestError::Upstream { status: 404, .. }));
    assert_eq!(source.calls.borrow().len(), 1);
    assert!(sink.saved.is_empty());
}

#[test]
fn rerun_leaves_row_count_unchanged() {
    let (_dir, mut store) = temp_store();
    let source = FakeSource::new(&["M1", "M2"]);

    ingest(&source, &mut store, &handle(), 2).expect("first run");
    let before = store.load_matches().expect("load");
    let second = ingest(&source, &mut store, &handle(), 2).expect("second run");

    assert_eq!(second.matches_processed, 2);
    assert_eq!(second.matches_inserted, 0);
    assert_eq!(store.count_matches().expect("count"), 2);
    assert_eq!(store.load_matches().expect("load"), before);
}

#[test]
fn zero_count_fetches_and_saves_nothing() {
    let mut sink = RecordingSink::default();
    let source = FakeSource::new(&["M1", "M2"]);

    let summary = ingest(&source, &mut sink, &handle(), 0).expect("ingest succeeds");

    assert_eq!(summary.matches_found, 0);
    assert_eq!(summary.matches_processed, 0);
    assert!(source.fetches().is_empty());
    assert!(sink.saved.is_empty());
}

#[test]
fn failed_save_aborts_before_later_fetches() {
    let (_dir, mut store) = temp_store();
    rusqlite::Connection::open(store.db_path())
        .expect("open db")
        .execute_batch(
            r#"
            CREATE TRIGGER reject_m2 BEFORE INSERT ON matches
            WHEN NEW.match_id = 'M2'
            BEGIN
                SELECT RAISE(ABORT, 'rejected');
            END;
            "#,
        )
        .expect("create trigger");
    let source = FakeSource::new(&["M1", "M2", "M3"]);

    let err = ingest(&source, &mut store, &handle(), 3).expect_err("M2 cannot be stored");

    assert!(matches!(err, IngestError::Storage { .. }), "{err:?}");
    assert_eq!(source.fetches(), vec!["M1", "M2"]);
    assert_eq!(stored_ids(&store), vec!["M1"]);
}

/// Collects the `message` of every event emitted while installed.
#[derive(Clone, Default)]
struct MessageLog(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> Layer<S> for MessageLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().expect("log lock").push(visitor.0);
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

#[test]
fn player_search_is_reported_once() {
    let log = MessageLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    let mut sink = RecordingSink::default();
    let source = FakeSource::new(&["M1"]);

    tracing::subscriber::with_default(subscriber, || {
        ingest(&source, &mut sink, &handle(), 1).expect("ingest succeeds");
    });

    let messages = log.0.lock().expect("log lock").clone();
    let searches = messages
        .iter()
        .filter(|m| m.as_str() == "searching player")
        .count();
    assert_eq!(searches, 1, "{messages:?}");
    assert_eq!(messages.last().map(String::as_str), Some("ingestion completed"));
}
