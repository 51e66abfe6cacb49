pub mod config;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod logging;
pub mod match_record;
pub mod match_store;
pub mod riot_client;

pub use config::Config;
pub use error::{IngestError, Result};
pub use ingest::{DEFAULT_MATCH_COUNT, IngestSummary, MatchSink, MatchSource, ingest};
pub use match_record::{MatchRecord, PlayerHandle, normalize};
pub use match_store::{MatchStore, SaveOutcome};
pub use riot_client::RiotClient;
