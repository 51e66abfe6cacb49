use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};
use crate::match_record::MatchRecord;

/// What a [`MatchStore::save`] call did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Inserted,
    /// A row with this match id existed and was left untouched.
    AlreadyPresent,
}

/// SQLite-backed `matches` table.
///
/// Holds only the path; each call opens its own connection and drops it on return.
#[derive(Debug, Clone)]
pub struct MatchStore {
    db_path: PathBuf,
}

impl MatchStore {
    /// Ensures the parent directory and the `matches` table exist.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            warn!(dir = %parent.display(), %err, "could not create match store directory");
        }
        let store = Self {
            db_path: path.to_path_buf(),
        };
        let conn = store.connect()?;
        init_schema(&conn)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert-if-absent: the first write of a match id wins, later ones are ignored.
    pub fn save(&self, record: &MatchRecord) -> Result<SaveOutcome> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(IngestError::storage("begin save transaction"))?;
        let changed = insert_match(&tx, record)?;
        tx.commit()
            .map_err(IngestError::storage("commit save transaction"))?;

        let outcome = if changed == 0 {
            SaveOutcome::AlreadyPresent
        } else {
            SaveOutcome::Inserted
        };
        debug!(match_id = %record.match_id, ?outcome, "match saved");
        Ok(outcome)
    }

    /// Every stored match, newest start first.
    pub fn load_matches(&self) -> Result<Vec<MatchRecord>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT match_id, game_duration, game_mode, game_start
                FROM matches
                ORDER BY game_start DESC, match_id ASC
                "#,
            )
            .map_err(IngestError::storage("prepare load matches query"))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(IngestError::storage("query load matches"))?;

        let mut out = Vec::new();
        for row in rows {
            let (match_id, duration_seconds, mode, game_start) =
                row.map_err(IngestError::storage("decode match row"))?;
            let start_time = DateTime::parse_from_rfc3339(&game_start)
                .map_err(|_| IngestError::MalformedPayload {
                    field: "matches.game_start",
                })?
                .with_timezone(&Local);
            out.push(MatchRecord {
                match_id,
                duration_seconds,
                mode,
                start_time,
            });
        }
        Ok(out)
    }

    pub fn count_matches(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count = conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))
            .map_err(IngestError::storage("count matches"))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path).map_err(IngestError::storage("open sqlite db"))
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            game_duration INTEGER NOT NULL,
            game_mode TEXT NOT NULL,
            game_start TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_game_start ON matches(game_start);
        "#,
    )
    .map_err(IngestError::storage("create sqlite schema"))
}

/// UTC with fixed millisecond width, so text order is time order.
fn game_start_text(start: &DateTime<Local>) -> String {
    start
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn insert_match(tx: &rusqlite::Transaction<'_>, m: &MatchRecord) -> Result<usize> {
    tx.execute(
        r#"
        INSERT INTO matches (match_id, game_duration, game_mode, game_start)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(match_id) DO NOTHING
        "#,
        params![
            m.match_id,
            m.duration_seconds,
            m.mode,
            game_start_text(&m.start_time),
        ],
    )
    .map_err(IngestError::storage("insert match"))
}
