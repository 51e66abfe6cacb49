use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use riot_ingest::riot_client::MAX_MATCH_COUNT;
use riot_ingest::{Config, DEFAULT_MATCH_COUNT, MatchStore, PlayerHandle, RiotClient, ingest};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    riot_ingest::logging::init_tracing("riot_ingest=info")?;

    let mut config = Config::from_env().context("load configuration")?;
    if let Some(db_path) = arg_value("--db") {
        config.db_path = PathBuf::from(db_path);
    }

    let count = match arg_value("--count") {
        Some(raw) => parse_count(&raw)?,
        None => DEFAULT_MATCH_COUNT,
    };
    let raw_id = match arg_value("--riot-id") {
        Some(id) => id,
        None => prompt_riot_id()?,
    };
    let handle: PlayerHandle = raw_id.parse()?;

    let client = RiotClient::new(&config).context("build riot client")?;
    let mut store = MatchStore::open(&config.db_path)
        .with_context(|| format!("open match store {}", config.db_path.display()))?;

    let summary = ingest(&client, &mut store, &handle, count)
        .with_context(|| format!("ingest matches for {handle}"))?;

    println!("\nIngestion completed successfully!");
    println!("DB: {}", store.db_path().display());
    println!("Matches found: {}", summary.matches_found);
    println!("Matches processed: {}", summary.matches_processed);
    println!(
        "New rows: {} (already stored: {})",
        summary.matches_inserted,
        summary.matches_processed - summary.matches_inserted
    );
    Ok(())
}

fn prompt_riot_id() -> Result<String> {
    print!("Enter Riot ID (name#tag): ");
    io::stdout().flush().context("flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read riot id from stdin")?;
    Ok(line.trim().to_string())
}

fn parse_count(raw: &str) -> Result<u32> {
    let count = raw
        .trim()
        .parse::<u32>()
        .with_context(|| format!("--count expects a number, got {raw:?}"))?;
    if count > MAX_MATCH_COUNT {
        return Err(anyhow!("--count must be at most {MAX_MATCH_COUNT}"));
    }
    Ok(count)
}

/// Supports both `--flag value` and `--flag=value`.
fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
