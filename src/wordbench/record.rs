//! Per-episode result records and the results index built from them.
//!
//! Each finished episode is written as one pretty-printed JSON file,
//! `<results_dir>/<episode_id>.json`. [`collect_results`] gathers every record into the single
//! JSON array the dashboard reads, splitting `provider/name` model identifiers on the way.
//!
//! ```text
//! {
//!   "episode_id": "7d0c...",
//!   "game": "bracket",
//!   "puzzle_id": "2025-06-07",
//!   "model_name": "openai/gpt-4.1-mini",
//!   "step_count": 12,
//!   "step_limit": 50,
//!   "won": true,
//!   "started_at": "2025-06-07T12:00:00Z",
//!   "duration_secs": 84.2,
//!   "token_usage": { "input_tokens": 9100, "output_tokens": 410, "total_tokens": 9510 },
//!   "stats": { "parsed_moves": 10, "healed_moves": 1, "parse_failures": 1, "rejected_moves": 0 }
//! }
//! ```

use crate::client_wrapper::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum RecordError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Io(err) => write!(f, "Result store I/O error: {}", err),
            RecordError::Json(err) => write!(f, "Result record JSON error: {}", err),
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::Io(err) => Some(err),
            RecordError::Json(err) => Some(err),
        }
    }
}

impl From<io::Error> for RecordError {
    fn from(err: io::Error) -> Self {
        RecordError::Io(err)
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(err: serde_json::Error) -> Self {
        RecordError::Json(err)
    }
}

/// How each turn of an episode ended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Replies that parsed without healing.
    pub parsed_moves: usize,
    /// Replies that parsed after one healing call.
    pub healed_moves: usize,
    /// Turns where no move could be recovered.
    pub parse_failures: usize,
    /// Well-formed moves the puzzle refused.
    pub rejected_moves: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_id: String,
    pub game: String,
    pub puzzle_id: String,
    pub model_name: String,
    pub step_count: usize,
    pub step_limit: usize,
    pub won: bool,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub token_usage: TokenUsage,
    pub stats: EpisodeStats,
}

/// Directory of episode records, one JSON file each.
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ResultStore { dir: dir.into() }
    }

    /// Write `record` and return the path it landed at.
    pub fn save(&self, record: &EpisodeRecord) -> Result<PathBuf, RecordError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", record.episode_id));
        fs::write(&path, serde_json::to_string_pretty(record)?)?;
        log::info!("Wrote episode record to {}", path.display());
        Ok(path)
    }

    /// Load every `*.json` record, sorted by start time.
    pub fn load_all(&self) -> Result<Vec<EpisodeRecord>, RecordError> {
        let mut records = Vec::new();
        if !self.dir.is_dir() {
            return Ok(records);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(&path)?;
            records.push(serde_json::from_str::<EpisodeRecord>(&text)?);
        }
        records.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(records)
    }
}

/// One row of the dashboard index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsIndexEntry {
    #[serde(flatten)]
    pub record: EpisodeRecord,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model_provider: Option<String>,
}

impl From<EpisodeRecord> for ResultsIndexEntry {
    fn from(mut record: EpisodeRecord) -> Self {
        let split = record
            .model_name
            .split_once('/')
            .map(|(provider, name)| (provider.to_string(), name.to_string()));
        let model_provider = match split {
            Some((provider, name)) => {
                record.model_name = name;
                Some(provider)
            }
            None => None,
        };
        ResultsIndexEntry {
            record,
            model_provider,
        }
    }
}

/// Build the dashboard index from `store` and write it to `out`.
pub fn collect_results(store: &ResultStore, out: &Path) -> Result<Vec<ResultsIndexEntry>, RecordError> {
    let entries: Vec<ResultsIndexEntry> = store
        .load_all()?
        .into_iter()
        .map(ResultsIndexEntry::from)
        .collect();
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(out, serde_json::to_string(&entries)?)?;
    log::info!("Collected {} results into {}", entries.len(), out.display());
    Ok(entries)
}
