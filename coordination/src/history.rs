//! History store: append-only per-debate records plus
//! an index for fast lookup by file and by detected pattern.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::content_hash;
use crate::error::{DebateError, DebateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Succeeded,
    Failed,
    Abandoned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub file_path: String,
    pub content_hash: String,
    pub file_size: usize,
    pub request: String,
    pub focus_areas: Vec<String>,
    pub consensus_score: f64,
    pub interpretation: String,
    pub recommendation: String,
    pub score_difference: f64,
    pub participant_scores: HashMap<String, f64>,
    pub disagreements: Vec<String>,
    pub agreements: Vec<String>,
    pub analysis_time_ms: u128,
    /// Normalized to plain pattern-name strings throughout, never a
    /// mix of dict-shaped and string-shaped values.
    pub patterns_detected: Vec<String>,
    pub outcome: Outcome,
    pub outcome_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateIndex {
    pub all_debates: Vec<String>,
    pub by_file: HashMap<String, Vec<String>>,
    /// Populated at save time from `patterns_detected` -- a gap-fill
    /// versus the reference, which declares this key but never writes
    /// to it.
    pub by_pattern: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_debates: usize,
    pub average_consensus: f64,
    pub outcome_counts: HashMap<String, usize>,
    pub pattern_frequency: HashMap<String, usize>,
}

pub struct HistoryStore {
    debates_dir: PathBuf,
    metadata_dir: PathBuf,
}

fn generate_debate_id(file_path: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.f");
    let short_hash = &content_hash(file_path)[..8];
    format!("{timestamp}_{short_hash}")
}

impl HistoryStore {
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = cache_root.into().join("debate_history");
        Self {
            debates_dir: root.join("debates"),
            metadata_dir: root.join("metadata"),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.metadata_dir.join("debate_index.json")
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.debates_dir.join(format!("{id}.json"))
    }

    fn load_index(&self) -> DebateIndex {
        fs::read_to_string(self.index_path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn save_index(&self, index: &DebateIndex) -> DebateResult<()> {
        fs::create_dir_all(&self.metadata_dir).map_err(|e| DebateError::io(&self.metadata_dir, e))?;
        let json = serde_json::to_string_pretty(index)
            .map_err(|e| DebateError::config(format!("failed to serialize index: {e}")))?;
        fs::write(self.index_path(), json).map_err(|e| DebateError::io(self.index_path(), e))
    }

    /// Saves a new debate record, generating its id and updating the
    /// index (including `by_pattern`).
    pub fn save_debate(&self, mut record: DebateRecord) -> DebateResult<String> {
        if record.id.is_empty() {
            record.id = generate_debate_id(&record.file_path);
        }
        fs::create_dir_all(&self.debates_dir).map_err(|e| DebateError::io(&self.debates_dir, e))?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| DebateError::config(format!("failed to serialize debate record: {e}")))?;
        fs::write(self.record_path(&record.id), json)
            .map_err(|e| DebateError::io(self.record_path(&record.id), e))?;

        let mut index = self.load_index();
        index.all_debates.push(record.id.clone());
        index
            .by_file
            .entry(record.file_path.clone())
            .or_default()
            .push(record.id.clone());
        for pattern in &record.patterns_detected {
            index
                .by_pattern
                .entry(pattern.clone())
                .or_default()
                .push(record.id.clone());
        }
        self.save_index(&index)?;
        Ok(record.id)
    }

    pub fn load_debate(&self, id: &str) -> DebateResult<DebateRecord> {
        let path = self.record_path(id);
        let content = fs::read_to_string(&path).map_err(|e| DebateError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| DebateError::config(format!("corrupt debate record: {e}")))
    }

    pub fn update_outcome(&self, id: &str, outcome: Outcome, notes: Option<String>) -> DebateResult<()> {
        let mut record = self.load_debate(id)?;
        record.outcome = outcome;
        record.outcome_notes = notes;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| DebateError::config(format!("failed to serialize debate record: {e}")))?;
        fs::write(self.record_path(id), json).map_err(|e| DebateError::io(self.record_path(id), e))
    }

    /// Debates for a given file, most recent first, bounded by `limit`.
    pub fn debates_for_file(&self, file_path: &str, limit: usize) -> DebateResult<Vec<DebateRecord>> {
        let index = self.load_index();
        let mut ids = index.by_file.get(file_path).cloned().unwrap_or_default();
        let mut records: Vec<DebateRecord> = ids
            .drain(..)
            .filter_map(|id| self.load_debate(&id).ok())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    pub fn debates_with_pattern(&self, pattern: &str, limit: usize) -> DebateResult<Vec<DebateRecord>> {
        let index = self.load_index();
        let mut ids = index.by_pattern.get(pattern).cloned().unwrap_or_default();
        let mut records: Vec<DebateRecord> = ids
            .drain(..)
            .filter_map(|id| self.load_debate(&id).ok())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    pub fn all_debates(&self, limit: usize) -> DebateResult<Vec<DebateRecord>> {
        let index = self.load_index();
        let mut records: Vec<DebateRecord> = index
            .all_debates
            .iter()
            .filter_map(|id| self.load_debate(id).ok())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    pub fn statistics(&self) -> DebateResult<Statistics> {
        let records = self.all_debates(usize::MAX)?;
        if records.is_empty() {
            return Ok(Statistics::default());
        }
        let total_debates = records.len();
        let average_consensus =
            records.iter().map(|r| r.consensus_score).sum::<f64>() / total_debates as f64;

        let mut outcome_counts = HashMap::new();
        let mut pattern_frequency = HashMap::new();
        for record in &records {
            let key = format!("{:?}", record.outcome).to_lowercase();
            *outcome_counts.entry(key).or_insert(0) += 1;
            for pattern in &record.patterns_detected {
                *pattern_frequency.entry(pattern.clone()).or_insert(0) += 1;
            }
        }

        Ok(Statistics {
            total_debates,
            average_consensus,
            outcome_counts,
            pattern_frequency,
        })
    }
}
