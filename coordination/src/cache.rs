//! Content-addressed response cache.
//!
//! Keyed by the first 16 hex chars of `MD5(prompt || "|" || file_hash)`.
//! A stored entry is a hit only if its recorded `file_hash` matches the
//! query's and the TTL has not elapsed; otherwise it is a miss and the
//! entry is removed.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub response: String,
    pub file_hash: String,
    pub stored_at: u64,
}

pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
}

pub fn cache_key(prompt: &str, file_hash: &str) -> String {
    let digest = md5::compute(format!("{prompt}|{file_hash}"));
    format!("{digest:x}")[..16].to_string()
}

/// 16-hex-char content hash, used for file fingerprints and debate ids.
pub fn content_hash(content: &str) -> String {
    let digest = md5::compute(content.as_bytes());
    format!("{digest:x}")[..16].to_string()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl ResponseCache {
    /// `cache_root` is the shared cache root; entries are
    /// stored under its `debates/` subtree so they don't collide with
    /// `HistoryStore`'s `debate_history/` subtree rooted at the same
    /// directory.
    pub fn new(cache_root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: cache_root.into().join("debates"),
            ttl,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn get(&self, prompt: &str, file_hash: &str) -> Option<String> {
        let key = cache_key(prompt, file_hash);
        let path = self.entry_path(&key);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = serde_json::from_str(&content).ok()?;

        let expired = now_secs().saturating_sub(entry.stored_at) > self.ttl.as_secs();
        let mismatched = entry.file_hash != file_hash;
        if expired || mismatched {
            let _ = fs::remove_file(&path);
            return None;
        }
        Some(entry.response)
    }

    /// Best-effort: I/O failures degrade performance, not correctness.
    pub fn set(&self, prompt: &str, file_hash: &str, response: &str) {
        let key = cache_key(prompt, file_hash);
        let path = self.entry_path(&key);
        if fs::create_dir_all(&self.dir).is_err() {
            return;
        }
        let entry = CacheEntry {
            response: response.to_string(),
            file_hash: file_hash.to_string(),
            stored_at: now_secs(),
        };
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = fs::write(path, json);
        }
    }

    pub fn clear_expired(&self) -> usize {
        let mut removed = 0;
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(content) = fs::read_to_string(&path) {
                if let Ok(parsed) = serde_json::from_str::<CacheEntry>(&content) {
                    if now_secs().saturating_sub(parsed.stored_at) > self.ttl.as_secs()
                        && fs::remove_file(&path).is_ok()
                    {
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                if fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let mut total = 0;
        let mut expired = 0;
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                total += 1;
                if let Ok(content) = fs::read_to_string(entry.path()) {
                    if let Ok(parsed) = serde_json::from_str::<CacheEntry>(&content) {
                        if now_secs().saturating_sub(parsed.stored_at) > self.ttl.as_secs() {
                            expired += 1;
                        }
                    }
                }
            }
        }
        CacheStats { total, expired }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
}
