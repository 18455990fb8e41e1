//! Session store: the on-disk protocol for multi-process
//! coordination of a single debate session.
//!
//! Layout under the configured temp root:
//! `ai_debates/<user_hash>/<session_id>/{session_metadata.json, .sequence,
//! locks/, <participant>/, artifacts/{code_samples,diagrams,references}/}`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DebateError, DebateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    Idle,
    #[serde(rename = "ROUND")]
    Round,
    Consensus,
    Escalation,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Consensus | SessionState::Escalation)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Round => write!(f, "ROUND"),
            SessionState::Consensus => write!(f, "CONSENSUS"),
            SessionState::Escalation => write!(f, "ESCALATION"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub state: SessionState,
    pub current_round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consensus_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_method: Option<String>,
    #[serde(default)]
    pub user_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

impl SessionMetadata {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            created_at: now,
            updated_at: now,
            state: SessionState::Idle,
            current_round: 0,
            request: None,
            file_paths: Vec::new(),
            context: None,
            consensus_score: None,
            analysis_method: None,
            user_override: false,
            outcome: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub path: PathBuf,
    pub sequence: u64,
}

/// Computes the stable per-user directory segment: first 8 hex chars
/// of SHA-256 over the OS username.
pub fn user_hash() -> String {
    let name = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let digest = Sha256::digest(name.as_bytes());
    hex_prefix(&digest, 8)
}

fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()[..n].to_string()
}

/// Rejects any session id containing a path separator, `..`, or a
/// null byte.
fn validate_session_id(id: &str) -> DebateResult<()> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.contains('\0')
    {
        return Err(DebateError::invalid_input(format!(
            "invalid session id: {id:?}"
        )));
    }
    Ok(())
}

pub struct SessionStore {
    root: PathBuf,
    lock_timeout: Duration,
}

impl SessionStore {
    pub fn new(temp_root: impl Into<PathBuf>, lock_timeout: Duration) -> Self {
        Self {
            root: temp_root.into().join(user_hash()),
            lock_timeout,
        }
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    pub fn create_session(&self, session_id: &str) -> DebateResult<PathBuf> {
        validate_session_id(session_id)?;
        let dir = self.session_dir(session_id);
        for sub in [
            "locks",
            "artifacts/code_samples",
            "artifacts/diagrams",
            "artifacts/references",
        ] {
            fs::create_dir_all(dir.join(sub)).map_err(|e| DebateError::io(&dir, e))?;
        }
        let seq_path = dir.join(".sequence");
        if !seq_path.exists() {
            fs::write(&seq_path, "0").map_err(|e| DebateError::io(&seq_path, e))?;
        }
        let meta_path = dir.join("session_metadata.json");
        if !meta_path.exists() {
            self.write_metadata(session_id, &SessionMetadata::new(session_id))?;
        }
        Ok(dir)
    }

    fn lock_path(&self, session_id: &str, name: &str) -> PathBuf {
        self.session_dir(session_id).join("locks").join(name)
    }

    fn with_lock<T>(&self, lock_file: &Path, f: impl FnOnce() -> DebateResult<T>) -> DebateResult<T> {
        if let Some(parent) = lock_file.parent() {
            fs::create_dir_all(parent).map_err(|e| DebateError::io(parent, e))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_file)
            .map_err(|e| DebateError::io(lock_file, e))?;

        let poll_interval = Duration::from_millis(20);
        let start = std::time::Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if start.elapsed() < self.lock_timeout => {
                    std::thread::sleep(poll_interval);
                }
                Err(_) => {
                    return Err(DebateError::lock_timeout(
                        lock_file,
                        self.lock_timeout.as_secs(),
                    ))
                }
            }
        }
        let result = f();
        let _ = fs2::FileExt::unlock(&file);
        result
    }

    /// Returns a value strictly greater than every previous successful
    /// call for this session.
    pub fn get_next_sequence(&self, session_id: &str) -> DebateResult<u64> {
        let dir = self.session_dir(session_id);
        let seq_path = dir.join(".sequence");
        let lock_path = self.lock_path(session_id, ".sequence.lock");
        self.with_lock(&lock_path, || {
            let current: u64 = fs::read_to_string(&seq_path)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
            let next = current + 1;
            fs::write(&seq_path, next.to_string()).map_err(|e| DebateError::io(&seq_path, e))?;
            Ok(next)
        })
    }

    pub fn write_proposal(
        &self,
        session_id: &str,
        participant: &str,
        round: u32,
        content: &str,
    ) -> DebateResult<WriteResult> {
        validate_participant(participant)?;
        let dir = self.session_dir(session_id);
        let participant_dir = dir.join(participant);
        fs::create_dir_all(&participant_dir).map_err(|e| DebateError::io(&participant_dir, e))?;

        let lock_name = format!(".{participant}_{round}.lock");
        let lock_path = self.lock_path(session_id, &lock_name);
        self.with_lock(&lock_path, || {
            let sequence = self.get_next_sequence(session_id)?;
            let path = participant_dir.join(format!("round_{round}_seq_{sequence:03}.md"));
            fs::write(&path, content).map_err(|e| DebateError::io(&path, e))?;
            Ok(WriteResult { path, sequence })
        })
    }

    pub fn read_proposal(
        &self,
        session_id: &str,
        participant: &str,
        round: u32,
    ) -> DebateResult<Option<String>> {
        validate_participant(participant)?;
        let participant_dir = self.session_dir(session_id).join(participant);
        if !participant_dir.exists() {
            return Ok(None);
        }
        let prefix = format!("round_{round}_seq_");
        let mut best: Option<(u64, PathBuf)> = None;
        for entry in fs::read_dir(&participant_dir).map_err(|e| DebateError::io(&participant_dir, e))? {
            let entry = entry.map_err(|e| DebateError::io(&participant_dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(seq_str) = name
                .strip_prefix(&prefix)
                .and_then(|s| s.strip_suffix(".md"))
            {
                if let Ok(seq) = seq_str.parse::<u64>() {
                    if best.as_ref().map(|(s, _)| seq > *s).unwrap_or(true) {
                        best = Some((seq, entry.path()));
                    }
                }
            }
        }
        match best {
            Some((_, path)) => {
                let content = fs::read_to_string(&path).map_err(|e| DebateError::io(&path, e))?;
                Ok(Some(content))
            }
            None => Ok(None),
        }
    }

    pub fn write_metadata(&self, session_id: &str, metadata: &SessionMetadata) -> DebateResult<()> {
        let dir = self.session_dir(session_id);
        fs::create_dir_all(&dir).map_err(|e| DebateError::io(&dir, e))?;
        let path = dir.join("session_metadata.json");
        let mut to_write = metadata.clone();
        to_write.updated_at = Utc::now();
        let json = serde_json::to_string_pretty(&to_write)
            .map_err(|e| DebateError::config(format!("failed to serialize metadata: {e}")))?;
        fs::write(&path, json).map_err(|e| DebateError::io(&path, e))
    }

    pub fn read_metadata(&self, session_id: &str) -> DebateResult<SessionMetadata> {
        let path = self.session_dir(session_id).join("session_metadata.json");
        let content = fs::read_to_string(&path).map_err(|e| DebateError::io(&path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| DebateError::config(format!("corrupt session metadata: {e}")))
    }

    pub fn mark_user_override(&self, session_id: &str) -> DebateResult<()> {
        let mut meta = self.read_metadata(session_id)?;
        meta.user_override = true;
        self.write_metadata(session_id, &meta)
    }

    /// Removes session directories whose `created_at` is older than
    /// `max_age_days`. Individually-corrupt sessions are skipped, not
    /// fatal.
    pub fn cleanup(&self, max_age_days: u32) -> DebateResult<u32> {
        if !self.root.exists() {
            return Ok(0);
        }
        let cutoff = Utc::now() - chrono::Duration::days(max_age_days as i64);
        let mut removed = 0;
        let entries = fs::read_dir(&self.root).map_err(|e| DebateError::io(&self.root, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let session_id = match path.file_name().and_then(|n| n.to_str()) {
                Some(s) => s,
                None => continue,
            };
            let meta = match self.read_metadata(session_id) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if meta.created_at < cutoff && fs::remove_dir_all(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn validate_participant(participant: &str) -> DebateResult<()> {
    if participant.is_empty() || participant.contains('/') || participant.contains("..") {
        return Err(DebateError::invalid_input(format!(
            "invalid participant label: {participant:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store(dir: &Path) -> SessionStore {
        SessionStore::new(dir.to_path_buf(), Duration::from_secs(2))
    }

    #[test]
    fn create_session_builds_required_tree() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        let dir = s.create_session("abc").unwrap();
        assert!(dir.join("locks").is_dir());
        assert!(dir.join(".sequence").is_file());
        assert!(dir.join("session_metadata.json").is_file());
        assert!(dir.join("artifacts/code_samples").is_dir());
    }

    #[test]
    fn create_session_rejects_traversal() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        assert!(s.create_session("../evil").is_err());
        assert!(s.create_session("a/b").is_err());
        assert!(!tmp.path().join("evil").exists());
    }

    #[test]
    fn sequence_is_monotonic() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        let a = s.get_next_sequence("sess").unwrap();
        let b = s.get_next_sequence("sess").unwrap();
        let c = s.get_next_sequence("sess").unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn missing_sequence_file_treated_as_zero() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        let dir = s.create_session("sess").unwrap();
        fs::remove_file(dir.join(".sequence")).unwrap();
        let next = s.get_next_sequence("sess").unwrap();
        assert_eq!(next, 1);
    }

    #[test]
    fn read_proposal_returns_latest_write() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        s.write_proposal("sess", "claude", 1, "A").unwrap();
        s.write_proposal("sess", "claude", 1, "B").unwrap();
        let content = s.read_proposal("sess", "claude", 1).unwrap();
        assert_eq!(content.as_deref(), Some("B"));
    }

    #[test]
    fn read_proposal_missing_round_is_none() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        let content = s.read_proposal("sess", "claude", 9).unwrap();
        assert_eq!(content, None);
    }

    #[test]
    fn write_proposal_rejects_bad_participant() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        assert!(s.write_proposal("sess", "../x", 1, "c").is_err());
    }

    #[test]
    fn metadata_round_trips() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        let mut meta = s.read_metadata("sess").unwrap();
        meta.state = SessionState::Consensus;
        meta.consensus_score = Some(92.5);
        s.write_metadata("sess", &meta).unwrap();
        let reloaded = s.read_metadata("sess").unwrap();
        assert_eq!(reloaded.state, SessionState::Consensus);
        assert_eq!(reloaded.consensus_score, Some(92.5));
    }

    #[test]
    fn user_override_is_terminal_for_gating() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("sess").unwrap();
        s.mark_user_override("sess").unwrap();
        let meta = s.read_metadata("sess").unwrap();
        assert!(meta.user_override);
    }

    #[test]
    fn session_state_is_terminal_for_consensus_and_escalation() {
        assert!(SessionState::Consensus.is_terminal());
        assert!(SessionState::Escalation.is_terminal());
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Round.is_terminal());
    }

    #[test]
    fn cleanup_removes_old_sessions_only() {
        let tmp = tempdir().unwrap();
        let s = store(tmp.path());
        s.create_session("old").unwrap();
        let mut meta = s.read_metadata("old").unwrap();
        meta.created_at = Utc::now() - chrono::Duration::days(30);
        s.write_metadata("old", &meta).unwrap();

        s.create_session("fresh").unwrap();

        let removed = s.cleanup(7).unwrap();
        assert_eq!(removed, 1);
        assert!(!s.session_dir("old").exists());
        assert!(s.session_dir("fresh").exists());
    }
}
