//! The sole authority for session state: creation, claiming, progress,
//! terminal transitions, and disk-backed persistence.
//!
//! Mutations take a short-held `parking_lot::RwLock` over the in-memory
//! cache to update the record, then persist the updated snapshot to disk
//! outside the lock. This keeps the hot path (progress updates during a
//! running pipeline) lock-contention-free across sessions while still
//! serializing writes to a single session's own record.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::fs;

use vd_artifacts::store::names;
use vd_artifacts::ArtifactStore;
use vd_domain::error::{Error, Result};
use vd_domain::keyframe::Keyframe;
use vd_domain::session::{DocPayload, Session, SessionError, SessionStatus, SessionSummary, SourceSpec, SttPreference};
use vd_domain::trace::TraceEvent;
use vd_domain::transcript::TranscriptSegment;

/// Everything the generate stage produced, bundled for a single
/// `complete()` call so the session's terminal snapshot is written once.
pub struct CompletionOutputs {
    pub doc_payload: DocPayload,
    pub artifact_paths: HashMap<String, String>,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub keyframes: Vec<Keyframe>,
    pub stt_adapter_used: Option<String>,
}

/// Caller-supplied fields for a new session.
pub struct NewSessionMetadata {
    pub mode: String,
    pub title: String,
    pub language: Option<String>,
    pub stt_preference: SttPreference,
    pub source: SourceSpec,
}

/// An optional filter for `list`. `None` in any field means "don't
/// filter on this dimension".
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub mode: Option<String>,
}

impl SessionFilter {
    fn matches(&self, s: &Session) -> bool {
        if let Some(status) = self.status {
            if s.status != status {
                return false;
            }
        }
        if let Some(mode) = &self.mode {
            if &s.mode != mode {
                return false;
            }
        }
        true
    }
}

pub struct SessionManager {
    cache: RwLock<HashMap<String, Session>>,
    /// Id of the most recently `running` session observed, used to answer
    /// `GetActive` without a full cache scan.
    most_recent_active: RwLock<Option<String>>,
    artifacts: ArtifactStore,
}

impl SessionManager {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            most_recent_active: RwLock::new(None),
            artifacts,
        }
    }

    async fn persist(&self, session: &Session) -> Result<()> {
        let dir = self.artifacts.session_root(&session.id).await?;
        self.artifacts.put_json(&dir, names::SESSION, session).await?;
        Ok(())
    }

    /// Creates a new session. `id` must not already be tracked.
    pub async fn create(&self, id: impl Into<String>, meta: NewSessionMetadata) -> Result<Session> {
        let id = id.into();
        {
            let cache = self.cache.read();
            if cache.contains_key(&id) {
                return Err(Error::Internal(format!("session id '{id}' already in use")));
            }
        }
        let session = Session::new(
            id.clone(),
            meta.mode,
            meta.title,
            meta.language,
            meta.stt_preference,
            meta.source,
        );
        self.cache.write().insert(id.clone(), session.clone());
        self.persist(&session).await?;
        Ok(session)
    }

    /// Transitions `draft|queued -> running`. Idempotent while already
    /// `running`.
    pub async fn claim(&self, id: &str) -> Result<Session> {
        let updated = {
            let mut cache = self.cache.write();
            let session = cache
                .get_mut(id)
                .ok_or_else(|| Error::Internal(format!("unknown session '{id}'")))?;
            if !session.status.can_transition_to(SessionStatus::Running) {
                return Err(Error::Internal(format!(
                    "session '{id}' cannot be claimed from status {:?}",
                    session.status
                )));
            }
            session.status = SessionStatus::Running;
            session.stage_label = "claimed".into();
            session.last_updated = Utc::now();
            session.clone()
        };
        *self.most_recent_active.write() = Some(id.to_string());
        TraceEvent::start(id, "claim").log();
        self.persist(&updated).await?;
        Ok(updated)
    }

    /// Rejects a non-monotone progress update. No-op (but still an error)
    /// once the session has reached a terminal state.
    pub async fn update_progress(&self, id: &str, stage_label: &str, progress: u8) -> Result<()> {
        let updated = {
            let mut cache = self.cache.write();
            let session = cache
                .get_mut(id)
                .ok_or_else(|| Error::Internal(format!("unknown session '{id}'")))?;
            if session.status.is_terminal() {
                return Err(Error::Internal(format!(
                    "session '{id}' is already terminal; no further progress accepted"
                )));
            }
            if progress < session.progress {
                return Err(Error::Internal(format!(
                    "non-monotone progress update for '{id}': {} -> {progress}",
                    session.progress
                )));
            }
            session.progress = progress;
            session.stage_label = stage_label.to_string();
            session.last_updated = Utc::now();
            session.clone()
        };
        self.persist(&updated).await
    }

    pub async fn complete(&self, id: &str, outputs: CompletionOutputs) -> Result<Session> {
        let updated = {
            let mut cache = self.cache.write();
            let session = cache
                .get_mut(id)
                .ok_or_else(|| Error::Internal(format!("unknown session '{id}'")))?;
            session.status = SessionStatus::Completed;
            session.progress = 100;
            session.stage_label = "completed".into();
            session.doc_payload = Some(outputs.doc_payload);
            session.artifact_paths = outputs.artifact_paths;
            session.transcript_segments = outputs.transcript_segments;
            session.keyframes = outputs.keyframes;
            session.stt_adapter_used = outputs.stt_adapter_used;
            session.last_updated = Utc::now();
            session.clone()
        };
        TraceEvent::end(id, "persist", 0).log();
        self.persist(&updated).await?;
        Ok(updated)
    }

    pub async fn fail(&self, id: &str, error_kind: &str, message: &str, stage: &str) -> Result<Session> {
        let updated = {
            let mut cache = self.cache.write();
            let session = cache
                .get_mut(id)
                .ok_or_else(|| Error::Internal(format!("unknown session '{id}'")))?;
            session.status = SessionStatus::Failed;
            session.stage_label = format!("failed:{stage}");
            session.error = Some(SessionError {
                kind: error_kind.to_string(),
                message: message.to_string(),
                stage: stage.to_string(),
            });
            session.last_updated = Utc::now();
            session.clone()
        };
        TraceEvent::error(id, stage, message).log();
        self.persist(&updated).await?;
        Ok(updated)
    }

    /// Allowed from `queued` or `running`.
    pub async fn cancel(&self, id: &str) -> Result<Session> {
        let updated = {
            let mut cache = self.cache.write();
            let session = cache
                .get_mut(id)
                .ok_or_else(|| Error::Internal(format!("unknown session '{id}'")))?;
            if !session.status.can_transition_to(SessionStatus::Cancelled) {
                return Err(Error::Internal(format!(
                    "session '{id}' cannot be cancelled from status {:?}",
                    session.status
                )));
            }
            session.status = SessionStatus::Cancelled;
            session.stage_label = "cancelled".into();
            session.last_updated = Utc::now();
            session.clone()
        };
        self.persist(&updated).await?;
        Ok(updated)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.cache.read().get(id).cloned()
    }

    /// Falls back to disk on a cache miss, e.g. after a process restart.
    pub async fn get_or_load(&self, id: &str) -> Result<Option<Session>> {
        if let Some(s) = self.get(id) {
            return Ok(Some(s));
        }
        let dir = self.artifacts.session_root(id).await?;
        if !self.artifacts.exists(&dir, names::SESSION) {
            return Ok(None);
        }
        let session: Session = self.artifacts.get_json(&dir, names::SESSION).await?;
        self.cache.write().insert(id.to_string(), session.clone());
        Ok(Some(session))
    }

    pub fn list(&self, filter: &SessionFilter) -> Vec<SessionSummary> {
        self.cache
            .read()
            .values()
            .filter(|s| filter.matches(s))
            .map(SessionSummary::from)
            .collect()
    }

    /// Returns the most recently active non-terminal session, if any.
    pub fn get_active(&self) -> Option<Session> {
        let candidate = self.most_recent_active.read().clone()?;
        let cache = self.cache.read();
        let session = cache.get(&candidate)?;
        if session.status.is_terminal() {
            None
        } else {
            Some(session.clone())
        }
    }

    /// Scans the in-memory cache for `running` sessions whose
    /// `last_updated` is older than `stale_threshold_sec` and promotes
    /// them to `failed(StaleTimeout)`. Returns the ids reclaimed.
    pub async fn sweep_zombies(&self, stale_threshold_sec: u64) -> Vec<String> {
        let now = Utc::now();
        let stale_ids: Vec<String> = {
            let cache = self.cache.read();
            cache
                .values()
                .filter(|s| s.status == SessionStatus::Running)
                .filter(|s| {
                    let idle = now.signed_duration_since(s.last_updated).num_seconds().max(0) as u64;
                    idle > stale_threshold_sec
                })
                .map(|s| s.id.clone())
                .collect()
        };
        for id in &stale_ids {
            let idle_sec = {
                let cache = self.cache.read();
                cache
                    .get(id)
                    .map(|s| now.signed_duration_since(s.last_updated).num_seconds() as f64)
                    .unwrap_or(0.0)
            };
            let err = Error::StaleTimeout { idle_sec };
            let _ = self.fail(id, err.kind(), &err.to_string(), "sweep").await;
        }
        stale_ids
    }

    /// Path where this manager's artifacts live, for adapters that need
    /// to resolve a session's directory without going through the store.
    pub fn artifact_root(&self) -> PathBuf {
        self.artifacts.root().to_path_buf()
    }

    /// Scans the artifact root for previously persisted sessions and
    /// loads each into the cache. A one-shot CLI process starts with an
    /// empty cache; `list`/`get_active` need this to see sessions a prior
    /// invocation created before they can answer anything.
    pub async fn hydrate_from_disk(&self) -> Result<usize> {
        let root = self.artifacts.root();
        if !root.exists() {
            return Ok(0);
        }
        let mut entries = fs::read_dir(root).await.map_err(Error::Io)?;
        let mut loaded = 0;
        while let Some(entry) = entries.next_entry().await.map_err(Error::Io)? {
            if !entry.file_type().await.map_err(Error::Io)?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            if self.get_or_load(&id).await?.is_some() {
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, SessionManager) {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        (tmp, SessionManager::new(store))
    }

    fn meta() -> NewSessionMetadata {
        NewSessionMetadata {
            mode: "general_doc".into(),
            title: "Demo".into(),
            language: Some("en".into()),
            stt_preference: SttPreference::Auto,
            source: SourceSpec::Local { path: "/tmp/in.mp4".into() },
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        let s = mgr.get("s1").unwrap();
        assert_eq!(s.status, SessionStatus::Draft);
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        assert!(mgr.create("s1", meta()).await.is_err());
    }

    #[tokio::test]
    async fn claim_then_progress_then_complete() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        mgr.update_progress("s1", "probe", 5).await.unwrap();
        mgr.update_progress("s1", "transcribe", 35).await.unwrap();
        let done = mgr
            .complete(
                "s1",
                CompletionOutputs {
                    doc_payload: DocPayload::Markdown { text: "# Doc".into() },
                    artifact_paths: HashMap::new(),
                    transcript_segments: Vec::new(),
                    keyframes: Vec::new(),
                    stt_adapter_used: Some("local".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.progress, 100);
    }

    #[tokio::test]
    async fn non_monotone_progress_is_rejected() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        mgr.update_progress("s1", "transcribe", 35).await.unwrap();
        assert!(mgr.update_progress("s1", "probe", 5).await.is_err());
    }

    #[tokio::test]
    async fn progress_rejected_after_terminal() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        mgr.fail("s1", "Internal", "boom", "probe").await.unwrap();
        assert!(mgr.update_progress("s1", "probe", 10).await.is_err());
    }

    #[tokio::test]
    async fn cancel_allowed_from_running() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        let cancelled = mgr.cancel("s1").await.unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
    }

    #[tokio::test]
    async fn get_active_returns_most_recently_claimed_nonterminal() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        let active = mgr.get_active().unwrap();
        assert_eq!(active.id, "s1");
    }

    #[tokio::test]
    async fn get_active_is_none_once_terminal() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        mgr.cancel("s1").await.unwrap();
        assert!(mgr.get_active().is_none());
    }

    #[tokio::test]
    async fn sweep_promotes_stale_running_session_to_failed() {
        let (_tmp, mgr) = manager();
        mgr.create("s1", meta()).await.unwrap();
        mgr.claim("s1").await.unwrap();
        {
            let mut cache = mgr.cache.write();
            let s = cache.get_mut("s1").unwrap();
            s.last_updated = Utc::now() - chrono::Duration::seconds(900);
        }
        let reclaimed = mgr.sweep_zombies(600).await;
        assert_eq!(reclaimed, vec!["s1".to_string()]);
        let s = mgr.get("s1").unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        assert_eq!(s.error.unwrap().kind, "StaleTimeout");
    }

    #[tokio::test]
    async fn hydrate_from_disk_loads_sessions_created_by_a_prior_process() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let mgr = SessionManager::new(store);
        mgr.create("s1", meta()).await.unwrap();
        mgr.create("s2", meta()).await.unwrap();

        let store2 = ArtifactStore::new(tmp.path());
        let mgr2 = SessionManager::new(store2);
        let loaded = mgr2.hydrate_from_disk().await.unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(mgr2.list(&SessionFilter::default()).len(), 2);
    }

    #[tokio::test]
    async fn get_or_load_recovers_from_disk_on_cache_miss() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let mgr = SessionManager::new(store);
        mgr.create("s1", meta()).await.unwrap();

        let store2 = ArtifactStore::new(tmp.path());
        let mgr2 = SessionManager::new(store2);
        let loaded = mgr2.get_or_load("s1").await.unwrap();
        assert!(loaded.is_some());
    }
}
