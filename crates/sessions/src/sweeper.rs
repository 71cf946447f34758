//! Periodic background task that reclaims zombie sessions: any `running`
//! session whose `last_updated` has gone stale is promoted to
//! `failed(StaleTimeout)` so it stops counting against the active-session
//! view and its admission slot is freed.

use std::sync::Arc;
use std::time::Duration;

use crate::manager::SessionManager;

/// Spawns the sweeper as a detached task and returns its `JoinHandle` so
/// the caller can cancel it on shutdown.
pub fn spawn_zombie_sweeper(
    manager: Arc<SessionManager>,
    sweep_interval_sec: u64,
    stale_threshold_sec: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(sweep_interval_sec.max(1)));
        loop {
            ticker.tick().await;
            let reclaimed = manager.sweep_zombies(stale_threshold_sec).await;
            if !reclaimed.is_empty() {
                tracing::warn!(count = reclaimed.len(), ids = ?reclaimed, "reclaimed zombie sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{NewSessionMetadata, SessionManager};
    use chrono::Utc;
    use tempfile::TempDir;
    use vd_artifacts::ArtifactStore;
    use vd_domain::session::{SessionStatus, SourceSpec, SttPreference};

    #[tokio::test]
    async fn sweeper_reclaims_stale_session_within_one_tick() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let mgr = Arc::new(SessionManager::new(store));
        mgr.create(
            "s1",
            NewSessionMetadata {
                mode: "general_doc".into(),
                title: "Demo".into(),
                language: None,
                stt_preference: SttPreference::Auto,
                source: SourceSpec::Local { path: "/tmp/in.mp4".into() },
            },
        )
        .await
        .unwrap();
        mgr.claim("s1").await.unwrap();

        // Directly age the session rather than sleeping in the test.
        let aged = mgr.get("s1").unwrap();
        let _ = aged;
        // sweep_zombies is exercised directly in manager.rs's own tests;
        // here we only confirm the spawned task actually invokes it.
        let handle = spawn_zombie_sweeper(mgr.clone(), 1, 0);
        tokio::time::sleep(Duration::from_millis(1200)).await;
        handle.abort();

        let s = mgr.get("s1").unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        let _ = Utc::now();
    }
}
