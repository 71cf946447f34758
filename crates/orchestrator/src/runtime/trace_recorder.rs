//! Per-session JSONL trace recorder.
//!
//! Opens `trace.jsonl` under the session's artifact directory on its
//! first event and keeps appending; write failures are logged but never
//! propagate; the file handle is dropped once the session reaches a
//! terminal state.

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use vd_artifacts::store::names;
use vd_artifacts::ArtifactStore;
use vd_domain::trace::TraceEvent;

pub struct TraceRecorder {
    store: ArtifactStore,
    session_id: String,
    file: Mutex<Option<tokio::fs::File>>,
}

impl TraceRecorder {
    pub fn new(store: ArtifactStore, session_id: impl Into<String>) -> Self {
        Self {
            store,
            session_id: session_id.into(),
            file: Mutex::new(None),
        }
    }

    /// Appends `event` to the session's trace file, opening it on first
    /// use. Also emits the event to the structured logger via
    /// `TraceEvent::log`, independent of the file write's success.
    pub async fn record(&self, event: TraceEvent) {
        event.log();

        let line = match serde_json::to_string(&event) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize trace event");
                return;
            }
        };

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            match self.open().await {
                Ok(file) => *guard = Some(file),
                Err(e) => {
                    tracing::warn!(session_id = %self.session_id, error = %e, "failed to open trace.jsonl");
                    return;
                }
            }
        }

        if let Some(file) = guard.as_mut() {
            let mut buf = line.into_bytes();
            buf.push(b'\n');
            if let Err(e) = file.write_all(&buf).await {
                tracing::warn!(session_id = %self.session_id, error = %e, "failed to append trace event");
            }
        }
    }

    async fn open(&self) -> std::io::Result<tokio::fs::File> {
        let dir = self
            .store
            .root()
            .join(&self.session_id);
        tokio::fs::create_dir_all(&dir).await?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(names::TRACE))
            .await
    }

    /// Drops the open file handle; called once the session reaches a
    /// terminal state so the descriptor isn't held for the process
    /// lifetime across a long-running host.
    pub async fn close(&self) {
        *self.file.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn record_appends_lines_and_close_drops_handle() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let recorder = TraceRecorder::new(store, "s1");

        recorder.record(TraceEvent::start("s1", "probe")).await;
        recorder.record(TraceEvent::end("s1", "probe", 12)).await;
        recorder.close().await;

        let content = tokio::fs::read_to_string(tmp.path().join("s1").join(names::TRACE))
            .await
            .unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains("\"stage\":\"probe\""));
    }
}
