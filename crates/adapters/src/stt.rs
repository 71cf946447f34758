//! Fast local and accurate remote speech-to-text adapters, plus the
//! selection policy that picks between them per session preference.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;

use vd_domain::error::{Error, Result};
use vd_domain::session::SttPreference;
use vd_domain::trace::TraceEvent;
use vd_domain::transcript::{normalize_segments, TranscriptSegment};

use crate::traits::SttProvider;
use crate::util::from_reqwest;

/// Wall-clock budget for a local STT invocation when the caller doesn't
/// override it. A hung transcription binary would otherwise block a
/// session forever, since `transcribe` has no other way to bail out.
const DEFAULT_LOCAL_STT_TIMEOUT_SEC: f64 = 300.0;

/// A fast, on-box transcriber shelled out to a local binary (e.g. a
/// whisper.cpp-shaped CLI) that prints one JSON array of
/// `{start_sec, end_sec, text}` objects to stdout.
pub struct LocalSttAdapter {
    binary_path: String,
    model_path: Option<String>,
    timeout_sec: f64,
    health: OnceCell<bool>,
}

impl LocalSttAdapter {
    pub fn new(binary_path: impl Into<String>, model_path: Option<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path,
            timeout_sec: DEFAULT_LOCAL_STT_TIMEOUT_SEC,
            health: OnceCell::new(),
        }
    }

    pub fn with_timeout_sec(mut self, timeout_sec: f64) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }
}

#[async_trait]
impl SttProvider for LocalSttAdapter {
    async fn transcribe(
        &self,
        audio_path: &str,
        language_hint: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--audio").arg(audio_path).arg("--format").arg("json");
        if let Some(model) = &self.model_path {
            cmd.arg("--model").arg(model);
        }
        if let Some(lang) = language_hint {
            cmd.arg("--language").arg(lang);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| Error::TranscriptionUnavailable(format!("local STT spawn failed: {e}")))?;
        let timeout = Duration::from_secs_f64(self.timeout_sec.max(0.1));
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => return Err(Error::TranscriptionUnavailable(format!("local STT failed: {e}"))),
            Err(_) => return Err(Error::TranscriptionUnavailable(format!("local STT exceeded {}s", self.timeout_sec))),
        };
        if !output.status.success() {
            return Err(Error::TranscriptionUnavailable(format!(
                "local STT exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let segments: Vec<TranscriptSegment> = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::TranscriptionUnavailable(format!("local STT output malformed: {e}")))?;
        Ok(normalize_segments(segments))
    }

    async fn available(&self) -> bool {
        *self
            .health
            .get_or_init(|| async {
                Command::new(&self.binary_path)
                    .arg("--version")
                    .output()
                    .await
                    .map(|o| o.status.success())
                    .unwrap_or(false)
            })
            .await
    }

    fn adapter_id(&self) -> &str {
        "local"
    }
}

/// An accurate, HTTP-backed transcription service.
pub struct RemoteSttAdapter {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    health: OnceCell<bool>,
}

impl RemoteSttAdapter {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            health: OnceCell::new(),
        }
    }
}

#[async_trait]
impl SttProvider for RemoteSttAdapter {
    async fn transcribe(
        &self,
        audio_path: &str,
        language_hint: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| Error::TranscriptionUnavailable(format!("reading audio: {e}")))?;

        let mut req = self
            .client
            .post(format!("{}/v1/transcribe", self.endpoint))
            .header("content-type", "audio/wav")
            .body(bytes);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(lang) = language_hint {
            req = req.query(&[("language", lang)]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::TranscriptionUnavailable(from_reqwest(e).to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::TranscriptionUnavailable(format!(
                "remote STT returned {}",
                resp.status()
            )));
        }
        let segments: Vec<TranscriptSegment> = resp
            .json()
            .await
            .map_err(|e| Error::TranscriptionUnavailable(from_reqwest(e).to_string()))?;
        Ok(normalize_segments(segments))
    }

    async fn available(&self) -> bool {
        *self.health.get_or_init(|| async { self.api_key.is_some() }).await
    }

    fn adapter_id(&self) -> &str {
        "remote"
    }
}

/// Implements the §4.3 selection policy: picks a primary adapter by
/// `preference`, falls back to the other on failure, and returns an
/// empty transcript (never an error) if both fail — the orchestrator
/// decides separately whether an empty transcript is fatal for the mode.
/// Emits a `note` trace event whenever a fallback actually happens.
pub async fn transcribe_with_policy(
    session_id: &str,
    preference: SttPreference,
    duration_sec: f64,
    local_duration_threshold_sec: f64,
    local: &dyn SttProvider,
    remote: &dyn SttProvider,
    audio_path: &str,
    language_hint: Option<&str>,
) -> (Vec<TranscriptSegment>, String) {
    let prefer_local = match preference {
        SttPreference::Fast => true,
        SttPreference::Accurate => false,
        SttPreference::Auto => {
            duration_sec <= local_duration_threshold_sec || local.available().await
        }
    };

    let (primary, primary_id, fallback, fallback_id): (&dyn SttProvider, &str, &dyn SttProvider, &str) =
        if prefer_local {
            (local, "local", remote, "remote")
        } else {
            (remote, "remote", local, "local")
        };

    match primary.transcribe(audio_path, language_hint).await {
        Ok(segments) => return (segments, primary_id.to_string()),
        Err(e) => {
            tracing::warn!(adapter = primary_id, error = %e, "primary STT adapter failed, falling back");
        }
    }

    match fallback.transcribe(audio_path, language_hint).await {
        Ok(segments) => {
            TraceEvent::note(session_id, "transcribe", Default::default())
                .with_attr("fallback", fallback_id)
                .log();
            (segments, fallback_id.to_string())
        }
        Err(e) => {
            tracing::warn!(adapter = fallback_id, error = %e, "fallback STT adapter also failed");
            TraceEvent::note(session_id, "transcribe", Default::default())
                .with_attr("fallback", "none")
                .log();
            (Vec::new(), "none".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vd_domain::transcript::TranscriptSegment;

    struct FakeStt {
        id: &'static str,
        ok: bool,
    }

    #[async_trait]
    impl SttProvider for FakeStt {
        async fn transcribe(&self, _audio_path: &str, _language_hint: Option<&str>) -> Result<Vec<TranscriptSegment>> {
            if self.ok {
                Ok(vec![TranscriptSegment::new(0.0, 1.0, "hi")])
            } else {
                Err(Error::TranscriptionUnavailable("fake failure".into()))
            }
        }

        async fn available(&self) -> bool {
            self.ok
        }

        fn adapter_id(&self) -> &str {
            self.id
        }
    }

    #[tokio::test]
    async fn fast_preference_prefers_local() {
        let local = FakeStt { id: "local", ok: true };
        let remote = FakeStt { id: "remote", ok: true };
        let (segs, used) = transcribe_with_policy(
            "s1", SttPreference::Fast, 120.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "local");
        assert_eq!(segs.len(), 1);
    }

    #[tokio::test]
    async fn fast_preference_falls_back_to_remote_on_local_failure() {
        let local = FakeStt { id: "local", ok: false };
        let remote = FakeStt { id: "remote", ok: true };
        let (segs, used) = transcribe_with_policy(
            "s1", SttPreference::Fast, 120.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "remote");
        assert_eq!(segs.len(), 1);
    }

    #[tokio::test]
    async fn accurate_preference_prefers_remote() {
        let local = FakeStt { id: "local", ok: true };
        let remote = FakeStt { id: "remote", ok: true };
        let (_segs, used) = transcribe_with_policy(
            "s1", SttPreference::Accurate, 120.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "remote");
    }

    #[tokio::test]
    async fn both_failing_returns_empty_transcript_not_an_error() {
        let local = FakeStt { id: "local", ok: false };
        let remote = FakeStt { id: "remote", ok: false };
        let (segs, used) = transcribe_with_policy(
            "s1", SttPreference::Fast, 120.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "none");
        assert!(segs.is_empty());
    }

    #[tokio::test]
    async fn auto_prefers_local_under_duration_threshold() {
        let local = FakeStt { id: "local", ok: true };
        let remote = FakeStt { id: "remote", ok: true };
        let (_segs, used) = transcribe_with_policy(
            "s1", SttPreference::Auto, 60.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "local");
    }

    #[tokio::test]
    async fn auto_prefers_remote_above_duration_threshold_when_local_unhealthy() {
        let local = FakeStt { id: "local", ok: false };
        let remote = FakeStt { id: "remote", ok: true };
        let (_segs, used) = transcribe_with_policy(
            "s1", SttPreference::Auto, 600.0, 300.0, &local, &remote, "a.wav", None,
        )
        .await;
        assert_eq!(used, "remote");
    }
}
