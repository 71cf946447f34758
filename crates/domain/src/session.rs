use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;
use crate::transcript::TranscriptSegment;

/// Where the input video comes from. The caller is responsible for
/// resolving a remote source into a local path before submission — this
/// pipeline never performs network fetches itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Local { path: String },
    Remote { uri: String },
}

/// STT backend selection preference (see the STT adapter's policy).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SttPreference {
    #[default]
    Auto,
    Fast,
    Accurate,
}

/// The lifecycle state of a session. Transitions form a DAG:
/// `Draft -> Queued -> Running -> {Completed|Failed|Cancelled}`. Once a
/// session reaches a terminal state, no further progress update succeeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    /// Whether transitioning from `self` to `next` is a legal edge in the
    /// status DAG.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Draft, Queued) | (Draft, Running) => true,
            (Queued, Running) | (Queued, Cancelled) => true,
            (Running, Running) => true, // idempotent re-claim
            (Running, Completed) | (Running, Failed) | (Running, Cancelled) => true,
            _ => false,
        }
    }
}

/// A structured failure record attached to a failed or cancelled session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionError {
    pub kind: String,
    pub message: String,
    pub stage: String,
}

/// The final document payload produced by the Generator stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DocPayload {
    Markdown { text: String },
    Json { value: serde_json::Value },
}

/// The top-level unit of work: one video recording being turned into one
/// documentation artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub mode: String,
    pub title: String,
    pub language: Option<String>,
    pub stt_preference: SttPreference,
    pub source: SourceSpec,
    pub status: SessionStatus,
    /// 0..=100, non-decreasing while `status == Running`.
    pub progress: u8,
    pub stage_label: String,
    pub error: Option<SessionError>,
    pub last_updated: DateTime<Utc>,
    pub artifact_paths: HashMap<String, String>,
    pub doc_payload: Option<DocPayload>,
    pub transcript_segments: Vec<TranscriptSegment>,
    pub keyframes: Vec<Keyframe>,
    /// Which STT adapter actually produced the transcript (`"local"` /
    /// `"remote"` / `"none"`), reported back to callers via GetResult.
    pub stt_adapter_used: Option<String>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        mode: impl Into<String>,
        title: impl Into<String>,
        language: Option<String>,
        stt_preference: SttPreference,
        source: SourceSpec,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            mode: mode.into(),
            title: title.into(),
            language,
            stt_preference,
            source,
            status: SessionStatus::Draft,
            progress: 0,
            stage_label: "draft".into(),
            error: None,
            last_updated: now,
            artifact_paths: HashMap::new(),
            doc_payload: None,
            transcript_segments: Vec::new(),
            keyframes: Vec::new(),
            stt_adapter_used: None,
        }
    }
}

/// A lightweight projection of a [`Session`] for list views.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub mode: String,
    pub title: String,
    pub status: SessionStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id.clone(),
            mode: s.mode.clone(),
            title: s.title.clone(),
            status: s.status,
            progress: s.progress,
            created_at: s.created_at,
            last_updated: s.last_updated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_dag_forbids_skipping_backwards() {
        assert!(SessionStatus::Draft.can_transition_to(SessionStatus::Queued));
        assert!(SessionStatus::Queued.can_transition_to(SessionStatus::Running));
        assert!(SessionStatus::Running.can_transition_to(SessionStatus::Completed));
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Running));
        assert!(!SessionStatus::Failed.can_transition_to(SessionStatus::Queued));
    }

    #[test]
    fn terminal_states_are_exactly_three() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Draft.is_terminal());
        assert!(!SessionStatus::Queued.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
    }

    #[test]
    fn running_to_running_is_idempotent_claim() {
        assert!(SessionStatus::Running.can_transition_to(SessionStatus::Running));
    }

    #[test]
    fn summary_projects_core_fields() {
        let s = Session::new(
            "s1",
            "general_doc",
            "Demo",
            Some("en".into()),
            SttPreference::Auto,
            SourceSpec::Local { path: "/tmp/in.mp4".into() },
        );
        let summary = SessionSummary::from(&s);
        assert_eq!(summary.id, "s1");
        assert_eq!(summary.status, SessionStatus::Draft);
    }
}
