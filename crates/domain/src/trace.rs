use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// A scalar value carried in a [`TraceEvent`]'s `attrs` map.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Str(v.to_owned())
    }
}
impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Str(v)
    }
}
impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}
impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}
impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

/// What kind of moment in a stage's life this event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    Start,
    End,
    Error,
    Note,
}

/// One structured, append-only record in a session's `trace.jsonl`.
///
/// Matches the wire format required of the trace file: `ts`, `session_id`,
/// `stage`, `kind`, `attrs`, with optional `duration_ms` and `error`.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub ts: DateTime<Utc>,
    pub session_id: String,
    pub stage: String,
    pub kind: TraceKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceEvent {
    pub fn start(session_id: &str, stage: &str) -> Self {
        Self {
            ts: Utc::now(),
            session_id: session_id.to_owned(),
            stage: stage.to_owned(),
            kind: TraceKind::Start,
            attrs: Attrs::new(),
            duration_ms: None,
            error: None,
        }
    }

    pub fn end(session_id: &str, stage: &str, duration_ms: u64) -> Self {
        Self {
            ts: Utc::now(),
            session_id: session_id.to_owned(),
            stage: stage.to_owned(),
            kind: TraceKind::End,
            attrs: Attrs::new(),
            duration_ms: Some(duration_ms),
            error: None,
        }
    }

    pub fn error(session_id: &str, stage: &str, error: impl ToString) -> Self {
        Self {
            ts: Utc::now(),
            session_id: session_id.to_owned(),
            stage: stage.to_owned(),
            kind: TraceKind::Error,
            attrs: Attrs::new(),
            duration_ms: None,
            error: Some(error.to_string()),
        }
    }

    pub fn note(session_id: &str, stage: &str, attrs: Attrs) -> Self {
        Self {
            ts: Utc::now(),
            session_id: session_id.to_owned(),
            stage: stage.to_owned(),
            kind: TraceKind::Note,
            attrs,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Emit this event to the process's structured logger, independent of
    /// whether it also gets appended to the session's JSONL trace file —
    /// a live operational signal distinct from the durable on-disk record.
    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self.kind {
            TraceKind::Error => tracing::warn!(trace_event = %json, "docpipe_event"),
            _ => tracing::info!(trace_event = %json, "docpipe_event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_end_round_trip_serializes_stage_and_session() {
        let s = TraceEvent::start("sess-1", "probe");
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"session_id\":\"sess-1\""));
        assert!(json.contains("\"stage\":\"probe\""));
        assert!(json.contains("\"kind\":\"start\""));
        assert!(!json.contains("duration_ms"));
    }

    #[test]
    fn note_carries_attrs() {
        let mut attrs = Attrs::new();
        attrs.insert("fallback".into(), AttrValue::from("remote"));
        let n = TraceEvent::note("sess-1", "transcribe", attrs);
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"fallback\":\"remote\""));
    }

    #[test]
    fn with_attr_builder_chains() {
        let e = TraceEvent::note("sess-1", "relevance", Attrs::new())
            .with_attr("reason", "fallback")
            .with_attr("moment_count", 1i64);
        assert_eq!(e.attrs.len(), 2);
    }
}
