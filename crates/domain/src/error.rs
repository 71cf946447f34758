/// The closed error taxonomy shared by every docpipe crate.
///
/// Each variant corresponds to one of the error kinds in the pipeline's
/// error-handling design: adapters translate native failures into one of
/// these at the boundary, and everything else propagates unchanged.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Unreadable source, zero-duration, or unsupported container.
    #[error("input invalid: {0}")]
    InputInvalid(String),

    /// Duration exceeds `max_duration_sec`.
    #[error("input too large: {duration_sec:.1}s exceeds the {max_sec:.1}s cap")]
    InputTooLarge { duration_sec: f64, max_sec: f64 },

    /// Proxy or audio extraction failed irrecoverably.
    #[error("preprocessing failed: {0}")]
    PreprocessingFailed(String),

    /// Transcript came back empty in a mode that requires one.
    #[error("transcription required for mode '{mode}' but the transcript is empty")]
    TranscriptionRequired { mode: String },

    /// STT failed and its fallback also failed; non-fatal, degrades to an
    /// empty transcript. Carried as an error value so callers can inspect
    /// it even though the orchestrator treats it as a recoverable note.
    #[error("transcription unavailable: {0}")]
    TranscriptionUnavailable(String),

    /// RelevanceAnalyzer failed after one retry; degrades to a single
    /// whole-video moment.
    #[error("relevance analysis unavailable: {0}")]
    RelevanceUnavailable(String),

    /// FrameExtractor failed after one retry at halved density.
    #[error("frame extraction failed: {0}")]
    FrameExtractionFailed(String),

    /// Generator output did not match its declared `output_format`.
    #[error("output format invalid: {0}")]
    OutputFormatInvalid(String),

    /// A stage exceeded its configured timeout budget.
    #[error("stage '{stage}' timed out after {budget_sec:.1}s")]
    StageTimeout { stage: String, budget_sec: f64 },

    /// Cancellation was requested and observed at a checkpoint.
    #[error("cancelled")]
    Cancelled,

    /// The zombie sweeper promoted a stuck `running` session to `failed`.
    #[error("session went stale: no progress for {idle_sec:.0}s")]
    StaleTimeout { idle_sec: f64 },

    /// An invariant was violated — a programmer error, not a user error.
    #[error("internal error: {0}")]
    Internal(String),

    // ── ambient leaves adapters translate from ──────────────────────────
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// The taxonomy kind as a short, stable string — used in trace events
    /// and the CLI host's exit-code mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InputInvalid(_) => "InputInvalid",
            Error::InputTooLarge { .. } => "InputTooLarge",
            Error::PreprocessingFailed(_) => "PreprocessingFailed",
            Error::TranscriptionRequired { .. } => "TranscriptionRequired",
            Error::TranscriptionUnavailable(_) => "TranscriptionUnavailable",
            Error::RelevanceUnavailable(_) => "RelevanceUnavailable",
            Error::FrameExtractionFailed(_) => "FrameExtractionFailed",
            Error::OutputFormatInvalid(_) => "OutputFormatInvalid",
            Error::StageTimeout { .. } => "StageTimeout",
            Error::Cancelled => "Cancelled",
            Error::StaleTimeout { .. } => "StaleTimeout",
            Error::Internal(_) => "Internal",
            Error::Io(_) => "Internal",
            Error::Json(_) => "Internal",
            Error::Http(_) => "Internal",
            Error::Timeout(_) => "StageTimeout",
            Error::Config(_) => "Internal",
        }
    }

    /// Whether this kind is terminal for the session (surfaced as
    /// `status=failed`) as opposed to a recoverable degradation that only
    /// produces a trace note.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Error::TranscriptionUnavailable(_) | Error::RelevanceUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_are_not_terminal() {
        assert!(!Error::TranscriptionUnavailable("no local model".into()).is_terminal());
        assert!(!Error::RelevanceUnavailable("bad json twice".into()).is_terminal());
    }

    #[test]
    fn other_kinds_are_terminal() {
        assert!(Error::InputInvalid("zero duration".into()).is_terminal());
        assert!(Error::Cancelled.is_terminal());
        assert!(Error::StaleTimeout { idle_sec: 900.0 }.is_terminal());
    }

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(Error::Cancelled.kind(), "Cancelled");
        assert_eq!(
            Error::InputTooLarge { duration_sec: 1000.0, max_sec: 900.0 }.kind(),
            "InputTooLarge"
        );
    }
}
