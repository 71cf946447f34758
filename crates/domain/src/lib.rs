//! Shared types for the video-to-documentation pipeline: the session
//! model, error taxonomy, trace event format, and configuration schema
//! every other docpipe crate builds on.

pub mod config;
pub mod error;
pub mod keyframe;
pub mod moment;
pub mod prompt;
pub mod session;
pub mod trace;
pub mod transcript;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use keyframe::Keyframe;
pub use moment::{RelevantMoment, DEFAULT_DENSITY_PER_SEC};
pub use prompt::PromptRecord;
pub use session::{Session, SessionStatus, SessionSummary, SourceSpec, SttPreference};
pub use trace::TraceEvent;
pub use transcript::TranscriptSegment;
