//! The capability interfaces the Orchestrator drives. Every external
//! tool the pipeline depends on — codec, transcriber, LLM — is consumed
//! only through one of these traits, so the core never knows or cares
//! which vendor or model sits behind an adapter.

use async_trait::async_trait;

use vd_domain::error::Result;
use vd_domain::keyframe::Keyframe;
use vd_domain::moment::RelevantMoment;
use vd_domain::prompt::{OutputFormat, PromptRecord};
use vd_domain::transcript::TranscriptSegment;

/// A narrow cancellation signal passed into every adapter call so a
/// long-running external tool can check for an abort request without
/// the adapter needing to know anything about sessions or the
/// orchestrator that owns the real cancel flag.
pub trait Cancellation: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A `Cancellation` that never fires — used by callers (tests, the CLI's
/// one-shot mode) that have no cancellation mechanism of their own.
pub struct NeverCancelled;

impl Cancellation for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Probe result for stage 1.
#[derive(Debug, Clone, Copy)]
pub struct ProbeInfo {
    pub duration_sec: f64,
    pub width: u32,
    pub height: u32,
    pub audio_present: bool,
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, source_path: &str) -> Result<ProbeInfo>;
}

/// Output of stage 2: a low-cost analysis proxy plus an extracted audio
/// track, both written to the given destination paths.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn build_proxy(
        &self,
        source_path: &str,
        dest_path: &str,
        fps: u32,
        long_edge_px: u32,
    ) -> Result<()>;

    /// Returns `Ok(false)` when the source has no audio track at all —
    /// this is not a failure, just a fact the orchestrator needs to know
    /// to proceed with an empty transcript.
    async fn extract_audio(&self, source_path: &str, dest_path: &str) -> Result<bool>;
}

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Extracts a frame at each requested timestamp from the full
    /// resolution source (never the proxy). Timestamps are expected to
    /// already be clamped to `[0, duration)` by the caller.
    async fn extract(
        &self,
        source_path: &str,
        dest_dir: &str,
        timestamps: &[f64],
    ) -> Result<Vec<Keyframe>>;
}

#[async_trait]
pub trait SttProvider: Send + Sync {
    async fn transcribe(
        &self,
        audio_path: &str,
        language_hint: Option<&str>,
    ) -> Result<Vec<TranscriptSegment>>;

    /// Cheap to call repeatedly once the first call has paid any lazy
    /// initialization cost.
    async fn available(&self) -> bool;

    fn adapter_id(&self) -> &str;
}

#[async_trait]
pub trait RelevanceAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        proxy_video_path: &str,
        transcript: &[TranscriptSegment],
        hint_keywords: &[String],
        prompt: &PromptRecord,
    ) -> Result<Vec<RelevantMoment>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &PromptRecord,
        vars: &std::collections::HashMap<String, String>,
        keyframes: &[Keyframe],
        transcript: &[TranscriptSegment],
        output_format: OutputFormat,
        cancel: &dyn Cancellation,
    ) -> Result<Vec<u8>>;
}
