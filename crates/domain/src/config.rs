use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session::SttPreference;

fn d_max_duration_sec() -> f64 {
    900.0
}
fn d_proxy_fps() -> u32 {
    1
}
fn d_proxy_long_edge_px() -> u32 {
    640
}
fn d_max_keyframes() -> usize {
    25
}
fn d_merge_gap_sec() -> f64 {
    10.0
}
fn d_min_segment_sec() -> f64 {
    5.0
}
fn d_stale_session_sec() -> u64 {
    600
}
fn d_sweep_interval_sec() -> u64 {
    60
}
fn d_retention_sec_memory() -> u64 {
    3600
}
fn d_segment_pipeline_chunk_sec() -> f64 {
    30.0
}
fn d_cancel_grace_sec() -> u64 {
    5
}
fn d_local_stt_duration_threshold_sec() -> f64 {
    300.0
}

/// Limits applied at and before the probe stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_duration_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_duration_sec: d_max_duration_sec(),
        }
    }
}

/// Settings for the low-cost analysis proxy built in stage 2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub proxy_fps: u32,
    pub proxy_long_edge_px: u32,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_fps: d_proxy_fps(),
            proxy_long_edge_px: d_proxy_long_edge_px(),
        }
    }
}

/// Moment normalization policy (§3 RelevantMoment invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentsConfig {
    pub merge_gap_sec: f64,
    pub min_segment_sec: f64,
    pub max_keyframes: usize,
}

impl Default for MomentsConfig {
    fn default() -> Self {
        Self {
            merge_gap_sec: d_merge_gap_sec(),
            min_segment_sec: d_min_segment_sec(),
            max_keyframes: d_max_keyframes(),
        }
    }
}

/// STT adapter selection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    pub stt_preference_default: SttPreference,
    /// Above this duration, `auto` prefers the remote adapter over local.
    pub local_duration_threshold_sec: f64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            stt_preference_default: SttPreference::Auto,
            local_duration_threshold_sec: d_local_stt_duration_threshold_sec(),
        }
    }
}

/// SessionManager retention and zombie-sweep policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub stale_session_sec: u64,
    pub sweep_interval_sec: u64,
    pub retention_sec_memory: u64,
    /// `None` means keep disk artifacts forever.
    pub retention_sec_disk: Option<u64>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            stale_session_sec: d_stale_session_sec(),
            sweep_interval_sec: d_sweep_interval_sec(),
            retention_sec_memory: d_retention_sec_memory(),
            retention_sec_disk: None,
        }
    }
}

/// Per-stage timeout budgets, in seconds. Keyed by the stage names used
/// in trace events: `probe`, `proxy`, `transcribe`, `relevance`,
/// `extract`, `generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeoutsConfig {
    pub probe: f64,
    pub proxy: f64,
    pub transcribe: f64,
    pub relevance: f64,
    pub extract: f64,
    pub generate: f64,
}

impl Default for StageTimeoutsConfig {
    fn default() -> Self {
        Self {
            probe: 5.0,
            proxy: 120.0,
            transcribe: 600.0,
            relevance: 60.0,
            extract: 120.0,
            generate: 180.0,
        }
    }
}

impl StageTimeoutsConfig {
    pub fn for_stage(&self, stage: &str) -> Option<f64> {
        match stage {
            "probe" => Some(self.probe),
            "proxy" => Some(self.proxy),
            "transcribe" => Some(self.transcribe),
            "relevance" => Some(self.relevance),
            "extract" => Some(self.extract),
            "generate" => Some(self.generate),
            _ => None,
        }
    }
}

/// Per-adapter-capability admission caps, enforced by semaphores the
/// orchestrator holds for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConcurrencyConfig {
    pub transcoder: usize,
    pub stt: usize,
    pub llm_relevance: usize,
    pub llm_generator: usize,
}

impl Default for AdapterConcurrencyConfig {
    fn default() -> Self {
        Self {
            transcoder: 2,
            stt: 2,
            llm_relevance: 4,
            llm_generator: 2,
        }
    }
}

/// The segmented-pipeline variant's chunking and fan-out policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub segment_pipeline_chunk_sec: f64,
    /// `None` means `min(4, chunk_count)`, computed per session.
    pub max_concurrent_chunks: Option<usize>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            segment_pipeline_chunk_sec: d_segment_pipeline_chunk_sec(),
            max_concurrent_chunks: None,
        }
    }
}

/// Top-level pipeline configuration, loaded from a TOML file on disk and
/// overridden piecemeal by environment or CLI flags where the host
/// chooses to. Every section is independently defaultable so a config
/// file only needs to mention the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub limits: LimitsConfig,
    pub proxy: ProxyConfig,
    pub moments: MomentsConfig,
    pub stt: SttConfig,
    pub sessions: SessionsConfig,
    pub stage_timeouts: StageTimeoutsConfig,
    pub adapter_concurrency: AdapterConcurrencyConfig,
    pub segmentation: SegmentationConfig,
    /// Grace window adapters get to abandon work after a cancel signal.
    #[serde(default = "d_cancel_grace_sec")]
    pub cancel_grace_sec: u64,
    /// Arbitrary extra overrides a specific deployment wants to thread
    /// through to adapters without a schema change.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> crate::error::Result<Self> {
        toml::from_str(s).map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Validates cross-field invariants a plain `#[serde(default)]` parse
    /// can't express, returning all problems found rather than stopping
    /// at the first one, so a misconfigured deployment sees the full
    /// picture in one pass.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.limits.max_duration_sec <= 0.0 {
            problems.push("limits.max_duration_sec must be positive".to_string());
        }
        if self.moments.min_segment_sec < 0.0 {
            problems.push("moments.min_segment_sec must be non-negative".to_string());
        }
        if self.moments.merge_gap_sec < 0.0 {
            problems.push("moments.merge_gap_sec must be non-negative".to_string());
        }
        if self.moments.max_keyframes == 0 {
            problems.push("moments.max_keyframes must be at least 1".to_string());
        }
        if self.sessions.stale_session_sec == 0 {
            problems.push("sessions.stale_session_sec must be positive".to_string());
        }
        if self.segmentation.segment_pipeline_chunk_sec <= 0.0 {
            problems.push("segmentation.segment_pipeline_chunk_sec must be positive".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.limits.max_duration_sec, 900.0);
        assert_eq!(cfg.moments.max_keyframes, 25);
        assert_eq!(cfg.moments.merge_gap_sec, 10.0);
        assert_eq!(cfg.moments.min_segment_sec, 5.0);
        assert_eq!(cfg.sessions.stale_session_sec, 600);
        assert_eq!(cfg.adapter_concurrency.llm_relevance, 4);
        assert_eq!(cfg.segmentation.segment_pipeline_chunk_sec, 30.0);
        assert_eq!(cfg.cancel_grace_sec, 5);
    }

    #[test]
    fn empty_toml_loads_all_defaults() {
        let cfg = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.limits.max_duration_sec, 900.0);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let cfg = PipelineConfig::from_toml_str("[moments]\nmax_keyframes = 10\n").unwrap();
        assert_eq!(cfg.moments.max_keyframes, 10);
        assert_eq!(cfg.moments.merge_gap_sec, 10.0);
    }

    #[test]
    fn validate_flags_nonpositive_duration_cap() {
        let mut cfg = PipelineConfig::default();
        cfg.limits.max_duration_sec = 0.0;
        let problems = cfg.validate();
        assert!(problems.iter().any(|p| p.contains("max_duration_sec")));
    }

    #[test]
    fn validate_passes_on_defaults() {
        assert!(PipelineConfig::default().validate().is_empty());
    }

    #[test]
    fn stage_timeouts_lookup_by_name() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.stage_timeouts.for_stage("probe"), Some(5.0));
        assert_eq!(cfg.stage_timeouts.for_stage("unknown"), None);
    }
}
