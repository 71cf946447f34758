//! Clap command-line surface: `docpipe` exercises the caller API of
//! spec.md §6 as subcommands rather than HTTP endpoints, plus the
//! `doctor`/`sessions list` operational commands layered on top.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use vd_domain::config::PipelineConfig;
use vd_domain::session::{SessionStatus, SttPreference};

#[derive(Parser, Debug)]
#[command(name = "docpipe", version, about = "Video-to-documentation pipeline orchestrator")]
pub struct Cli {
    /// Path to the config file. Defaults to ./config.toml; a missing
    /// file falls back to built-in defaults rather than erroring.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a new session and run it to completion (Ctrl-C cancels it).
    Submit {
        /// Mode / prompt id, e.g. "general_doc", "subtitle_extractor".
        #[arg(long)]
        mode: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        language: Option<String>,
        #[arg(long, value_enum, default_value_t = SttPreferenceArg::Auto)]
        stt_preference: SttPreferenceArg,
        /// Local path to the source video. Remote sources must already
        /// be fetched to a local path before submission.
        #[arg(long)]
        source: PathBuf,
        /// Run stages 5-6 chunk-by-chunk instead of on the whole video.
        #[arg(long)]
        segmented: bool,
        #[arg(long)]
        attendees: Option<String>,
        /// Repeatable hint keyword, e.g. `--keyword billing --keyword onboarding`.
        #[arg(long = "keyword")]
        hint_keywords: Vec<String>,
    },
    /// Report a session's current status.
    Status { session_id: String },
    /// Print a completed session's document, transcript, and keyframe manifest.
    Result {
        session_id: String,
        /// Emit the full result as one JSON object instead of a human summary.
        #[arg(long)]
        json: bool,
    },
    /// Request cancellation of a running session.
    Cancel { session_id: String },
    /// Print the most recently active non-terminal session's id, if any.
    Active,
    /// Session bookkeeping beyond the bare caller-API contract.
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },
    /// Check adapter health (STT reachability, ffmpeg/ffprobe presence).
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List known sessions, most recently updated first.
    List {
        #[arg(long, value_enum)]
        status: Option<SessionStatusArg>,
        #[arg(long)]
        mode: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SttPreferenceArg {
    Auto,
    Fast,
    Accurate,
}

impl From<SttPreferenceArg> for SttPreference {
    fn from(v: SttPreferenceArg) -> Self {
        match v {
            SttPreferenceArg::Auto => SttPreference::Auto,
            SttPreferenceArg::Fast => SttPreference::Fast,
            SttPreferenceArg::Accurate => SttPreference::Accurate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionStatusArg {
    Draft,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl From<SessionStatusArg> for SessionStatus {
    fn from(v: SessionStatusArg) -> Self {
        match v {
            SessionStatusArg::Draft => SessionStatus::Draft,
            SessionStatusArg::Queued => SessionStatus::Queued,
            SessionStatusArg::Running => SessionStatus::Running,
            SessionStatusArg::Completed => SessionStatus::Completed,
            SessionStatusArg::Failed => SessionStatus::Failed,
            SessionStatusArg::Cancelled => SessionStatus::Cancelled,
        }
    }
}

/// Loads `PipelineConfig` from `path` (default `./config.toml`), falling
/// back to built-in defaults if the file doesn't exist. Mirrors the
/// teacher gateway's `load_config`: a missing file is not an error, a
/// malformed one is.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<(PipelineConfig, PathBuf)> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("config.toml"));
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        return Ok((PipelineConfig::default(), path));
    }
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    let config = PipelineConfig::from_toml_str(&raw)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let (config, _path) = load_config(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.limits.max_duration_sec, 900.0);
    }

    #[test]
    fn stt_preference_arg_maps_to_domain_type() {
        assert_eq!(SttPreference::from(SttPreferenceArg::Fast), SttPreference::Fast);
    }
}
