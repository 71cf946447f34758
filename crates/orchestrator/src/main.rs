mod cli;
mod runtime;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vd_adapters::traits::SttProvider;
use vd_adapters::{HttpGenerator, HttpRelevanceAnalyzer, LocalSttAdapter, RemoteSttAdapter};
use vd_media::{FfmpegFrameExtractor, FfmpegTranscoder, FfprobeMediaProbe};
use vd_artifacts::ArtifactStore;
use vd_domain::config::PipelineConfig;
use vd_domain::session::{SessionStatus, SourceSpec};
use vd_prompts::PromptRegistry;
use vd_sessions::manager::{NewSessionMetadata, SessionFilter};
use vd_sessions::{spawn_zombie_sweeper, SessionManager};

use cli::{Cli, Command, SessionsCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (config, config_path) = cli::load_config(cli.config.as_deref())?;

    for issue in config.validate() {
        tracing::warn!(%issue, "config validation issue");
    }

    let state = bootstrap(config, &config_path).await?;
    spawn_zombie_sweeper(
        state.sessions.clone(),
        state.config.sessions.sweep_interval_sec,
        state.config.sessions.stale_session_sec,
    );
    state.sessions.hydrate_from_disk().await?;

    let code = match cli.command {
        None | Some(Command::Doctor) => handle_doctor(&state).await,
        Some(Command::Submit {
            mode,
            title,
            language,
            stt_preference,
            source,
            segmented,
            attendees,
            hint_keywords,
        }) => {
            handle_submit(
                &state,
                mode,
                title,
                language,
                stt_preference.into(),
                source,
                segmented,
                attendees,
                hint_keywords,
            )
            .await
        }
        Some(Command::Status { session_id }) => handle_status(&state, &session_id).await,
        Some(Command::Result { session_id, json }) => handle_result(&state, &session_id, json).await,
        Some(Command::Cancel { session_id }) => handle_cancel(&state, &session_id).await,
        Some(Command::Active) => handle_active(&state).await,
        Some(Command::Sessions { command: SessionsCommand::List { status, mode } }) => {
            handle_sessions_list(&state, status.map(Into::into), mode).await
        }
    };

    std::process::exit(code);
}

/// Structured JSON tracing, same idiom as the reference gateway's
/// `init_tracing`, scoped to this binary's own crate name for the
/// default filter.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vd_orchestrator=debug")))
        .json()
        .init();
}

/// Wires every adapter, the session manager, and the orchestrator into
/// one [`AppState`]. Binary paths and remote endpoints live in
/// `config.extra` rather than a dedicated schema section — see
/// `PipelineConfig::extra`'s doc comment.
async fn bootstrap(config: PipelineConfig, config_path: &std::path::Path) -> anyhow::Result<AppState> {
    // ── Artifact storage ─────────────────────────────────────────────
    let artifact_root = config
        .extra
        .get("artifact_root")
        .cloned()
        .unwrap_or_else(|| "data/artifacts".to_string());
    let artifacts = ArtifactStore::new(artifact_root);
    tracing::info!(root = %artifacts.root().display(), "artifact store ready");

    // ── Prompt catalog ───────────────────────────────────────────────
    let prompts_root = config.extra.get("prompts_root").cloned();
    let prompts = Arc::new(match prompts_root {
        Some(p) => PromptRegistry::load(std::path::Path::new(&p))?,
        None => {
            tracing::warn!("no prompts_root configured, starting with an empty prompt catalog");
            PromptRegistry::empty()
        }
    });
    tracing::info!(count = prompts.list().len(), "prompt catalog ready");

    // ── Session management ───────────────────────────────────────────
    let sessions = Arc::new(SessionManager::new(artifacts.clone()));

    // ── Media adapters ───────────────────────────────────────────────
    let ffmpeg_bin = config.extra.get("ffmpeg_path").cloned().unwrap_or_else(|| "ffmpeg".to_string());
    let ffprobe_bin = config.extra.get("ffprobe_path").cloned().unwrap_or_else(|| "ffprobe".to_string());
    let probe = Arc::new(FfprobeMediaProbe::new(ffprobe_bin, config.stage_timeouts.probe));
    let transcoder = Arc::new(FfmpegTranscoder::new(
        ffmpeg_bin.clone(),
        config.stage_timeouts.proxy,
        config.stage_timeouts.proxy,
    ));
    let frame_extractor = Arc::new(FfmpegFrameExtractor::new(ffmpeg_bin, config.stage_timeouts.extract));

    // ── STT adapters ─────────────────────────────────────────────────
    let local_stt_bin = config.extra.get("local_stt_path").cloned().unwrap_or_else(|| "whisper".to_string());
    let local_stt_model = config.extra.get("local_stt_model").cloned();
    let local_stt = Arc::new(LocalSttAdapter::new(local_stt_bin, local_stt_model).with_timeout_sec(config.stage_timeouts.transcribe));

    let remote_stt_client = timed_client(config.stage_timeouts.transcribe)?;
    let remote_stt_endpoint = config
        .extra
        .get("remote_stt_endpoint")
        .cloned()
        .unwrap_or_else(|| "http://localhost:9000".to_string());
    let remote_stt_key = std::env::var("DOCPIPE_REMOTE_STT_API_KEY").ok();
    let remote_stt = Arc::new(RemoteSttAdapter::new(remote_stt_client, remote_stt_endpoint, remote_stt_key));

    // ── LLM adapters ─────────────────────────────────────────────────
    let relevance_client = timed_client(config.stage_timeouts.relevance)?;
    let relevance_endpoint = config
        .extra
        .get("relevance_endpoint")
        .cloned()
        .unwrap_or_else(|| "http://localhost:9001".to_string());
    let relevance_key = std::env::var("DOCPIPE_RELEVANCE_API_KEY").ok();
    let relevance = Arc::new(HttpRelevanceAnalyzer::new(relevance_client, relevance_endpoint, relevance_key));

    let generator_client = timed_client(config.stage_timeouts.generate)?;
    let generator_endpoint = config
        .extra
        .get("generator_endpoint")
        .cloned()
        .unwrap_or_else(|| "http://localhost:9002".to_string());
    let generator_key = std::env::var("DOCPIPE_GENERATOR_API_KEY").ok();
    let generator = Arc::new(HttpGenerator::new(generator_client, generator_endpoint, generator_key));

    tracing::info!(config_path = %config_path.display(), "adapters ready");

    Ok(AppState::new(
        config,
        artifacts,
        prompts,
        sessions,
        probe,
        transcoder,
        frame_extractor,
        local_stt,
        remote_stt,
        relevance,
        generator,
    ))
}

/// Builds an HTTP client bounded by the given stage's own timeout
/// budget rather than some other stage's — relevance and generate calls
/// must not inherit the (much larger) transcribe budget.
fn timed_client(timeout_sec: f64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs_f64(timeout_sec.max(1.0)))
        .build()?)
}

/// Exit code for a terminal `submit` outcome, per the caller API's
/// exit-code taxonomy: 0 success, 2 input invalid, 3 pipeline failed,
/// 4 cancelled, 5 timeout.
fn exit_code_for_session(session: &vd_domain::session::Session) -> i32 {
    match session.status {
        SessionStatus::Completed => 0,
        SessionStatus::Cancelled => 4,
        SessionStatus::Failed => match session.error.as_ref().map(|e| e.kind.as_str()) {
            Some("InputInvalid") | Some("InputTooLarge") => 2,
            Some("StageTimeout") => 5,
            _ => 3,
        },
        _ => 3,
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_submit(
    state: &AppState,
    mode: String,
    title: String,
    language: Option<String>,
    stt_preference: vd_domain::session::SttPreference,
    source: std::path::PathBuf,
    segmented: bool,
    attendees: Option<String>,
    hint_keywords: Vec<String>,
) -> i32 {
    let session_id = uuid::Uuid::new_v4().to_string();
    let meta = NewSessionMetadata {
        mode,
        title,
        language,
        stt_preference,
        source: SourceSpec::Local { path: source.display().to_string() },
    };
    if let Err(e) = state.sessions.create(&session_id, meta).await {
        eprintln!("failed to create session: {e}");
        return 3;
    }
    if let Err(e) = state.sessions.claim(&session_id).await {
        eprintln!("failed to claim session: {e}");
        return 3;
    }

    let token = state.cancel_map.register(&session_id);
    let mut options = runtime::RunOptions::from_config(&state.config);
    options.segment_pipeline = segmented;
    options.attendees = attendees;
    options.hint_keywords = hint_keywords;

    let orchestrator = state.orchestrator.clone();
    let sid = session_id.clone();
    let run_token = token.clone();
    let mut run_handle = tokio::spawn(async move { orchestrator.run(&sid, options, &run_token).await });

    let outcome = loop {
        tokio::select! {
            result = &mut run_handle => break result,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(session_id = %session_id, "interrupt received, cancelling session");
                token.cancel();
            }
        }
    };
    state.cancel_map.remove(&session_id);

    match outcome {
        Ok(Ok(session)) => {
            println!("{session_id}");
            exit_code_for_session(&session)
        }
        Ok(Err(e)) => {
            eprintln!("session {session_id} failed: {e}");
            3
        }
        Err(join_err) => {
            eprintln!("session {session_id} task panicked: {join_err}");
            3
        }
    }
}

async fn handle_status(state: &AppState, session_id: &str) -> i32 {
    match state.sessions.get_or_load(session_id).await {
        Ok(Some(s)) => {
            println!(
                "{{\"status\":\"{:?}\",\"progress\":{},\"stage_label\":\"{}\"}}",
                s.status, s.progress, s.stage_label
            );
            0
        }
        Ok(None) => {
            eprintln!("no such session: {session_id}");
            1
        }
        Err(e) => {
            eprintln!("error loading session: {e}");
            1
        }
    }
}

async fn handle_result(state: &AppState, session_id: &str, json: bool) -> i32 {
    match state.sessions.get_or_load(session_id).await {
        Ok(Some(s)) if s.status == SessionStatus::Completed => {
            if json {
                match serde_json::to_string_pretty(&s) {
                    Ok(body) => println!("{body}"),
                    Err(e) => {
                        eprintln!("failed to serialize session: {e}");
                        return 1;
                    }
                }
            } else {
                println!("session: {}", s.id);
                println!("stt adapter used: {}", s.stt_adapter_used.as_deref().unwrap_or("none"));
                println!("transcript segments: {}", s.transcript_segments.len());
                println!("keyframes: {}", s.keyframes.len());
                match &s.doc_payload {
                    Some(vd_domain::session::DocPayload::Markdown { text }) => println!("\n{text}"),
                    Some(vd_domain::session::DocPayload::Json { value }) => println!("\n{value}"),
                    None => println!("\n(no document)"),
                }
            }
            0
        }
        Ok(Some(s)) => {
            eprintln!("session {session_id} is not complete (status: {:?})", s.status);
            1
        }
        Ok(None) => {
            eprintln!("no such session: {session_id}");
            1
        }
        Err(e) => {
            eprintln!("error loading session: {e}");
            1
        }
    }
}

async fn handle_cancel(state: &AppState, session_id: &str) -> i32 {
    if state.cancel_map.cancel(session_id) {
        println!("cancellation requested for {session_id}");
        0
    } else {
        eprintln!("session {session_id} is not currently running in this process");
        1
    }
}

async fn handle_active(state: &AppState) -> i32 {
    match state.sessions.get_active() {
        Some(s) => {
            println!("{}", s.id);
            0
        }
        None => {
            println!("(none)");
            0
        }
    }
}

async fn handle_sessions_list(state: &AppState, status: Option<SessionStatus>, mode: Option<String>) -> i32 {
    let filter = SessionFilter { status, mode };
    let summaries = state.sessions.list(&filter);
    println!("{:<36}  {:<10}  {:>3}  {:<20}  TITLE", "ID", "STATUS", "PCT", "MODE");
    for s in &summaries {
        println!("{:<36}  {:<10?}  {:>3}  {:<20}  {}", s.id, s.status, s.progress, s.mode, s.title);
    }
    0
}

async fn handle_doctor(state: &AppState) -> i32 {
    println!("docpipe doctor");
    println!("==============\n");
    let mut all_passed = true;

    check_binary("ffprobe", state.config.extra.get("ffprobe_path").map(String::as_str).unwrap_or("ffprobe"), &mut all_passed);
    check_binary("ffmpeg", state.config.extra.get("ffmpeg_path").map(String::as_str).unwrap_or("ffmpeg"), &mut all_passed);

    let local_ok = state.local_stt.available().await;
    print_check("Local STT adapter", local_ok, state.local_stt.adapter_id().to_string());
    if !local_ok {
        all_passed = false;
    }

    let remote_ok = state.remote_stt.available().await;
    print_check("Remote STT adapter", remote_ok, state.remote_stt.adapter_id().to_string());
    if !remote_ok {
        all_passed = false;
    }

    let issues = state.config.validate();
    print_check("Config validation", issues.is_empty(), format!("{} issue(s)", issues.len()));
    for issue in &issues {
        println!("      {issue}");
    }
    if !issues.is_empty() {
        all_passed = false;
    }

    println!();
    if all_passed {
        println!("All checks passed.");
        0
    } else {
        println!("Some checks failed. Review the output above.");
        1
    }
}

fn check_binary(name: &str, path: &str, all_passed: &mut bool) {
    let ok = std::process::Command::new(path)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    print_check(name, ok, path.to_string());
    if !ok {
        *all_passed = false;
    }
}

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
