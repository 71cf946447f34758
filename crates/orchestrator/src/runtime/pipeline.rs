//! The six-stage pipeline: claim, probe, proxy/audio, transcribe, select
//! moments, extract keyframes, generate, persist. Owns the per-session
//! cancellation checkpoints, per-stage timeouts, and the per-capability
//! admission semaphores documented on [`super::capacity::AdapterSemaphores`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use vd_adapters::traits::{Cancellation, FrameExtractor, Generator, MediaProbe, RelevanceAnalyzer, SttProvider, Transcoder};
use vd_adapters::{degenerate_moment, transcribe_with_policy};
use vd_artifacts::store::{names, KeyframeManifestEntry};
use vd_artifacts::ArtifactStore;
use vd_domain::config::PipelineConfig;
use vd_domain::error::{Error, Result};
use vd_domain::keyframe::Keyframe;
use vd_domain::moment::{sample_keyframe_timestamps, RelevantMoment, DEFAULT_DENSITY_PER_SEC};
use vd_domain::prompt::{OutputFormat, PromptRecord};
use vd_domain::session::{DocPayload, Session, SourceSpec};
use vd_domain::trace::TraceEvent;
use vd_domain::transcript::TranscriptSegment;
use vd_prompts::PromptRegistry;
use vd_sessions::{CompletionOutputs, SessionManager};

use super::capacity::AdapterSemaphores;
use super::cancel::CancelToken;
use super::trace_recorder::TraceRecorder;

const RELEVANCE_PROMPT_ID: &str = "audio_filter";

/// Per-run overrides layered on top of the static [`PipelineConfig`].
/// Corresponds to the options bag a caller hands to `Run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_keyframes: usize,
    pub merge_gap_sec: f64,
    pub min_segment_sec: f64,
    pub segment_pipeline: bool,
    pub hint_keywords: Vec<String>,
    pub attendees: Option<String>,
}

impl RunOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            max_keyframes: cfg.moments.max_keyframes,
            merge_gap_sec: cfg.moments.merge_gap_sec,
            min_segment_sec: cfg.moments.min_segment_sec,
            segment_pipeline: false,
            hint_keywords: Vec::new(),
            attendees: None,
        }
    }
}

/// Everything the Orchestrator needs, wired once at process start and
/// shared across every session it drives.
pub struct Orchestrator {
    config: PipelineConfig,
    sessions: Arc<SessionManager>,
    artifacts: ArtifactStore,
    prompts: Arc<PromptRegistry>,
    semaphores: Arc<AdapterSemaphores>,
    probe: Arc<dyn MediaProbe>,
    transcoder: Arc<dyn Transcoder>,
    frame_extractor: Arc<dyn FrameExtractor>,
    local_stt: Arc<dyn SttProvider>,
    remote_stt: Arc<dyn SttProvider>,
    relevance: Arc<dyn RelevanceAnalyzer>,
    generator: Arc<dyn Generator>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        sessions: Arc<SessionManager>,
        artifacts: ArtifactStore,
        prompts: Arc<PromptRegistry>,
        semaphores: Arc<AdapterSemaphores>,
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn Transcoder>,
        frame_extractor: Arc<dyn FrameExtractor>,
        local_stt: Arc<dyn SttProvider>,
        remote_stt: Arc<dyn SttProvider>,
        relevance: Arc<dyn RelevanceAnalyzer>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config,
            sessions,
            artifacts,
            prompts,
            semaphores,
            probe,
            transcoder,
            frame_extractor,
            local_stt,
            remote_stt,
            relevance,
            generator,
        }
    }

    /// Drives stages 1-6 for `session_id` to completion, failure, or
    /// cancellation. The session must already exist in `draft` or
    /// `queued` state.
    pub async fn run(&self, session_id: &str, options: RunOptions, cancel: &CancelToken) -> Result<Session> {
        let recorder = TraceRecorder::new(self.artifacts.clone(), session_id.to_string());
        let outcome = self.run_inner(session_id, &options, cancel, &recorder).await;
        recorder.close().await;

        match outcome {
            Ok(session) => Ok(session),
            Err(Error::Cancelled) => self.sessions.cancel(session_id).await,
            Err(e) => {
                let stage = current_stage_hint(&e);
                let _ = self.sessions.fail(session_id, e.kind(), &e.to_string(), &stage).await;
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        session_id: &str,
        options: &RunOptions,
        cancel: &CancelToken,
        recorder: &TraceRecorder,
    ) -> Result<Session> {
        let session = self.sessions.claim(session_id).await?;
        let dir = self.artifacts.session_root(session_id).await?;
        check_cancelled(cancel)?;

        // ── Stage 1: probe ───────────────────────────────────────────
        let source_path = match &session.source {
            SourceSpec::Local { path } => path.clone(),
            SourceSpec::Remote { uri } => {
                return Err(Error::InputInvalid(format!(
                    "source '{uri}' was not resolved to a local path before submission"
                )))
            }
        };
        let probe_info = self
            .stage(session_id, "probe", recorder, async { self.probe.probe(&source_path).await })
            .await?;
        if probe_info.duration_sec < 1.0 {
            return Err(Error::InputInvalid("duration is under 1 second".to_string()));
        }
        if probe_info.duration_sec > self.config.limits.max_duration_sec {
            return Err(Error::InputTooLarge {
                duration_sec: probe_info.duration_sec,
                max_sec: self.config.limits.max_duration_sec,
            });
        }
        self.sessions.update_progress(session_id, "probe", 5).await?;
        check_cancelled(cancel)?;

        // ── Stage 2: proxy + audio ───────────────────────────────────
        let proxy_path = self.artifacts.path_of(&dir, names::PROXY);
        let audio_path = self.artifacts.path_of(&dir, names::AUDIO);
        let (proxy_fps, proxy_long_edge_px) = (self.config.proxy.proxy_fps, self.config.proxy.proxy_long_edge_px);
        self.stage(session_id, "proxy", recorder, async {
            let _permit = self.semaphores.acquire_transcoder().await;
            self.transcoder
                .build_proxy(&source_path, &proxy_path.to_string_lossy(), proxy_fps, proxy_long_edge_px)
                .await
                .map_err(|e| Error::PreprocessingFailed(e.to_string()))
        })
        .await?;

        let audio_present = {
            let _permit = self.semaphores.acquire_transcoder().await;
            match self.transcoder.extract_audio(&source_path, &audio_path.to_string_lossy()).await {
                Ok(has_audio) => has_audio,
                Err(e) => {
                    recorder
                        .record(
                            TraceEvent::note(session_id, "proxy", Default::default())
                                .with_attr("audio_extraction_failed", e.to_string()),
                        )
                        .await;
                    false
                }
            }
        };
        self.sessions.update_progress(session_id, "proxy", 15).await?;
        check_cancelled(cancel)?;

        // ── Stage 3: transcribe ───────────────────────────────────────
        let (transcript, stt_adapter_used) = if audio_present {
            let _permit = self.semaphores.acquire_stt().await;
            self.stage(session_id, "transcribe", recorder, async {
                Ok(transcribe_with_policy(
                    session_id,
                    session.stt_preference,
                    probe_info.duration_sec,
                    self.config.stt.local_duration_threshold_sec,
                    self.local_stt.as_ref(),
                    self.remote_stt.as_ref(),
                    &audio_path.to_string_lossy(),
                    session.language.as_deref(),
                )
                .await)
            })
            .await?
        } else {
            (Vec::new(), "none".to_string())
        };
        if transcript.is_empty() && session.mode == "subtitle_extractor" {
            return Err(Error::TranscriptionRequired { mode: session.mode.clone() });
        }
        self.sessions.update_progress(session_id, "transcribe", 35).await?;
        check_cancelled(cancel)?;

        // ── Stage 4: select moments ──────────────────────────────────
        let moments = self
            .select_moments(session_id, &proxy_path.to_string_lossy(), &transcript, options, probe_info.duration_sec, recorder)
            .await;
        self.sessions.update_progress(session_id, "relevance", 50).await?;
        check_cancelled(cancel)?;

        // ── Stage 5 + 6: extract keyframes, generate ──────────────────
        let (keyframes, doc_bytes, output_format) = if options.segment_pipeline {
            self.run_segmented(
                session_id,
                &session,
                &source_path,
                &dir,
                &moments,
                &transcript,
                options,
                probe_info.duration_sec,
                cancel,
                recorder,
            )
            .await?
        } else {
            let keyframes = self
                .extract_keyframes(session_id, &source_path, &dir, &moments, options.max_keyframes, recorder)
                .await?;
            self.sessions.update_progress(session_id, "extract", 70).await?;
            check_cancelled(cancel)?;

            let prompt = self.prompts.get(&session.mode)?;
            let vars = build_generate_vars(&session, options, probe_info.duration_sec, transcript.len(), moments.len());
            let output_format = prompt.output_format;
            let doc_bytes = self
                .stage(session_id, "generate", recorder, async {
                    let _permit = self.semaphores.acquire_llm_generator().await;
                    self.generator
                        .generate(&prompt, &vars, &keyframes, &transcript, output_format, cancel)
                        .await
                })
                .await?;
            (keyframes, doc_bytes, output_format)
        };
        self.sessions.update_progress(session_id, "generate", 95).await?;
        check_cancelled(cancel)?;

        // ── Persist & complete ────────────────────────────────────────
        let doc_payload = match output_format {
            OutputFormat::Markdown => DocPayload::Markdown {
                text: String::from_utf8_lossy(&doc_bytes).into_owned(),
            },
            OutputFormat::Json => {
                let value: serde_json::Value = serde_json::from_slice(&doc_bytes)?;
                DocPayload::Json { value }
            }
        };
        let doc_ext = match output_format {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        };
        self.artifacts.put_bytes(&dir, &names::doc(doc_ext), &doc_bytes).await?;
        self.artifacts.put_json(&dir, names::TRANSCRIPT, &transcript).await?;
        self.artifacts.put_json(&dir, names::MOMENTS, &moments).await?;
        let manifest_entries: Vec<KeyframeManifestEntry> = keyframes
            .iter()
            .enumerate()
            .map(|(index, kf)| KeyframeManifestEntry {
                index,
                timestamp_sec: kf.timestamp_sec,
                path: kf.path.clone(),
            })
            .collect();
        self.artifacts.put_keyframe_manifest(&dir, &manifest_entries).await?;
        let artifact_paths = self.artifacts.manifest(&dir).await?;

        recorder.record(TraceEvent::end(session_id, "persist", 0)).await;
        let completed = self
            .sessions
            .complete(
                session_id,
                CompletionOutputs {
                    doc_payload,
                    artifact_paths,
                    transcript_segments: transcript,
                    keyframes,
                    stt_adapter_used: Some(stt_adapter_used),
                },
            )
            .await?;
        Ok(completed)
    }

    async fn select_moments(
        &self,
        session_id: &str,
        proxy_path: &str,
        transcript: &[TranscriptSegment],
        options: &RunOptions,
        duration_sec: f64,
        recorder: &TraceRecorder,
    ) -> Vec<RelevantMoment> {
        let prompt = match self.prompts.get(RELEVANCE_PROMPT_ID) {
            Ok(p) => p,
            Err(_) => PromptRecord::new(RELEVANCE_PROMPT_ID, "Audio Filter", "Locate relevant moments.", OutputFormat::Json),
        };

        let raw = {
            let _permit = self.semaphores.acquire_llm_relevance().await;
            self.stage(session_id, "relevance", recorder, async {
                self.relevance.analyze(proxy_path, transcript, &options.hint_keywords, &prompt).await
            })
            .await
        };

        let moments = match raw {
            Ok(moments) => moments,
            Err(_) => {
                recorder
                    .record(TraceEvent::note(session_id, "relevance", Default::default()).with_attr("degraded", true))
                    .await;
                degenerate_moment(duration_sec)
            }
        };

        let normalized = vd_domain::moment::normalize_moments(moments, duration_sec, options.merge_gap_sec, options.min_segment_sec);
        if normalized.is_empty() {
            vec![RelevantMoment::new(0.0, duration_sec, "fallback")]
        } else {
            normalized
        }
    }

    async fn extract_keyframes(
        &self,
        session_id: &str,
        source_path: &str,
        dir: &std::path::Path,
        moments: &[RelevantMoment],
        max_keyframes: usize,
        recorder: &TraceRecorder,
    ) -> Result<Vec<Keyframe>> {
        let frames_dir = dir.join(names::FRAMES_DIR);
        tokio::fs::create_dir_all(&frames_dir).await.map_err(Error::Io)?;
        let frames_dir_str = frames_dir.to_string_lossy().into_owned();

        let mut keyframes = self
            .stage(session_id, "extract", recorder, async {
                let timestamps = sample_keyframe_timestamps(moments, max_keyframes, DEFAULT_DENSITY_PER_SEC);
                match self.frame_extractor.extract(source_path, &frames_dir_str, &timestamps).await {
                    Ok(keyframes) => Ok(keyframes),
                    Err(first_err) => {
                        recorder
                            .record(
                                TraceEvent::note(session_id, "extract", Default::default())
                                    .with_attr("retry", "halved_density")
                                    .with_attr("first_error", first_err.to_string()),
                            )
                            .await;
                        let halved = sample_keyframe_timestamps(moments, max_keyframes, DEFAULT_DENSITY_PER_SEC / 2.0);
                        self.frame_extractor
                            .extract(source_path, &frames_dir_str, &halved)
                            .await
                            .map_err(|e| Error::FrameExtractionFailed(e.to_string()))
                    }
                }
            })
            .await?;
        keyframes.sort_by(|a, b| a.timestamp_sec.partial_cmp(&b.timestamp_sec).unwrap());
        Ok(keyframes)
    }

    /// The `segment_pipeline=true` variant: stages 5-6 run per fixed-
    /// length chunk, bounded by `max_concurrent_chunks`, and the chunk
    /// outputs are concatenated in source order.
    #[allow(clippy::too_many_arguments)]
    async fn run_segmented(
        &self,
        session_id: &str,
        session: &Session,
        source_path: &str,
        dir: &std::path::Path,
        moments: &[RelevantMoment],
        transcript: &[TranscriptSegment],
        options: &RunOptions,
        duration_sec: f64,
        cancel: &CancelToken,
        recorder: &TraceRecorder,
    ) -> Result<(Vec<Keyframe>, Vec<u8>, OutputFormat)> {
        let chunk_sec = self.config.segmentation.segment_pipeline_chunk_sec;
        let chunks = build_chunk_windows(duration_sec, chunk_sec);
        let max_concurrent = self
            .config
            .segmentation
            .max_concurrent_chunks
            .unwrap_or_else(|| chunks.len().min(4).max(1));

        let prompt = self.prompts.get(&session.mode)?;
        let output_format = prompt.output_format;
        let per_chunk_cap = (options.max_keyframes / chunks.len().max(1)).max(1);

        let fan_out_semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrent));
        let mut join_set = tokio::task::JoinSet::new();

        for (index, (start, end)) in chunks.into_iter().enumerate() {
            check_cancelled(cancel)?;
            let chunk_moments = clip_moments_to_window(moments, start, end);
            let vars = build_chunk_vars(session, options, duration_sec, transcript.len(), chunk_moments.len(), index, start, end);

            let permit_pool = fan_out_semaphore.clone();
            let frame_extractor = self.frame_extractor.clone();
            let generator = self.generator.clone();
            let semaphores = self.semaphores.clone();
            let source_path = source_path.to_string();
            let chunk_frames_dir = dir.join(names::FRAMES_DIR).join(format!("chunk_{index}"));
            let prompt = prompt.clone();
            let session_id = session_id.to_string();
            let cancel = cancel.clone();

            join_set.spawn(async move {
                let _fan_out_permit = permit_pool.acquire_owned().await.expect("fan-out semaphore never closed");
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                tokio::fs::create_dir_all(&chunk_frames_dir).await.map_err(Error::Io)?;
                let timestamps = sample_keyframe_timestamps(&chunk_moments, per_chunk_cap, DEFAULT_DENSITY_PER_SEC);
                let keyframes = {
                    let _permit = semaphores.acquire_transcoder().await;
                    frame_extractor
                        .extract(&source_path, &chunk_frames_dir.to_string_lossy(), &timestamps)
                        .await
                        .map_err(|e| Error::FrameExtractionFailed(e.to_string()))?
                };

                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }

                let bytes = {
                    let _permit = semaphores.acquire_llm_generator().await;
                    generator
                        .generate(&prompt, &vars, &keyframes, &[], output_format, &cancel)
                        .await?
                };

                let _ = session_id;
                Ok::<(usize, Vec<Keyframe>, Vec<u8>), Error>((index, keyframes, bytes))
            });
        }

        let mut chunk_results: Vec<(usize, Vec<Keyframe>, Vec<u8>)> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(|e| Error::Internal(format!("chunk task panicked: {e}")))??;
            chunk_results.push(result);
        }
        chunk_results.sort_by_key(|(index, _, _)| *index);

        recorder
            .record(TraceEvent::note(session_id, "extract", Default::default()).with_attr("chunk_count", chunk_results.len() as i64))
            .await;

        let mut all_keyframes = Vec::new();
        let mut doc_bytes = Vec::new();
        match output_format {
            OutputFormat::Markdown => {
                for (i, (_, keyframes, bytes)) in chunk_results.into_iter().enumerate() {
                    if i > 0 {
                        doc_bytes.extend_from_slice(b"\n\n");
                    }
                    doc_bytes.extend_from_slice(&bytes);
                    all_keyframes.extend(keyframes);
                }
            }
            OutputFormat::Json => {
                let mut elements = Vec::new();
                for (_, keyframes, bytes) in chunk_results {
                    let value: serde_json::Value = serde_json::from_slice(&bytes)
                        .map_err(|e| Error::OutputFormatInvalid(format!("chunk output not JSON: {e}")))?;
                    match value {
                        serde_json::Value::Array(items) => elements.extend(items),
                        other => elements.push(other),
                    }
                    all_keyframes.extend(keyframes);
                }
                doc_bytes = serde_json::to_vec(&serde_json::Value::Array(elements))?;
            }
        }
        all_keyframes.sort_by(|a, b| a.timestamp_sec.partial_cmp(&b.timestamp_sec).unwrap());
        Ok((all_keyframes, doc_bytes, output_format))
    }

    async fn stage<F, T>(&self, session_id: &str, stage: &str, recorder: &TraceRecorder, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        recorder.record(TraceEvent::start(session_id, stage)).await;
        let started = Instant::now();
        let budget = self.config.stage_timeouts.for_stage(stage);
        let result = match budget {
            Some(budget_sec) => match tokio::time::timeout(std::time::Duration::from_secs_f64(budget_sec), fut).await {
                Ok(inner) => inner,
                Err(_) => Err(Error::StageTimeout { stage: stage.to_string(), budget_sec }),
            },
            None => fut.await,
        };
        match &result {
            Ok(_) => {
                recorder
                    .record(TraceEvent::end(session_id, stage, started.elapsed().as_millis() as u64))
                    .await
            }
            Err(e) => recorder.record(TraceEvent::error(session_id, stage, e)).await,
        }
        result
    }
}

fn check_cancelled(cancel: &CancelToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

fn current_stage_hint(e: &Error) -> String {
    match e {
        Error::InputInvalid(_) | Error::InputTooLarge { .. } => "probe".to_string(),
        Error::PreprocessingFailed(_) => "proxy".to_string(),
        Error::TranscriptionRequired { .. } => "transcribe".to_string(),
        Error::FrameExtractionFailed(_) => "extract".to_string(),
        Error::OutputFormatInvalid(_) => "generate".to_string(),
        Error::StageTimeout { stage, .. } => stage.clone(),
        _ => "pipeline".to_string(),
    }
}

fn build_chunk_windows(duration_sec: f64, chunk_sec: f64) -> Vec<(f64, f64)> {
    if duration_sec <= 0.0 || chunk_sec <= 0.0 {
        return vec![(0.0, duration_sec.max(0.0))];
    }
    let mut windows = Vec::new();
    let mut start = 0.0;
    while start < duration_sec {
        let end = (start + chunk_sec).min(duration_sec);
        windows.push((start, end));
        start = end;
    }
    if windows.is_empty() {
        windows.push((0.0, duration_sec));
    }
    windows
}

fn clip_moments_to_window(moments: &[RelevantMoment], start: f64, end: f64) -> Vec<RelevantMoment> {
    let clipped: Vec<RelevantMoment> = moments
        .iter()
        .filter_map(|m| {
            let clipped_start = m.start_sec.max(start);
            let clipped_end = m.end_sec.min(end);
            if clipped_end > clipped_start {
                let mut clipped = RelevantMoment::new(clipped_start, clipped_end, m.reason.clone());
                clipped.keep_even_if_short = m.keep_even_if_short;
                Some(clipped)
            } else {
                None
            }
        })
        .collect();
    if clipped.is_empty() {
        vec![RelevantMoment::new(start, end, "chunk")]
    } else {
        clipped
    }
}

fn build_generate_vars(
    session: &Session,
    options: &RunOptions,
    duration_sec: f64,
    segment_count: usize,
    moment_count: usize,
) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("title".to_string(), session.title.clone());
    vars.insert("language".to_string(), session.language.clone().unwrap_or_default());
    vars.insert("attendees".to_string(), options.attendees.clone().unwrap_or_default());
    vars.insert("keywords".to_string(), options.hint_keywords.join(", "));
    vars.insert("duration".to_string(), format!("{duration_sec:.1}"));
    vars.insert("segment_count".to_string(), segment_count.to_string());
    vars.insert("moment_count".to_string(), moment_count.to_string());
    vars
}

fn build_chunk_vars(
    session: &Session,
    options: &RunOptions,
    duration_sec: f64,
    segment_count: usize,
    moment_count: usize,
    chunk_index: usize,
    chunk_start: f64,
    chunk_end: f64,
) -> HashMap<String, String> {
    let mut vars = build_generate_vars(session, options, duration_sec, segment_count, moment_count);
    vars.insert("chunk_index".to_string(), chunk_index.to_string());
    vars.insert("chunk_start".to_string(), format!("{chunk_start:.1}"));
    vars.insert("chunk_end".to_string(), format!("{chunk_end:.1}"));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_windows_cover_the_full_duration_without_gaps() {
        let windows = build_chunk_windows(100.0, 30.0);
        assert_eq!(windows, vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0), (90.0, 100.0)]);
    }

    #[test]
    fn chunk_windows_of_exact_multiple_has_no_short_tail() {
        let windows = build_chunk_windows(90.0, 30.0);
        assert_eq!(windows, vec![(0.0, 30.0), (30.0, 60.0), (60.0, 90.0)]);
    }

    #[test]
    fn clip_moments_drops_moments_outside_window() {
        let moments = vec![RelevantMoment::new(0.0, 10.0, "a"), RelevantMoment::new(40.0, 50.0, "b")];
        let clipped = clip_moments_to_window(&moments, 30.0, 60.0);
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].start_sec, 40.0);
    }

    #[test]
    fn clip_moments_falls_back_to_whole_window_when_nothing_overlaps() {
        let moments = vec![RelevantMoment::new(0.0, 10.0, "a")];
        let clipped = clip_moments_to_window(&moments, 30.0, 60.0);
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped[0].start_sec, 30.0);
        assert_eq!(clipped[0].end_sec, 60.0);
    }

    #[test]
    fn generate_vars_include_all_documented_placeholders() {
        let session = Session::new(
            "s1",
            "general_doc",
            "Demo",
            Some("en".into()),
            vd_domain::session::SttPreference::Auto,
            SourceSpec::Local { path: "/tmp/in.mp4".into() },
        );
        let options = RunOptions::from_config(&PipelineConfig::default());
        let vars = build_generate_vars(&session, &options, 42.0, 3, 2);
        for key in ["title", "language", "attendees", "keywords", "duration", "segment_count", "moment_count"] {
            assert!(vars.contains_key(key), "missing var {key}");
        }
        assert_eq!(vars["title"], "Demo");
        assert_eq!(vars["duration"], "42.0");
    }
}
