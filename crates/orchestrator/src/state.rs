use std::sync::Arc;

use vd_adapters::traits::{FrameExtractor, Generator, MediaProbe, RelevanceAnalyzer, SttProvider, Transcoder};
use vd_artifacts::ArtifactStore;
use vd_domain::config::PipelineConfig;
use vd_prompts::PromptRegistry;
use vd_sessions::SessionManager;

use crate::runtime::{AdapterSemaphores, CancelMap, Orchestrator};

/// Shared application state passed to every CLI subcommand handler.
///
/// Fields are grouped by concern:
/// - **Core services** — config, artifact storage, the prompt catalog
/// - **Session management** — the sole `SessionManager`, per-session cancel
///   tokens, and the admission semaphores adapters run behind
/// - **Adapters** — the capability implementations the orchestrator drives
/// - **Orchestrator** — the stage pipeline itself, built from the above
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<PipelineConfig>,
    pub artifacts: ArtifactStore,
    pub prompts: Arc<PromptRegistry>,

    // ── Session management ────────────────────────────────────────────
    pub sessions: Arc<SessionManager>,
    pub cancel_map: Arc<CancelMap>,
    pub semaphores: Arc<AdapterSemaphores>,

    // ── Adapters ──────────────────────────────────────────────────────
    pub probe: Arc<dyn MediaProbe>,
    pub transcoder: Arc<dyn Transcoder>,
    pub frame_extractor: Arc<dyn FrameExtractor>,
    pub local_stt: Arc<dyn SttProvider>,
    pub remote_stt: Arc<dyn SttProvider>,
    pub relevance: Arc<dyn RelevanceAnalyzer>,
    pub generator: Arc<dyn Generator>,

    // ── Orchestrator ──────────────────────────────────────────────────
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        artifacts: ArtifactStore,
        prompts: Arc<PromptRegistry>,
        sessions: Arc<SessionManager>,
        probe: Arc<dyn MediaProbe>,
        transcoder: Arc<dyn Transcoder>,
        frame_extractor: Arc<dyn FrameExtractor>,
        local_stt: Arc<dyn SttProvider>,
        remote_stt: Arc<dyn SttProvider>,
        relevance: Arc<dyn RelevanceAnalyzer>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let config = Arc::new(config);
        let semaphores = Arc::new(AdapterSemaphores::new(
            crate::runtime::default_global_cap(),
            &config.adapter_concurrency,
        ));
        let orchestrator = Arc::new(Orchestrator::new(
            (*config).clone(),
            sessions.clone(),
            artifacts.clone(),
            prompts.clone(),
            semaphores.clone(),
            probe.clone(),
            transcoder.clone(),
            frame_extractor.clone(),
            local_stt.clone(),
            remote_stt.clone(),
            relevance.clone(),
            generator.clone(),
        ));

        Self {
            config,
            artifacts,
            prompts,
            sessions,
            cancel_map: Arc::new(CancelMap::new()),
            semaphores,
            probe,
            transcoder,
            frame_extractor,
            local_stt,
            remote_stt,
            relevance,
            generator,
            orchestrator,
        }
    }
}
