//! Admission control: a global session-concurrency cap plus a fixed
//! semaphore per adapter capability, so a burst of sessions can't
//! starve a slow external STT or LLM endpoint.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use vd_domain::config::AdapterConcurrencyConfig;

/// One named semaphore per capability that talks to an external process
/// or service. The global session cap lives alongside these but is
/// acquired once per session rather than once per stage.
pub struct AdapterSemaphores {
    global: Arc<Semaphore>,
    transcoder: Arc<Semaphore>,
    stt: Arc<Semaphore>,
    llm_relevance: Arc<Semaphore>,
    llm_generator: Arc<Semaphore>,
}

impl AdapterSemaphores {
    pub fn new(global_cap: usize, cfg: &AdapterConcurrencyConfig) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_cap.max(1))),
            transcoder: Arc::new(Semaphore::new(cfg.transcoder.max(1))),
            stt: Arc::new(Semaphore::new(cfg.stt.max(1))),
            llm_relevance: Arc::new(Semaphore::new(cfg.llm_relevance.max(1))),
            llm_generator: Arc::new(Semaphore::new(cfg.llm_generator.max(1))),
        }
    }

    pub async fn acquire_global(&self) -> OwnedSemaphorePermit {
        self.global
            .clone()
            .acquire_owned()
            .await
            .expect("global semaphore is never closed")
    }

    pub async fn acquire_transcoder(&self) -> OwnedSemaphorePermit {
        self.transcoder
            .clone()
            .acquire_owned()
            .await
            .expect("transcoder semaphore is never closed")
    }

    pub async fn acquire_stt(&self) -> OwnedSemaphorePermit {
        self.stt
            .clone()
            .acquire_owned()
            .await
            .expect("stt semaphore is never closed")
    }

    pub async fn acquire_llm_relevance(&self) -> OwnedSemaphorePermit {
        self.llm_relevance
            .clone()
            .acquire_owned()
            .await
            .expect("llm_relevance semaphore is never closed")
    }

    pub async fn acquire_llm_generator(&self) -> OwnedSemaphorePermit {
        self.llm_generator
            .clone()
            .acquire_owned()
            .await
            .expect("llm_generator semaphore is never closed")
    }
}

/// Default global cap: one session per logical CPU, per §5.
pub fn default_global_cap() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capability_semaphores_cap_concurrency_independently() {
        let sem = AdapterSemaphores::new(
            8,
            &AdapterConcurrencyConfig {
                transcoder: 1,
                stt: 2,
                llm_relevance: 4,
                llm_generator: 2,
            },
        );

        let _p1 = sem.acquire_transcoder().await;
        assert_eq!(sem.transcoder.available_permits(), 0);

        let _p2 = sem.acquire_stt().await;
        assert_eq!(sem.stt.available_permits(), 1);
    }

    #[test]
    fn default_global_cap_is_at_least_one() {
        assert!(default_global_cap() >= 1);
    }
}
