//! Per-session cancellation tokens.
//!
//! Each running session gets a `CancelToken`. Calling `cancel()` on it
//! signals the pipeline to stop at its next checkpoint — probe, between
//! stages, or mid-generate — within the configured grace window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use std::collections::HashMap;

use vd_adapters::traits::Cancellation;

/// A cancellation token that can be checked by the pipeline loop.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation for CancelToken {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tracks active cancellation tokens per session id.
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, session_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(session_id.to_owned(), token.clone());
        token
    }

    pub fn cancel(&self, session_id: &str) -> bool {
        if let Some(token) = self.tokens.lock().get(session_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    pub fn remove(&self, session_id: &str) {
        self.tokens.lock().remove(session_id);
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.tokens.lock().contains_key(session_id)
    }
}
