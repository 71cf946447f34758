//! Cancellation, admission control, tracing, and the pipeline itself.

pub mod cancel;
pub mod capacity;
pub mod pipeline;
pub mod trace_recorder;

pub use cancel::{CancelMap, CancelToken};
pub use capacity::{default_global_cap, AdapterSemaphores};
pub use pipeline::{Orchestrator, RunOptions};
pub use trace_recorder::TraceRecorder;
