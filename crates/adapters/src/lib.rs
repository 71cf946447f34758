//! Capability interfaces and their concrete, network/process-backed
//! implementations: speech-to-text, relevance analysis, and document
//! generation. `vd-media` implements the remaining capabilities
//! (`MediaProbe`, `Transcoder`, `FrameExtractor`) against the trait
//! definitions in [`traits`].

pub mod generator;
pub mod relevance;
pub mod stt;
pub mod traits;
pub mod util;

pub use generator::HttpGenerator;
pub use relevance::{degenerate_moment, HttpRelevanceAnalyzer};
pub use stt::{transcribe_with_policy, LocalSttAdapter, RemoteSttAdapter};
pub use traits::{
    Cancellation, FrameExtractor, Generator, MediaProbe, NeverCancelled, ProbeInfo, RelevanceAnalyzer,
    SttProvider, Transcoder,
};
