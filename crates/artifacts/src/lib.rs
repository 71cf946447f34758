//! Session-scoped artifact persistence: proxy video, extracted audio,
//! keyframes, transcript, moments, and the final document, all written
//! atomically under one directory per session.

pub mod store;

pub use store::ArtifactStore;
