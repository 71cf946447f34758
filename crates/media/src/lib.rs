//! Process-backed implementations of the media capabilities that shell
//! out to ffprobe/ffmpeg-shaped CLIs: probing, proxy/audio transcoding,
//! and keyframe extraction.

pub mod frames;
pub mod probe;
pub mod subprocess;
pub mod transcode;

pub use frames::FfmpegFrameExtractor;
pub use probe::FfprobeMediaProbe;
pub use transcode::FfmpegTranscoder;
