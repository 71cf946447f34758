//! Keyframe extraction via an ffmpeg-shaped CLI: one still image per
//! requested timestamp, named so the timestamp round-trips out of the
//! filename alone.

use async_trait::async_trait;

use vd_domain::error::{Error, Result};
use vd_domain::keyframe::{frame_filename, Keyframe};

use vd_adapters::traits::FrameExtractor;

use crate::subprocess::run_command;

pub struct FfmpegFrameExtractor {
    binary_path: String,
    timeout_sec: f64,
}

impl FfmpegFrameExtractor {
    pub fn new(binary_path: impl Into<String>, timeout_sec: f64) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout_sec,
        }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract(
        &self,
        source_path: &str,
        dest_dir: &str,
        timestamps: &[f64],
    ) -> Result<Vec<Keyframe>> {
        let mut keyframes = Vec::with_capacity(timestamps.len());
        for (index, &timestamp_sec) in timestamps.iter().enumerate() {
            let filename = frame_filename(index, timestamp_sec);
            let dest_path = format!("{dest_dir}/{filename}");
            let ts_arg = format!("{timestamp_sec:.3}");

            run_command(
                &self.binary_path,
                &[
                    "-y",
                    "-ss", &ts_arg,
                    "-i", source_path,
                    "-frames:v", "1",
                    &dest_path,
                ],
                self.timeout_sec,
                "frame extract",
            )
            .await
            .map_err(|e| Error::FrameExtractionFailed(e.to_string()))?;

            keyframes.push(Keyframe::new(timestamp_sec, dest_path));
        }
        Ok(keyframes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extraction_of_missing_source_fails_as_frame_extraction_error() {
        let extractor = FfmpegFrameExtractor::new("definitely-not-a-real-ffmpeg", 5.0);
        let err = extractor
            .extract("missing.mp4", "/tmp", &[1.0, 2.0])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FrameExtractionFailed(_)));
    }
}
