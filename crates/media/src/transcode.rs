//! Proxy video and audio-track extraction via an ffmpeg-shaped CLI.

use async_trait::async_trait;

use vd_domain::error::{Error, Result};

use vd_adapters::traits::Transcoder;

use crate::subprocess::run_command;

pub struct FfmpegTranscoder {
    binary_path: String,
    proxy_timeout_sec: f64,
    audio_timeout_sec: f64,
}

impl FfmpegTranscoder {
    pub fn new(binary_path: impl Into<String>, proxy_timeout_sec: f64, audio_timeout_sec: f64) -> Self {
        Self {
            binary_path: binary_path.into(),
            proxy_timeout_sec,
            audio_timeout_sec,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn build_proxy(
        &self,
        source_path: &str,
        dest_path: &str,
        fps: u32,
        long_edge_px: u32,
    ) -> Result<()> {
        let scale = format!("scale='if(gt(iw,ih),{long_edge_px},-2)':'if(gt(iw,ih),-2,{long_edge_px})'");
        let fps_arg = fps.to_string();
        run_command(
            &self.binary_path,
            &[
                "-y",
                "-i", source_path,
                "-vf", &scale,
                "-r", &fps_arg,
                "-an",
                dest_path,
            ],
            self.proxy_timeout_sec,
            "proxy encode",
        )
        .await
        .map_err(|e| Error::PreprocessingFailed(e.to_string()))?;
        Ok(())
    }

    async fn extract_audio(&self, source_path: &str, dest_path: &str) -> Result<bool> {
        let result = run_command(
            &self.binary_path,
            &[
                "-y",
                "-i", source_path,
                "-vn",
                "-acodec", "pcm_s16le",
                "-ar", "16000",
                "-ac", "1",
                dest_path,
            ],
            self.audio_timeout_sec,
            "audio extract",
        )
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("Output file does not contain any stream") => Ok(false),
            Err(e) => Err(Error::PreprocessingFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn proxy_encode_of_missing_source_fails_as_preprocessing_error() {
        let transcoder = FfmpegTranscoder::new("definitely-not-a-real-ffmpeg", 5.0, 5.0);
        let err = transcoder
            .build_proxy("missing.mp4", "/tmp/out.mp4", 1, 640)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreprocessingFailed(_)));
    }

    #[tokio::test]
    async fn audio_extract_of_missing_source_fails_as_preprocessing_error() {
        let transcoder = FfmpegTranscoder::new("definitely-not-a-real-ffmpeg", 5.0, 5.0);
        let err = transcoder
            .extract_audio("missing.mp4", "/tmp/out.wav")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreprocessingFailed(_)));
    }
}
