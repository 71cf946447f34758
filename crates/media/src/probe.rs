//! Media probing via an ffprobe-shaped CLI.

use async_trait::async_trait;
use serde::Deserialize;

use vd_domain::error::{Error, Result};

use vd_adapters::traits::{MediaProbe, ProbeInfo};

use crate::subprocess::run_command;

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

pub struct FfprobeMediaProbe {
    binary_path: String,
    timeout_sec: f64,
}

impl FfprobeMediaProbe {
    pub fn new(binary_path: impl Into<String>, timeout_sec: f64) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout_sec,
        }
    }
}

#[async_trait]
impl MediaProbe for FfprobeMediaProbe {
    async fn probe(&self, source_path: &str) -> Result<ProbeInfo> {
        let out = run_command(
            &self.binary_path,
            &[
                "-v", "quiet",
                "-print_format", "json",
                "-show_format",
                "-show_streams",
                source_path,
            ],
            self.timeout_sec,
            "probe",
        )
        .await
        .map_err(|e| Error::InputInvalid(e.to_string()))?;

        let parsed: ProbeOutput = serde_json::from_slice(&out.stdout)
            .map_err(|e| Error::InputInvalid(format!("unparsable probe output: {e}")))?;

        let duration_sec: f64 = parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| Error::InputInvalid("probe output missing duration".to_string()))?;
        if duration_sec <= 0.0 {
            return Err(Error::InputInvalid("zero or negative duration".to_string()));
        }

        let video = parsed.streams.iter().find(|s| s.codec_type == "video");
        let (width, height) = match video {
            Some(v) => (v.width.unwrap_or(0), v.height.unwrap_or(0)),
            None => return Err(Error::InputInvalid("no video stream found".to_string())),
        };
        let audio_present = parsed.streams.iter().any(|s| s.codec_type == "audio");

        Ok(ProbeInfo {
            duration_sec,
            width,
            height,
            audio_present,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_width_height_and_audio_presence() {
        let raw = r#"{
            "format": {"duration": "12.345"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080},
                {"codec_type": "audio"}
            ]
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.format.duration.as_deref(), Some("12.345"));
        assert_eq!(parsed.streams.len(), 2);
    }

    #[test]
    fn missing_video_stream_is_detected() {
        let raw = r#"{"format": {"duration": "5.0"}, "streams": [{"codec_type": "audio"}]}"#;
        let parsed: ProbeOutput = serde_json::from_str(raw).unwrap();
        assert!(!parsed.streams.iter().any(|s| s.codec_type == "video"));
    }

    #[tokio::test]
    async fn probe_of_nonexistent_binary_is_input_invalid() {
        let probe = FfprobeMediaProbe::new("definitely-not-a-real-ffprobe", 5.0);
        let err = probe.probe("video.mp4").await.unwrap_err();
        assert!(matches!(err, Error::InputInvalid(_)));
    }
}
