//! The HTTP-backed document generator: the second LLM pass that turns
//! keyframes, transcript, and a mode-specific prompt into the final
//! document payload.

use std::collections::HashMap;

use async_trait::async_trait;

use vd_domain::error::{Error, Result};
use vd_domain::keyframe::Keyframe;
use vd_domain::prompt::{OutputFormat, PromptRecord};
use vd_domain::transcript::TranscriptSegment;

use crate::traits::{Cancellation, Generator};
use crate::util::{from_reqwest, strip_code_fence};

pub struct HttpGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Validates the raw model output against the prompt's declared
    /// format: markdown only gets a size check (performed by the
    /// caller), json must parse after fence-stripping.
    fn validate(raw: &[u8], format: OutputFormat) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Markdown => Ok(raw.to_vec()),
            OutputFormat::Json => {
                let text = std::str::from_utf8(raw)
                    .map_err(|e| Error::OutputFormatInvalid(format!("not valid UTF-8: {e}")))?;
                let cleaned = strip_code_fence(text);
                serde_json::from_str::<serde_json::Value>(cleaned)
                    .map_err(|e| Error::OutputFormatInvalid(format!("not valid JSON: {e}")))?;
                Ok(cleaned.as_bytes().to_vec())
            }
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(
        &self,
        prompt: &PromptRecord,
        vars: &HashMap<String, String>,
        keyframes: &[Keyframe],
        transcript: &[TranscriptSegment],
        output_format: OutputFormat,
        cancel: &dyn Cancellation,
    ) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let instruction = prompt.interpolate(vars);
        let body = serde_json::json!({
            "messages": [
                { "role": "system", "content": instruction },
                {
                    "role": "user",
                    "content": {
                        "keyframes": keyframes,
                        "transcript": transcript,
                    }
                }
            ]
        });
        let mut req = self.client.post(format!("{}/v1/chat/completions", self.endpoint)).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(from_reqwest)?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !resp.status().is_success() {
            return Err(Error::Http(format!("generator endpoint returned {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(from_reqwest)?;
        Self::validate(&bytes, output_format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NeverCancelled;

    #[test]
    fn validate_accepts_well_formed_json() {
        let out = HttpGenerator::validate(b"{\"a\": 1}", OutputFormat::Json).unwrap();
        assert_eq!(out, b"{\"a\": 1}");
    }

    #[test]
    fn validate_strips_fence_before_json_check() {
        let out = HttpGenerator::validate(b"```json\n{\"a\": 1}\n```", OutputFormat::Json).unwrap();
        assert_eq!(out, b"{\"a\": 1}");
    }

    #[test]
    fn validate_rejects_malformed_json() {
        assert!(HttpGenerator::validate(b"not json", OutputFormat::Json).is_err());
    }

    #[test]
    fn validate_markdown_passes_through_unchanged() {
        let out = HttpGenerator::validate(b"# Title\nBody text.", OutputFormat::Markdown).unwrap();
        assert_eq!(out, b"# Title\nBody text.");
    }

    #[tokio::test]
    async fn generate_returns_cancelled_when_already_cancelled() {
        struct AlwaysCancelled;
        impl Cancellation for AlwaysCancelled {
            fn is_cancelled(&self) -> bool {
                true
            }
        }
        let gen = HttpGenerator::new(reqwest::Client::new(), "http://localhost:1", None);
        let prompt = PromptRecord::new("general_doc", "General Doc", "hi", OutputFormat::Markdown);
        let err = gen
            .generate(&prompt, &HashMap::new(), &[], &[], OutputFormat::Markdown, &AlwaysCancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn never_cancelled_is_never_cancelled() {
        assert!(!NeverCancelled.is_cancelled());
    }
}
