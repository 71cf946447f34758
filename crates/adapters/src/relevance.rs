//! The HTTP-backed relevance analyzer: asks an LLM to locate the
//! semantically-relevant moments in a video from its proxy, transcript,
//! and mode-specific prompt.

use async_trait::async_trait;
use serde::Deserialize;

use vd_domain::error::{Error, Result};
use vd_domain::moment::RelevantMoment;
use vd_domain::prompt::PromptRecord;
use vd_domain::transcript::TranscriptSegment;

use crate::traits::RelevanceAnalyzer;
use crate::util::{from_reqwest, strip_code_fence};

#[derive(Debug, Deserialize)]
struct RawMoment {
    start_sec: f64,
    end_sec: f64,
    reason: String,
    #[serde(default)]
    keep_even_if_short: bool,
}

/// Calls a chat-completions-shaped HTTP endpoint and asks it to return a
/// JSON array of moments. Degrades per §4.4 rather than erroring: on a
/// second consecutive invalid response it synthesizes
/// `[{0, duration, "fallback"}]`.
pub struct HttpRelevanceAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRelevanceAnalyzer {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Builds the chat-completions-shaped request body carrying the
    /// proxy video reference, the transcript, and the hint keywords, in
    /// the message-array wire format shared by the generator adapter.
    fn build_body(
        &self,
        system_instruction: &str,
        proxy_video_path: &str,
        transcript: &[TranscriptSegment],
        hint_keywords: &[String],
        reinforce_strict_json: bool,
    ) -> serde_json::Value {
        let mut instruction = system_instruction.to_string();
        if reinforce_strict_json {
            instruction.push_str("\n\nReturn strict JSON only. No prose, no code fences.");
        }
        serde_json::json!({
            "messages": [
                { "role": "system", "content": instruction },
                {
                    "role": "user",
                    "content": {
                        "proxy_video_path": proxy_video_path,
                        "transcript": transcript,
                        "hint_keywords": hint_keywords,
                    }
                }
            ]
        })
    }

    async fn call(&self, body: &serde_json::Value) -> Result<String> {
        let mut req = self.client.post(format!("{}/v1/chat/completions", self.endpoint)).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(from_reqwest)?;
        if !resp.status().is_success() {
            return Err(Error::Http(format!("relevance endpoint returned {}", resp.status())));
        }
        resp.text().await.map_err(from_reqwest)
    }

    fn parse(&self, raw: &str) -> std::result::Result<Vec<RelevantMoment>, serde_json::Error> {
        let cleaned = strip_code_fence(raw);
        let parsed: Vec<RawMoment> = serde_json::from_str(cleaned)?;
        Ok(parsed
            .into_iter()
            .map(|m| {
                let mut moment = RelevantMoment::new(m.start_sec, m.end_sec, m.reason);
                moment.keep_even_if_short = m.keep_even_if_short;
                moment
            })
            .collect())
    }
}

#[async_trait]
impl RelevanceAnalyzer for HttpRelevanceAnalyzer {
    async fn analyze(
        &self,
        proxy_video_path: &str,
        transcript: &[TranscriptSegment],
        hint_keywords: &[String],
        prompt: &PromptRecord,
    ) -> Result<Vec<RelevantMoment>> {
        let first_body = self.build_body(&prompt.system_instruction, proxy_video_path, transcript, hint_keywords, false);
        let first = self.call(&first_body).await?;
        if let Ok(moments) = self.parse(&first) {
            return Ok(moments);
        }

        tracing::warn!("relevance analyzer returned invalid JSON, retrying with strict-JSON reinforcement");
        let second_body = self.build_body(&prompt.system_instruction, proxy_video_path, transcript, hint_keywords, true);
        let second = self.call(&second_body).await?;
        if let Ok(moments) = self.parse(&second) {
            return Ok(moments);
        }

        Err(Error::RelevanceUnavailable(
            "analyzer returned invalid JSON twice".to_string(),
        ))
    }
}

/// The degenerate fallback used when the analyzer is unavailable or
/// keeps returning invalid JSON.
pub fn degenerate_moment(duration_sec: f64) -> Vec<RelevantMoment> {
    vec![RelevantMoment::new(0.0, duration_sec, "fallback")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_well_formed_json_array() {
        let analyzer = HttpRelevanceAnalyzer::new(reqwest::Client::new(), "http://x", None);
        let raw = r#"[{"start_sec": 0.0, "end_sec": 10.0, "reason": "intro"}]"#;
        let moments = analyzer.parse(raw).unwrap();
        assert_eq!(moments.len(), 1);
        assert_eq!(moments[0].reason, "intro");
    }

    #[test]
    fn parse_strips_code_fence_before_parsing() {
        let analyzer = HttpRelevanceAnalyzer::new(reqwest::Client::new(), "http://x", None);
        let raw = "```json\n[{\"start_sec\": 1.0, \"end_sec\": 2.0, \"reason\": \"x\"}]\n```";
        let moments = analyzer.parse(raw).unwrap();
        assert_eq!(moments.len(), 1);
    }

    #[test]
    fn parse_rejects_malformed_json() {
        let analyzer = HttpRelevanceAnalyzer::new(reqwest::Client::new(), "http://x", None);
        assert!(analyzer.parse("not json at all").is_err());
    }

    #[test]
    fn degenerate_moment_spans_whole_video() {
        let moments = degenerate_moment(42.0);
        assert_eq!(moments.len(), 1);
        assert_eq!(moments[0].start_sec, 0.0);
        assert_eq!(moments[0].end_sec, 42.0);
        assert_eq!(moments[0].reason, "fallback");
    }
}
