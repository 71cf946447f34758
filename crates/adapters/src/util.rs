//! Shared helpers for the HTTP-backed adapters.

use vd_domain::error::{Error, Result};

/// Converts a [`reqwest::Error`] into the domain [`Error`] type. Timeout
/// errors map to `Error::Timeout` so the orchestrator's stage-timeout
/// handling and this adapter-level timeout agree on vocabulary.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolves an API key from the named environment variable. Adapters
/// needing a vendor credential call this rather than reading
/// `std::env::var` directly, so the error message stays consistent.
pub fn resolve_api_key_env(env_var: &str) -> Result<String> {
    std::env::var(env_var)
        .map_err(|_| Error::Config(format!("environment variable '{env_var}' not set")))
}

/// Strips a Markdown code-fence wrapper (` ```json ... ``` ` or
/// ` ``` ... ``` `) from model output before JSON parsing, since LLMs
/// reliably wrap "return JSON" responses in fences despite instructions
/// not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fence_removes_json_tagged_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn strip_code_fence_removes_bare_fence() {
        let text = "```\n[1, 2, 3]\n```";
        assert_eq!(strip_code_fence(text), "[1, 2, 3]");
    }

    #[test]
    fn strip_code_fence_leaves_unfenced_text_alone() {
        let text = "{\"a\": 1}";
        assert_eq!(strip_code_fence(text), "{\"a\": 1}");
    }

    #[test]
    fn resolve_api_key_env_missing_errors() {
        let err = resolve_api_key_env("VD_TEST_NONEXISTENT_KEY_998877").unwrap_err();
        assert!(err.to_string().contains("VD_TEST_NONEXISTENT_KEY_998877"));
    }

    #[test]
    fn resolve_api_key_env_present() {
        std::env::set_var("VD_TEST_PRESENT_KEY_112233", "secret");
        let val = resolve_api_key_env("VD_TEST_PRESENT_KEY_112233").unwrap();
        assert_eq!(val, "secret");
        std::env::remove_var("VD_TEST_PRESENT_KEY_112233");
    }
}
