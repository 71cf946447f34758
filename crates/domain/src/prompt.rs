use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which model tier a prompt prefers when the caller has a choice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelPreference {
    Fast,
    Quality,
}

/// The shape the Generator's output is validated against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Markdown,
    Json,
}

/// A named, immutable prompt template loaded by the prompt registry.
/// Identified by `id` (a mode identifier such as `general_doc` or a
/// purpose identifier such as `audio_filter` for relevance selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub model_preference: ModelPreference,
    pub system_instruction: String,
    pub output_format: OutputFormat,
    #[serde(default)]
    pub guidelines: Vec<String>,
}

impl PromptRecord {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        system_instruction: impl Into<String>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: String::new(),
            model_preference: ModelPreference::Fast,
            system_instruction: system_instruction.into(),
            output_format,
            guidelines: Vec::new(),
        }
    }

    /// Interpolates `${name}` placeholders in `system_instruction` using
    /// `vars`. A second pass over the result is a no-op, since every
    /// declared placeholder the first pass resolved is gone and nothing
    /// remaining looks like `${known_name}` anymore.
    pub fn interpolate(&self, vars: &HashMap<String, String>) -> String {
        substitute(&self.system_instruction, vars)
    }
}

/// Substitutes `${name}` placeholders in `template` using `values`.
/// A name with no entry in `values` resolves to the empty string. A
/// stray `${` with no matching `}` is preserved verbatim, since it is
/// not a well-formed placeholder. `$$` escapes to a literal `$`. This is
/// deliberately a textual substitution, never an expression language, so
/// prompts can carry raw JSON with literal braces without escaping.
pub fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
            out.push('$');
            i += 2;
            continue;
        }
        if bytes[i] == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = template[i + 2..].find('}') {
                let name = &template[i + 2..i + 2 + end];
                if let Some(v) = values.get(name) {
                    out.push_str(v);
                }
                i += 2 + end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vals(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_known_placeholder() {
        let out = substitute("Hello ${name}!", &vals(&[("name", "world")]));
        assert_eq!(out, "Hello world!");
    }

    #[test]
    fn unknown_placeholder_substitutes_to_empty_string() {
        let out = substitute("Hello ${missing}!", &vals(&[]));
        assert_eq!(out, "Hello !");
    }

    #[test]
    fn dollar_dollar_escapes_to_literal_dollar() {
        let out = substitute("Price: $$5", &vals(&[]));
        assert_eq!(out, "Price: $5");
    }

    #[test]
    fn unterminated_placeholder_is_preserved_verbatim() {
        let out = substitute("broken ${oops", &vals(&[("oops", "x")]));
        assert_eq!(out, "broken ${oops");
    }

    #[test]
    fn template_with_no_placeholders_is_byte_identical() {
        let text = "Plain text with {braces} but no dollar signs.";
        assert_eq!(substitute(text, &vals(&[("braces", "x")])), text);
    }

    #[test]
    fn second_pass_is_idempotent() {
        let once = substitute("Title: ${title}", &vals(&[("title", "Demo")]));
        let twice = substitute(&once, &vals(&[("title", "Demo")]));
        assert_eq!(once, twice);
    }

    #[test]
    fn record_interpolate_delegates_to_substitute() {
        let rec = PromptRecord::new("general_doc", "General Doc", "Title: ${title}", OutputFormat::Markdown);
        let out = rec.interpolate(&vals(&[("title", "Demo")]));
        assert_eq!(out, "Title: Demo");
    }
}
