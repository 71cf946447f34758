use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use vd_domain::error::{Error, Result};
use vd_domain::prompt::PromptRecord;

use crate::loader;

/// In-memory catalog of `PromptRecord`s, reloadable without downtime.
/// `reload` builds the new catalog off-lock and swaps it in atomically,
/// so a reader never observes a partially-rebuilt catalog.
pub struct PromptRegistry {
    entries: RwLock<Vec<PromptRecord>>,
    prompts_root: PathBuf,
}

impl PromptRegistry {
    pub fn load(prompts_root: &Path) -> Result<Self> {
        let entries = loader::scan_prompts(prompts_root)?;
        tracing::info!(prompt_count = entries.len(), "prompt registry loaded");
        Ok(Self {
            entries: RwLock::new(entries),
            prompts_root: prompts_root.to_path_buf(),
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            prompts_root: PathBuf::new(),
        }
    }

    pub fn get(&self, id: &str) -> Result<PromptRecord> {
        self.entries
            .read()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::InputInvalid(format!("unknown mode '{id}'")))
    }

    pub fn list(&self) -> Vec<PromptRecord> {
        self.entries.read().clone()
    }

    pub fn interpolate(&self, id: &str, vars: &HashMap<String, String>) -> Result<String> {
        let record = self.get(id)?;
        Ok(record.interpolate(vars))
    }

    /// Re-scans the prompts root and swaps in the new catalog. A prompt
    /// file removed mid-flight does not affect sessions already holding
    /// a cloned `PromptRecord`.
    pub fn reload(&self) -> Result<usize> {
        let new_entries = loader::scan_prompts(&self.prompts_root)?;
        let count = new_entries.len();
        *self.entries.write() = new_entries;
        tracing::info!(prompt_count = count, "prompt registry reloaded");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vd_domain::prompt::OutputFormat;

    fn write_prompt(dir: &Path, id: &str, instruction: &str) {
        std::fs::write(
            dir.join(format!("{id}.toml")),
            format!(
                r#"
                id = "{id}"
                display_name = "{id}"
                description = "d"
                model_preference = "fast"
                system_instruction = "{instruction}"
                output_format = "markdown"
                "#
            ),
        )
        .unwrap();
    }

    #[test]
    fn get_returns_unknown_mode_error_for_missing_id() {
        let registry = PromptRegistry::empty();
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, Error::InputInvalid(_)));
    }

    #[test]
    fn load_then_get_then_interpolate_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "tutorial", "Document ${title} for ${audience}.");
        let registry = PromptRegistry::load(dir.path()).unwrap();

        let record = registry.get("tutorial").unwrap();
        assert_eq!(record.output_format, OutputFormat::Markdown);

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), "Widgets".to_string());
        let rendered = registry.interpolate("tutorial", &vars).unwrap();
        assert_eq!(rendered, "Document Widgets for .");
    }

    #[test]
    fn reload_picks_up_newly_added_prompts() {
        let dir = tempfile::tempdir().unwrap();
        write_prompt(dir.path(), "one", "hello");
        let registry = PromptRegistry::load(dir.path()).unwrap();
        assert_eq!(registry.list().len(), 1);

        write_prompt(dir.path(), "two", "world");
        let count = registry.reload().unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.list().len(), 2);
    }
}
