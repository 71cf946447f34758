//! Reads `PromptRecord`s off disk: one TOML file per prompt, named
//! `<id>.toml`, living directly under the prompts root.

use std::path::Path;

use vd_domain::error::{Error, Result};
use vd_domain::prompt::PromptRecord;

/// Scans `prompts_root` non-recursively for `*.toml` files and parses
/// each as a `PromptRecord`. A malformed file fails the whole scan
/// rather than silently dropping a prompt mid-catalog.
pub fn scan_prompts(prompts_root: &Path) -> Result<Vec<PromptRecord>> {
    if !prompts_root.exists() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    let entries = std::fs::read_dir(prompts_root)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let content = std::fs::read_to_string(&path)?;
        let record: PromptRecord = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        records.push(record);
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_of_missing_directory_yields_empty_catalog() {
        let records = scan_prompts(Path::new("/nonexistent/does/not/exist")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn scan_parses_all_toml_files_and_sorts_by_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b_mode.toml"),
            r#"
            id = "b_mode"
            display_name = "B Mode"
            description = "second"
            model_preference = "fast"
            system_instruction = "Summarize ${title}."
            output_format = "markdown"
            guidelines = ["be concise"]
            "#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a_mode.toml"),
            r#"
            id = "a_mode"
            display_name = "A Mode"
            description = "first"
            model_preference = "quality"
            system_instruction = "Detail ${title}."
            output_format = "json"
            "#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = scan_prompts(dir.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a_mode");
        assert_eq!(records[1].id, "b_mode");
    }

    #[test]
    fn scan_fails_on_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        assert!(scan_prompts(dir.path()).is_err());
    }
}
