//! Session-directory-scoped artifact storage.
//!
//! Every write goes through a temp-file-then-rename so a crash mid-write
//! never leaves a corrupt or partial file where a caller expects a
//! complete one — the previous good artifact (or no file at all) is the
//! only two states ever observable from outside.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use vd_domain::error::{Error, Result};

/// Canonical artifact names understood by the orchestrator, kept here so
/// every crate that names an artifact spells it the same way.
pub mod names {
    pub const PROXY: &str = "proxy.mp4";
    pub const AUDIO: &str = "audio.wav";
    pub const TRANSCRIPT: &str = "transcript.json";
    pub const MOMENTS: &str = "moments.json";
    pub const SESSION: &str = "session.json";
    pub const TRACE: &str = "trace.jsonl";
    pub const FRAMES_DIR: &str = "frames";

    pub fn doc(output_format_ext: &str) -> String {
        format!("doc.{output_format_ext}")
    }

    pub fn source(ext: &str) -> String {
        format!("source.{ext}")
    }
}

/// One entry in a keyframe sub-manifest.
#[derive(Debug, Clone, Serialize)]
pub struct KeyframeManifestEntry {
    pub index: usize,
    pub timestamp_sec: f64,
    pub path: String,
}

/// Persists artifacts under `<root>/<session_id>/...`.
#[derive(Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns (creating if needed) the session-scoped artifact directory.
    pub async fn session_root(&self, session_id: &str) -> Result<PathBuf> {
        let dir = self.root.join(session_id);
        fs::create_dir_all(&dir).await.map_err(Error::Io)?;
        Ok(dir)
    }

    /// Writes `bytes` to `dir/name`, atomically.
    pub async fn put_bytes(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dest = dir.join(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        let tmp = tmp_sibling(&dest);

        let mut file = fs::File::create(&tmp).await.map_err(Error::Io)?;
        file.write_all(bytes).await.map_err(Error::Io)?;
        file.flush().await.map_err(Error::Io)?;
        file.sync_data().await.map_err(Error::Io)?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::Io(e));
        }
        Ok(dest)
    }

    /// Serializes `value` as pretty JSON and writes it atomically.
    pub async fn put_json<T: Serialize + ?Sized>(&self, dir: &Path, name: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(value).map_err(Error::Json)?;
        self.put_bytes(dir, name, &json).await
    }

    /// Copies an externally-produced file (e.g. a transcoder's temp
    /// output) into the artifact directory atomically, without trusting
    /// the source's own write to have been atomic.
    pub async fn put_file(&self, dir: &Path, name: &str, source: &Path) -> Result<PathBuf> {
        let dest = dir.join(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }
        let tmp = tmp_sibling(&dest);
        fs::copy(source, &tmp).await.map_err(Error::Io)?;
        if let Err(e) = fs::rename(&tmp, &dest).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(Error::Io(e));
        }
        Ok(dest)
    }

    pub async fn get_bytes(&self, dir: &Path, name: &str) -> Result<Vec<u8>> {
        fs::read(dir.join(name)).await.map_err(Error::Io)
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, dir: &Path, name: &str) -> Result<T> {
        let bytes = self.get_bytes(dir, name).await?;
        serde_json::from_slice(&bytes).map_err(Error::Json)
    }

    pub fn path_of(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(name)
    }

    pub fn exists(&self, dir: &Path, name: &str) -> bool {
        dir.join(name).exists()
    }

    /// Lists every file under `dir` (recursively, for the `frames/`
    /// sub-directory) as a map from logical name to path relative to
    /// `dir`.
    pub async fn manifest(&self, dir: &Path) -> Result<HashMap<String, String>> {
        let mut out = HashMap::new();
        let mut stack = vec![PathBuf::new()];
        while let Some(rel) = stack.pop() {
            let abs = dir.join(&rel);
            let mut entries = fs::read_dir(&abs).await.map_err(Error::Io)?;
            while let Some(entry) = entries.next_entry().await.map_err(Error::Io)? {
                let file_type = entry.file_type().await.map_err(Error::Io)?;
                let entry_rel = rel.join(entry.file_name());
                if file_type.is_dir() {
                    stack.push(entry_rel);
                } else {
                    let key = entry_rel.to_string_lossy().replace('\\', "/");
                    out.insert(key.clone(), key);
                }
            }
        }
        Ok(out)
    }

    /// Writes the keyframes sub-manifest, sorted by index.
    pub async fn put_keyframe_manifest(
        &self,
        dir: &Path,
        entries: &[KeyframeManifestEntry],
    ) -> Result<PathBuf> {
        self.put_json(dir, "keyframes.json", entries).await
    }

    /// Recursively removes a session's artifact directory.
    pub async fn delete(&self, dir: &Path) -> Result<()> {
        match fs::remove_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn tmp_sibling(dest: &Path) -> PathBuf {
    let name = dest.file_name().unwrap_or_default().to_string_lossy();
    let tmp_name = format!(".{name}.{}.tmp", uuid::Uuid::new_v4().as_simple());
    dest.with_file_name(tmp_name)
}
