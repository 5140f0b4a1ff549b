//! Persistence of per-page artifacts.
//!
//! Artifact names are a compatibility contract with downstream loaders:
//!
//! ```text
//! {root}/raw/{document}_page_{n}_raw.json
//! {root}/structured/{document}_page_{n}_structured.json
//! ```
//!
//! Files are written atomically (temp file + rename) so a loader polling the
//! directory never sees a half-written record.

use crate::error::Pdf2JsonError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RAW_SUBFOLDER: &str = "raw";
pub const STRUCTURED_SUBFOLDER: &str = "structured";

/// `{document}_page_{n}_raw.json`
pub fn raw_file_name(document_name: &str, page_index: usize) -> String {
    format!("{document_name}_page_{page_index}_raw.json")
}

/// `{document}_page_{n}_structured.json`
pub fn structured_file_name(document_name: &str, page_index: usize) -> String {
    format!("{document_name}_page_{page_index}_structured.json")
}

/// Destination for JSON artifacts.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Store `value` as `file_name` inside `subfolder`; returns where it went.
    async fn save_json(
        &self,
        subfolder: &str,
        file_name: &str,
        value: &Value,
    ) -> Result<PathBuf, Pdf2JsonError>;
}

/// Writes artifacts below a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ResultStore for DirectoryStore {
    async fn save_json(
        &self,
        subfolder: &str,
        file_name: &str,
        value: &Value,
    ) -> Result<PathBuf, Pdf2JsonError> {
        let dir = self.root.join(subfolder);
        let path = dir.join(file_name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Pdf2JsonError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;

        let body =
            serde_json::to_vec_pretty(value).map_err(|e| Pdf2JsonError::SerializationFailed {
                name: file_name.to_string(),
                source: e,
            })?;

        // Atomic write: write to temp, then rename
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| Pdf2JsonError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Pdf2JsonError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {} ({} bytes)", path.display(), body.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifact_names_follow_contract() {
        assert_eq!(raw_file_name("inv_2024", 3), "inv_2024_page_3_raw.json");
        assert_eq!(
            structured_file_name("inv_2024", 3),
            "inv_2024_page_3_structured.json"
        );
    }

    #[tokio::test]
    async fn directory_store_writes_into_subfolder() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());

        let path = store
            .save_json(RAW_SUBFOLDER, &raw_file_name("doc", 1), &json!({"a": 1}))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("raw").join("doc_page_1_raw.json"));
        let back: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back, json!({"a": 1}));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn overwrite_replaces_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path());
        let name = structured_file_name("doc", 2);

        tokio_test::block_on(store.save_json(STRUCTURED_SUBFOLDER, &name, &json!({"v": 1})))
            .unwrap();
        let path =
            tokio_test::block_on(store.save_json(STRUCTURED_SUBFOLDER, &name, &json!({"v": 2})))
                .unwrap();

        let back: Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(back["v"], 2);
    }
}
