//! Folder-backed document source

use super::{Document, DocumentSource};
use crate::error::{DocumentError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Reads `.pdf`, `.txt` and `.md` files from one folder (not recursive)
#[derive(Debug, Clone, Default)]
pub struct FolderSource;

impl FolderSource {
    pub fn new() -> Self {
        Self
    }

    async fn extract(path: &Path) -> std::result::Result<Option<String>, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => {
                let bytes = tokio::fs::read(path).await?;
                let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| DocumentError::Extraction {
                        path: path.display().to_string(),
                        reason: format!("extraction task failed: {}", e),
                    })?
                    .map_err(|e| DocumentError::Extraction {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(text))
            }
            Some("txt") | Some("md") => Ok(Some(tokio::fs::read_to_string(path).await?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentSource for FolderSource {
    async fn load_documents(&self, path: &Path) -> Result<Vec<Document>> {
        let mut entries = tokio::fs::read_dir(path).await.map_err(|e| {
            DocumentError::SourceUnavailable(format!("{}: {}", path.display(), e))
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(DocumentError::Io)? {
            let file_path = entry.path();
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                files.push(file_path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut documents = Vec::new();
        for file in files {
            let source = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match Self::extract(&file).await {
                Ok(Some(text)) if text.trim().is_empty() => {
                    warn!("No extractable text in {}, skipping", source);
                }
                Ok(Some(text)) => {
                    debug!("Loaded {} ({} characters)", source, text.len());
                    documents.push(Document { source, text });
                }
                Ok(None) => debug!("Ignoring unsupported file {}", source),
                Err(e) => error!("Error loading {}: {}", source, e),
            }
        }

        info!("Loaded {} documents from {}", documents.len(), path.display());
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoachError;

    #[tokio::test]
    async fn test_loads_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b_notes.md"), "# Habits\nStart small.").unwrap();
        std::fs::write(dir.path().join("a_intro.txt"), "Set clear goals.").unwrap();
        std::fs::write(dir.path().join("data.csv"), "x,y").unwrap();
        std::fs::write(dir.path().join("empty.txt"), "   ").unwrap();

        let documents = FolderSource::new().load_documents(dir.path()).await.unwrap();
        let sources: Vec<_> = documents.iter().map(|d| d.source.as_str()).collect();

        assert_eq!(sources, vec!["a_intro.txt", "b_notes.md"]);
        assert_eq!(documents[0].text, "Set clear goals.");
    }

    #[tokio::test]
    async fn test_unreadable_pdf_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf at all").unwrap();
        std::fs::write(dir.path().join("ok.txt"), "Listen first.").unwrap();

        let documents = FolderSource::new().load_documents(dir.path()).await.unwrap();

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source, "ok.txt");
    }

    #[tokio::test]
    async fn test_missing_folder_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = FolderSource::new().load_documents(&missing).await.unwrap_err();
        assert!(matches!(err, CoachError::Document(DocumentError::SourceUnavailable(_))));
    }
}
