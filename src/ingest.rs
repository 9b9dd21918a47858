//! Ingestion pipeline: source directory → embeddings → collection →
//! archive.
//!
//! Per-document commit semantics: each file is embedded, upserted, and only
//! then moved to the archive directory. A bad document is recorded against
//! its own id and the batch keeps going; a systemic failure (index
//! unreachable, index deadline exceeded) aborts the remainder. Work already
//! committed for earlier documents stands either way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::IngestSettings;
use crate::embed::EmbeddingProvider;
use crate::error::PipelineError;
use crate::store::{CollectionManager, PointRecord, VectorIndex};

/// Outcome of one ingestion batch.
///
/// `relocation_failures` lists documents whose vectors were stored but whose
/// backing file could not be moved; for those the vector store and the
/// filesystem disagree until the file is moved by hand or re-ingested.
#[derive(Debug, Default, Serialize)]
pub struct IngestionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<DocumentFailure>,
    pub relocation_failures: Vec<DocumentFailure>,
}

#[derive(Debug, Serialize)]
pub struct DocumentFailure {
    /// File name of the offending document.
    pub document: String,
    /// Stable error kind, see [`PipelineError::kind`].
    pub kind: String,
    pub message: String,
}

impl DocumentFailure {
    fn new(document: &str, err: &PipelineError) -> Self {
        Self {
            document: document.to_string(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    manager: CollectionManager,
    settings: IngestSettings,
}

impl IngestionPipeline {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        settings: IngestSettings,
    ) -> Self {
        let manager = CollectionManager::new(index.clone());
        Self {
            index,
            embedder,
            manager,
            settings,
        }
    }

    /// Ingest every regular file under `source_dir` into `collection`.
    ///
    /// A missing or empty source directory is "nothing to do", not an
    /// error. The collection is ensured exactly once per batch, with the
    /// provider's dimension and the configured metric.
    pub async fn run(
        &self,
        source_dir: &Path,
        collection: &str,
    ) -> Result<IngestionSummary, PipelineError> {
        let mut summary = IngestionSummary::default();

        let files = match enumerate_files(source_dir, &mut summary.skipped).await? {
            Some(files) if !files.is_empty() => files,
            _ => {
                info!(collection, source = %source_dir.display(), "no documents to ingest");
                return Ok(summary);
            }
        };

        self.manager
            .ensure(collection, self.embedder.dimension(), self.settings.metric)
            .await?;

        tokio::fs::create_dir_all(&self.settings.archive_dir)
            .await
            .map_err(|e| PipelineError::io(self.settings.archive_dir.clone(), e))?;

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match self.ingest_one(&path, &file_name, collection).await {
                Ok(()) => {
                    summary.succeeded += 1;
                    match self.relocate(&path, &file_name).await {
                        Ok(archived) => {
                            info!(collection, document = %file_name, archived = %archived.display(), "document ingested");
                        }
                        Err(err) => {
                            warn!(collection, document = %file_name, error = %err, "upsert committed but relocation failed");
                            summary
                                .relocation_failures
                                .push(DocumentFailure::new(&file_name, &err));
                        }
                    }
                }
                Err(err) if err.is_systemic() => {
                    warn!(collection, document = %file_name, error = %err, "systemic failure, aborting batch");
                    return Err(err);
                }
                Err(err) => {
                    warn!(collection, document = %file_name, error = %err, "document failed, file left in place");
                    summary.failed += 1;
                    summary.failures.push(DocumentFailure::new(&file_name, &err));
                }
            }
        }

        info!(
            collection,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "ingest_complete"
        );
        Ok(summary)
    }

    /// Embed and upsert one document. The caller relocates on success.
    async fn ingest_one(
        &self,
        path: &Path,
        file_name: &str,
        collection: &str,
    ) -> Result<(), PipelineError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PipelineError::io(path, e))?;

        let vector = self.embedder.embed(&content).await?;

        let expected = self.embedder.dimension();
        let actual = vector.len() as u64;
        if actual != expected {
            return Err(PipelineError::DimensionMismatch {
                collection: collection.to_string(),
                expected,
                actual,
            });
        }

        let record = PointRecord {
            id: document_id(path),
            vector,
            text: content,
            metadata: HashMap::from([
                ("source_path".to_string(), path.display().to_string()),
                ("file_name".to_string(), file_name.to_string()),
                ("ingested_at".to_string(), Utc::now().to_rfc3339()),
            ]),
        };

        self.index.upsert(collection, vec![record]).await
    }

    async fn relocate(&self, path: &Path, file_name: &str) -> Result<PathBuf, PipelineError> {
        let target = self.settings.archive_dir.join(file_name);
        if tokio::fs::rename(path, &target).await.is_ok() {
            return Ok(target);
        }
        // Rename fails with EXDEV when the archive sits on another
        // filesystem than the source.
        match copy_then_remove(path, &target).await {
            Ok(()) => Ok(target),
            Err(err) => Err(PipelineError::ArchiveRelocation {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }),
        }
    }
}

async fn copy_then_remove(path: &Path, target: &Path) -> std::io::Result<()> {
    tokio::fs::copy(path, target).await?;
    tokio::fs::remove_file(path).await
}

/// Deterministic point id for a source path: re-ingesting the same file
/// updates its vector instead of duplicating it.
fn document_id(path: &Path) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, path.display().to_string().as_bytes()).to_string()
}

/// Regular files under `dir`, name-sorted for a stable processing order.
/// `Ok(None)` when the directory does not exist.
async fn enumerate_files(
    dir: &Path,
    skipped: &mut usize,
) -> Result<Option<Vec<PathBuf>>, PipelineError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(PipelineError::io(dir, err)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::io(dir, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| PipelineError::io(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        } else {
            *skipped += 1;
        }
    }
    files.sort();
    Ok(Some(files))
}
