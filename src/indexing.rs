//! Batched embedding and persistence, plus the pipeline facade.
//!
//! The writer embeds chunks in batches and commits each batch as one
//! transaction. Failures degrade through an explicit granularity ladder
//! (batch, then half-batch, then single chunk), bounding data loss to
//! individual chunks. Retries are immediate; only the unit size changes, and
//! an already-attempted larger unit is never retried.

use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use crate::answer::{CompletionProvider, RetrievalAnswerer};
use crate::chunking::Chunker;
use crate::config::DeskConfig;
use crate::embeddings::EmbeddingProvider;
use crate::ingestion::{ConfluenceLoader, DocumentAggregator, GitbookLoader};
use crate::stores::{ChunkDocument, SqliteChunkStore};
use crate::types::{Chunk, DeskError};

/// Chunks embedded and committed per write batch.
pub const DEFAULT_WRITE_BATCH: usize = 100;

const UNTITLED_FALLBACK: &str = "제목 없음";
const SOURCE_FALLBACK: &str = "#";

/// Outcome of a write run.
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteReport {
    /// Chunks committed to the index.
    pub committed: usize,
    /// Chunks permanently skipped after per-chunk failure.
    pub skipped: usize,
}

/// Embeds chunks and persists them into the index in batches.
pub struct VectorStoreWriter {
    store: SqliteChunkStore,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl VectorStoreWriter {
    pub fn new(store: SqliteChunkStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            batch_size: DEFAULT_WRITE_BATCH,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Writes every chunk, degrading the unit size on failure.
    ///
    /// Never fails as a whole: chunks that cannot be embedded individually
    /// are logged and skipped, everything else is committed.
    pub async fn write_all(&self, chunks: Vec<Chunk>) -> WriteReport {
        let documents: Vec<ChunkDocument> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| chunk_to_document(chunk, index))
            .collect();

        let mut report = WriteReport::default();
        let total_batches = documents.len().div_ceil(self.batch_size);
        for (index, batch) in documents.chunks(self.batch_size).enumerate() {
            match self.commit_unit(batch).await {
                Ok(()) => {
                    report.committed += batch.len();
                    tracing::info!(
                        batch = index + 1,
                        total = total_batches,
                        chunks = batch.len(),
                        "batch committed"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        batch = index + 1,
                        total = total_batches,
                        %err,
                        "batch failed; retrying at half size"
                    );
                    self.commit_degraded(batch, &mut report).await;
                }
            }
        }
        tracing::info!(
            committed = report.committed,
            skipped = report.skipped,
            "write run finished"
        );
        report
    }

    /// The remaining tiers of the ladder: half-batches, then single chunks.
    async fn commit_degraded(&self, batch: &[ChunkDocument], report: &mut WriteReport) {
        let half = batch.len().div_ceil(2).max(1);
        for unit in batch.chunks(half) {
            if unit.len() > 1 {
                match self.commit_unit(unit).await {
                    Ok(()) => {
                        report.committed += unit.len();
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(chunks = unit.len(), %err, "half-batch failed; retrying per chunk");
                    }
                }
            }
            for single in unit.chunks(1) {
                match self.commit_unit(single).await {
                    Ok(()) => report.committed += 1,
                    Err(err) => {
                        tracing::error!(id = %single[0].id, %err, "chunk failed; skipping");
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    /// Embeds one unit and commits it as a single transaction.
    async fn commit_unit(&self, documents: &[ChunkDocument]) -> Result<(), DeskError> {
        let texts: Vec<String> = documents
            .iter()
            .map(|document| document.content.clone())
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(DeskError::EmbedWrite(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                documents.len()
            )));
        }
        let rows: Vec<(ChunkDocument, Vec<f32>)> =
            documents.iter().cloned().zip(embeddings).collect();
        self.store.add_chunks(rows).await
    }
}

fn chunk_to_document(chunk: &Chunk, index: usize) -> ChunkDocument {
    let title = chunk
        .metadata
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(UNTITLED_FALLBACK)
        .to_string();
    let source = chunk
        .metadata
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or(SOURCE_FALLBACK)
        .to_string();
    let heading = ["heading_1", "heading_2", "heading_3"]
        .iter()
        .filter_map(|key| chunk.metadata.get(*key).and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" > ");

    ChunkDocument {
        id: Uuid::new_v4().to_string(),
        source,
        title,
        heading,
        chunk_index: index,
        content: chunk.content.clone(),
        metadata: Value::Object(chunk.metadata.clone()),
    }
}

/// Writes chunks to a JSONL file, one `{content, metadata}` object per line.
pub async fn dump_chunks(path: &Path, chunks: &[Chunk]) -> Result<(), DeskError> {
    let mut lines = String::new();
    for chunk in chunks {
        let line =
            serde_json::to_string(chunk).map_err(|err| DeskError::Chunking(err.to_string()))?;
        lines.push_str(&line);
        lines.push('\n');
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, lines).await?;
    tracing::info!(path = %path.display(), chunks = chunks.len(), "chunk dump written");
    Ok(())
}

/// Public entry point tying loaders, chunker, writer, and answerer together.
pub struct DeskPipeline {
    config: DeskConfig,
    http: Client,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DeskPipeline {
    pub fn new(config: DeskConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, DeskError> {
        let http = Client::builder()
            .user_agent(concat!("ragdesk-ingestor/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()?;
        Ok(Self {
            config,
            http,
            embedder,
        })
    }

    /// Builds the index from the configured sources (`rebuild = true`,
    /// destructive) or opens the existing one (`rebuild = false`).
    pub async fn build_or_load_index(&self, rebuild: bool) -> Result<SqliteChunkStore, DeskError> {
        if !rebuild {
            return SqliteChunkStore::open_existing(
                &self.config.index_path,
                self.embedder.dimensions(),
            )
            .await;
        }

        let documents = self.aggregator().load_documents().await?;
        let chunks = Chunker::default().split_documents(&documents);

        if let Some(dump_path) = &self.config.chunk_dump_path {
            if let Err(err) = dump_chunks(dump_path, &chunks).await {
                tracing::warn!(%err, "chunk dump failed; continuing");
            }
        }

        let store =
            SqliteChunkStore::create(&self.config.index_path, self.embedder.dimensions()).await?;
        let writer = VectorStoreWriter::new(store.clone(), Arc::clone(&self.embedder));
        let report = writer.write_all(chunks).await;
        tracing::info!(
            committed = report.committed,
            skipped = report.skipped,
            index = %self.config.index_path.display(),
            "index build complete"
        );
        Ok(store)
    }

    /// Wires an answerer over an opened index with the configured providers.
    pub fn answerer(
        &self,
        store: SqliteChunkStore,
        completion: Arc<dyn CompletionProvider>,
    ) -> RetrievalAnswerer {
        RetrievalAnswerer::new(store, Arc::clone(&self.embedder), completion)
    }

    fn aggregator(&self) -> DocumentAggregator {
        let confluence = self
            .config
            .confluence
            .as_ref()
            .map(|config| ConfluenceLoader::new(self.http.clone(), config.clone()));
        let gitbook = GitbookLoader::new(self.http.clone(), self.config.gitbook_sitemap.clone());
        DocumentAggregator::new(confluence, gitbook, self.config.document_source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn chunk_with(metadata: &[(&str, &str)]) -> Chunk {
        let mut map = Map::new();
        for (key, value) in metadata {
            map.insert((*key).to_string(), Value::String((*value).to_string()));
        }
        Chunk {
            content: "chunk body".to_string(),
            metadata: map,
        }
    }

    #[test]
    fn chunk_document_carries_title_source_and_heading_path() {
        let chunk = chunk_with(&[
            ("title", "Guide"),
            ("source", "https://docs.example.com/guide"),
            ("heading_1", "Ops"),
            ("heading_3", "Rollback"),
        ]);
        let document = chunk_to_document(&chunk, 7);
        assert_eq!(document.title, "Guide");
        assert_eq!(document.source, "https://docs.example.com/guide");
        assert_eq!(document.heading, "Ops > Rollback");
        assert_eq!(document.chunk_index, 7);
        assert_eq!(document.content, "chunk body");
        assert_eq!(document.metadata["title"], "Guide");
    }

    #[test]
    fn missing_title_and_source_use_fallbacks() {
        let document = chunk_to_document(&chunk_with(&[]), 0);
        assert_eq!(document.title, UNTITLED_FALLBACK);
        assert_eq!(document.source, SOURCE_FALLBACK);
        assert_eq!(document.heading, "");
    }

    #[tokio::test]
    async fn dump_writes_one_json_line_per_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump/splitted_docs.jsonl");
        let chunks = vec![
            chunk_with(&[("title", "A")]),
            chunk_with(&[("title", "B")]),
        ];

        dump_chunks(&path, &chunks).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Chunk = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.metadata["title"], "A");
    }
}
