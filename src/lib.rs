//! ```text
//! Sitemap feed ──► ingestion::sitemap ──┐
//!                                       ├─► ingestion::pages (batched)
//! Confluence API ─► ingestion::wiki ────┤
//!                                       ▼
//!                  ingestion::sources ──► RawDocument sequence
//!                                       │
//!                  chunking (headers ► size) ──► Chunk sequence
//!                                       │
//!                  indexing::VectorStoreWriter ──► stores::SqliteChunkStore
//!                                       │
//!                  answer::RetrievalAnswerer ──► grounded Answer + sources
//! ```
//!
pub mod answer;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod indexing;
pub mod ingestion;
pub mod stores;
pub mod types;

pub use answer::{Answer, CompletionProvider, RetrievalAnswerer, RigCompletion};
pub use chunking::Chunker;
pub use config::{ConfluenceConfig, DeskConfig};
pub use embeddings::{EmbeddingProvider, MockEmbeddingProvider, RigEmbedding};
pub use indexing::{DeskPipeline, VectorStoreWriter, WriteReport};
pub use ingestion::{ConfluenceLoader, DocumentAggregator, GitbookLoader, SourceSelector};
pub use stores::{ChunkDocument, SqliteChunkStore};
pub use types::{Chunk, DeskError, DocumentMetadata, RawDocument};
