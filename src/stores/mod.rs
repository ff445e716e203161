//! Persistence for chunk documents and their embeddings.
//!
//! The single backend is SQLite with vector search provided by the
//! `sqlite-vec` extension: a `chunks` table for content and metadata plus a
//! `chunks_embeddings` vec0 virtual table joined by rowid.

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::SqliteChunkStore;

/// One persisted chunk row; paired with an embedding at write time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkDocument {
    /// Unique identifier for this chunk.
    pub id: String,
    /// Source URL of the originating document.
    pub source: String,
    /// Page title of the originating document.
    pub title: String,
    /// Header path above the chunk, joined with " > ". May be empty.
    pub heading: String,
    /// Position of this chunk within the write run.
    pub chunk_index: usize,
    /// The chunk text.
    pub content: String,
    /// Full merged chunk metadata.
    pub metadata: serde_json::Value,
}
