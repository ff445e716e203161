//! Two-stage document splitter.
//!
//! Stage one segments a document at markdown header boundaries and records
//! the header path; stage two cuts each segment down to retrieval-sized
//! chunks with a small overlap. Every chunk inherits the merge of its header
//! path with the originating document's metadata.

pub mod headers;
pub mod size;

use crate::types::{Chunk, RawDocument, merge_metadata};

pub use size::{CHUNK_OVERLAP, CHUNK_SIZE};

/// Splits raw documents into retrieval-sized chunks.
#[derive(Clone, Copy, Debug)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            chunk_overlap: CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Splits every document, preserving document order.
    ///
    /// Deterministic: identical input always yields identical chunks.
    pub fn split_documents(&self, documents: &[RawDocument]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            self.split_document(document, &mut chunks);
        }
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "documents split"
        );
        chunks
    }

    fn split_document(&self, document: &RawDocument, chunks: &mut Vec<Chunk>) {
        for segment in headers::split_by_headers(&document.content) {
            let metadata = merge_metadata(&segment.header_path, &document.metadata);
            for content in size::split_segment(&segment.content, self.chunk_size, self.chunk_overlap)
            {
                chunks.push(Chunk {
                    content,
                    metadata: metadata.clone(),
                });
            }
        }
    }
}
