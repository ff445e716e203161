//! Core data model and the error taxonomy shared across the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Errors surfaced by ingestion, chunking, storage, and answering.
#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    /// Sitemap or page fetch failed (recovered locally by the GitBook loader).
    #[error("network request failed: {0}")]
    Network(String),

    /// Wiki API failure. Fatal to the wiki source branch.
    #[error("wiki api error: {0}")]
    Wiki(String),

    /// Malformed content encountered while splitting.
    #[error("document splitting failed: {0}")]
    Chunking(String),

    /// Embedding or index write failure inside the batched writer.
    #[error("embed/write failed: {0}")]
    EmbedWrite(String),

    /// Index open, schema, or persistence failure.
    #[error("vector store error: {0}")]
    Storage(String),

    /// Similarity search failure.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// Language model invocation failure.
    #[error("model invocation failed: {0}")]
    Answer(String),

    /// Missing or malformed configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DeskError {
    fn from(err: reqwest::Error) -> Self {
        DeskError::Network(err.to_string())
    }
}

/// Fixed metadata attached to every document a loader produces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Canonical URL the document was loaded from.
    pub source: Url,
    /// Human-readable page title.
    pub title: String,
    /// Tag identifying the source space ("gitbook" or the wiki space key).
    pub space_key: String,
    /// Descriptive tag for the document kind.
    pub content_type: String,
}

impl DocumentMetadata {
    /// Renders the metadata as a JSON map for merging into chunk metadata.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("source".into(), Value::String(self.source.to_string()));
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("space_key".into(), Value::String(self.space_key.clone()));
        map.insert(
            "content_type".into(),
            Value::String(self.content_type.clone()),
        );
        map
    }
}

/// A document as produced by a loader, before any splitting.
#[derive(Clone, Debug)]
pub struct RawDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl RawDocument {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A retrieval-sized slice of a document with its merged metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: Map<String, Value>,
}

/// Merges header-path keys with the originating document's metadata.
///
/// Header keys are inserted first; the document metadata is applied on top and
/// overrides on conflict, so `source` and `title` always survive splitting.
pub fn merge_metadata(
    header_path: &Map<String, Value>,
    document: &DocumentMetadata,
) -> Map<String, Value> {
    let mut merged = header_path.clone();
    for (key, value) in document.to_map() {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> DocumentMetadata {
        DocumentMetadata {
            source: Url::parse("https://docs.example.com/guide/setup").unwrap(),
            title: "Setup".into(),
            space_key: "gitbook".into(),
            content_type: "GitBook Page".into(),
        }
    }

    #[test]
    fn merge_keeps_document_metadata_on_conflict() {
        let mut headers = Map::new();
        headers.insert("heading_1".into(), Value::String("Install".into()));
        headers.insert("title".into(), Value::String("shadowed".into()));

        let merged = merge_metadata(&headers, &sample_metadata());

        assert_eq!(merged["heading_1"], Value::String("Install".into()));
        assert_eq!(merged["title"], Value::String("Setup".into()));
        assert_eq!(
            merged["source"],
            Value::String("https://docs.example.com/guide/setup".into())
        );
    }

    #[test]
    fn merge_produces_superset_of_document_metadata() {
        let headers = Map::new();
        let merged = merge_metadata(&headers, &sample_metadata());
        for key in ["source", "title", "space_key", "content_type"] {
            assert!(merged.contains_key(key), "missing {key}");
        }
    }
}
