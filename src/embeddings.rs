//! Embedding seam: a provider trait plus the rig-backed and mock models.
//!
//! The same provider instance must be used for writing and reading a given
//! index; nothing validates that, the similarity scores are just meaningless
//! otherwise.

use async_trait::async_trait;
use rig::embeddings::embedding::EmbeddingModel;

use crate::types::DeskError;

/// Turns text into fixed-dimension vectors, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for logs and telemetry.
    fn id(&self) -> &str;

    /// Dimension of every vector this provider produces.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts; the output order matches the input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, DeskError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| DeskError::EmbedWrite("provider returned no embedding".into()))
    }
}

/// Adapter exposing any rig [`EmbeddingModel`] through the provider seam.
#[derive(Clone)]
pub struct RigEmbedding<E>
where
    E: EmbeddingModel,
{
    model: E,
    id: String,
}

impl<E> RigEmbedding<E>
where
    E: EmbeddingModel,
{
    pub fn new(model: E, id: impl Into<String>) -> Self {
        Self {
            model,
            id: id.into(),
        }
    }
}

#[async_trait]
impl<E> EmbeddingProvider for RigEmbedding<E>
where
    E: EmbeddingModel + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn dimensions(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self
            .model
            .embed_texts(texts.to_vec())
            .await
            .map_err(|err| DeskError::EmbedWrite(err.to_string()))?;
        Ok(embeddings
            .into_iter()
            .map(|embedding| embedding.vec.into_iter().map(|v| v as f32).collect())
            .collect())
    }
}

/// Deterministic offline provider: a normalized hashed bag-of-words.
///
/// Texts sharing vocabulary land near each other, which is enough for tests
/// and for running the pipeline without any model credentials.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 64 }
    }
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DeskError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_is_deterministic_and_order_preserving() {
        let provider = MockEmbeddingProvider::default();
        let inputs = vec![
            "install the server".to_string(),
            "configure the client".to_string(),
            "install the server".to_string(),
        ];
        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn mock_vectors_are_normalized() {
        let provider = MockEmbeddingProvider::new(16);
        let vector = provider.embed_one("some documentation text").await.unwrap();
        assert_eq!(vector.len(), 16);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
