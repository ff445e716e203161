//! Batched GitBook page loading driven by the site's sitemap.

use reqwest::Client;
use url::Url;

use crate::ingestion::{extract, sitemap};
use crate::types::{DeskError, DocumentMetadata, RawDocument};

/// Number of pages fetched per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

const GITBOOK_SPACE_KEY: &str = "gitbook";
const GITBOOK_CONTENT_TYPE: &str = "GitBook Page";

/// Loads every page of a GitBook site enumerated by its sitemap.
///
/// Network failures are recovered locally: a failed sitemap fetch yields an
/// empty document set, and a failure anywhere inside a batch drops that whole
/// batch. Documents in dropped batches are lost for the run; there is no
/// per-page retry.
#[derive(Clone, Debug)]
pub struct GitbookLoader {
    client: Client,
    sitemap_url: Url,
    batch_size: usize,
}

impl GitbookLoader {
    pub fn new(client: Client, sitemap_url: Url) -> Self {
        Self {
            client,
            sitemap_url,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fetches all pages, batch by batch, returning them in sitemap order.
    pub async fn load(&self) -> Vec<RawDocument> {
        let urls = match sitemap::fetch_sitemap_urls(&self.client, &self.sitemap_url).await {
            Ok(urls) => urls,
            Err(err) => {
                tracing::warn!(%err, "sitemap fetch failed; continuing without gitbook documents");
                return Vec::new();
            }
        };
        if urls.is_empty() {
            tracing::warn!("sitemap contained no urls");
            return Vec::new();
        }

        let total_batches = urls.len().div_ceil(self.batch_size);
        let mut documents = Vec::new();
        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            match self.load_batch(batch).await {
                Ok(mut batch_docs) => {
                    tracing::info!(
                        batch = index + 1,
                        total = total_batches,
                        documents = batch_docs.len(),
                        "gitbook batch loaded"
                    );
                    documents.append(&mut batch_docs);
                }
                Err(err) => {
                    tracing::error!(
                        batch = index + 1,
                        total = total_batches,
                        %err,
                        "gitbook batch failed; skipping"
                    );
                }
            }
        }
        tracing::info!(total = documents.len(), "gitbook documents loaded");
        documents
    }

    async fn load_batch(&self, urls: &[Url]) -> Result<Vec<RawDocument>, DeskError> {
        let mut documents = Vec::with_capacity(urls.len());
        for url in urls {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await?
                .error_for_status()?;
            let body = response.text().await?;
            let content = extract::html_to_text(&body);
            documents.push(RawDocument::new(content, page_metadata(url)));
        }
        Ok(documents)
    }
}

/// Derives the fixed metadata for a GitBook page from its URL.
pub fn page_metadata(url: &Url) -> DocumentMetadata {
    DocumentMetadata {
        source: url.clone(),
        title: title_from_url(url),
        space_key: GITBOOK_SPACE_KEY.to_string(),
        content_type: GITBOOK_CONTENT_TYPE.to_string(),
    }
}

/// Last non-empty path segment, hyphens to spaces, title-cased.
fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back());
    match segment {
        Some(segment) => title_case(&segment.replace('-', " ")),
        None => "Untitled".to_string(),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_derivation_from_path() {
        let url = Url::parse("https://docs.example.com/guide/advanced-usage").unwrap();
        let metadata = page_metadata(&url);
        assert_eq!(metadata.title, "Advanced Usage");
        assert_eq!(metadata.space_key, "gitbook");
        assert_eq!(metadata.content_type, "GitBook Page");
        assert_eq!(metadata.source, url);
    }

    #[test]
    fn trailing_slash_uses_last_nonempty_segment() {
        let url = Url::parse("https://docs.example.com/getting-started/").unwrap();
        assert_eq!(title_from_url(&url), "Getting Started");
    }

    #[test]
    fn empty_path_falls_back_to_untitled() {
        let url = Url::parse("https://docs.example.com/").unwrap();
        assert_eq!(title_from_url(&url), "Untitled");
    }

    #[test]
    fn title_case_lowercases_the_rest() {
        assert_eq!(title_case("API-first design"), "Api-first Design");
    }
}
