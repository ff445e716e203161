//! Confluence space export through the REST content API.
//!
//! This is the external-facing wrapper around the wiki: it pages through
//! `/rest/api/content` with basic auth and maps each page to a
//! [`RawDocument`]. Failures propagate; wiki access failures are fatal to
//! this source branch, while the GitBook branch recovers independently.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::ConfluenceConfig;
use crate::ingestion::extract;
use crate::types::{DeskError, DocumentMetadata, RawDocument};

const PAGE_LIMIT: usize = 50;
const CONFLUENCE_CONTENT_TYPE: &str = "Confluence Page";

#[derive(Debug, Deserialize)]
struct ContentResponse {
    results: Vec<ContentItem>,
    size: usize,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    title: String,
    #[serde(default)]
    body: Option<ContentBody>,
    #[serde(rename = "_links", default)]
    links: Option<ContentLinks>,
}

#[derive(Debug, Deserialize)]
struct ContentBody {
    #[serde(default)]
    storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
struct StorageBody {
    value: String,
}

#[derive(Debug, Deserialize)]
struct ContentLinks {
    #[serde(default)]
    webui: Option<String>,
}

/// Loads every page of one Confluence space.
#[derive(Clone, Debug)]
pub struct ConfluenceLoader {
    client: Client,
    config: ConfluenceConfig,
}

impl ConfluenceLoader {
    pub fn new(client: Client, config: ConfluenceConfig) -> Self {
        Self { client, config }
    }

    /// Fetches all pages of the configured space, in API order.
    pub async fn load(&self) -> Result<Vec<RawDocument>, DeskError> {
        tracing::info!(space_key = %self.config.space_key, "loading confluence space");
        let endpoint = self.content_endpoint()?;

        let mut documents = Vec::new();
        let mut start = 0usize;
        loop {
            let response = self
                .client
                .get(endpoint.clone())
                .basic_auth(&self.config.username, Some(&self.config.api_key))
                .query(&[
                    ("spaceKey", self.config.space_key.as_str()),
                    ("type", "page"),
                    ("expand", "body.storage"),
                    ("limit", &PAGE_LIMIT.to_string()),
                    ("start", &start.to_string()),
                ])
                .send()
                .await
                .map_err(|err| DeskError::Wiki(err.to_string()))?
                .error_for_status()
                .map_err(|err| DeskError::Wiki(err.to_string()))?;

            let page: ContentResponse = response
                .json()
                .await
                .map_err(|err| DeskError::Wiki(err.to_string()))?;

            let fetched = page.size;
            for item in page.results {
                documents.push(self.page_to_document(item));
            }

            if fetched < PAGE_LIMIT {
                break;
            }
            start += fetched;
        }

        tracing::info!(count = documents.len(), "confluence documents loaded");
        Ok(documents)
    }

    fn content_endpoint(&self) -> Result<Url, DeskError> {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/rest/api/content"))
            .map_err(|err| DeskError::Wiki(format!("invalid base url: {err}")))
    }

    fn page_to_document(&self, item: ContentItem) -> RawDocument {
        let source = item
            .links
            .as_ref()
            .and_then(|links| links.webui.as_deref())
            .and_then(|webui| self.config.base_url.join(webui).ok())
            .unwrap_or_else(|| self.config.base_url.clone());

        let html = item
            .body
            .and_then(|body| body.storage)
            .map(|storage| storage.value)
            .unwrap_or_default();

        RawDocument::new(
            extract::html_to_text(&html),
            DocumentMetadata {
                source,
                title: item.title,
                space_key: self.config.space_key.clone(),
                content_type: CONFLUENCE_CONTENT_TYPE.to_string(),
            },
        )
    }
}
