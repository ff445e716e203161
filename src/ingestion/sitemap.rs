//! URL discovery from a sitemap XML feed.

use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::types::DeskError;

/// Fetches a sitemap and returns every `<url><loc>` entry in document order.
///
/// A non-2xx response or transport failure is a [`DeskError::Network`]; the
/// caller decides whether that degrades or aborts the run.
pub async fn fetch_sitemap_urls(client: &Client, sitemap_url: &Url) -> Result<Vec<Url>, DeskError> {
    tracing::info!(%sitemap_url, "fetching sitemap");
    let response = client
        .get(sitemap_url.clone())
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;

    let urls = parse_sitemap(&body);
    tracing::info!(count = urls.len(), "sitemap urls resolved");
    Ok(urls)
}

/// Extracts `<url><loc>` values from a sitemap body, in document order.
///
/// Entries that are not valid absolute URLs are skipped.
pub fn parse_sitemap(body: &str) -> Vec<Url> {
    let document = Html::parse_document(body);
    // The sitemap vocabulary is all lowercase, so the HTML tree builder keeps
    // the element names intact and a plain descendant selector matches.
    let selector = Selector::parse("url loc").expect("static selector");

    let mut urls = Vec::new();
    for element in document.select(&selector) {
        let text: String = element.text().collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        match Url::parse(trimmed) {
            Ok(url) => urls.push(url),
            Err(err) => {
                tracing::warn!(loc = trimmed, %err, "skipping invalid sitemap entry");
            }
        }
    }
    urls
}
