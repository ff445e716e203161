//! Loaders that turn external documentation sources into [`RawDocument`]s.
//!
//! * [`sitemap`] — URL discovery from a sitemap XML feed.
//! * [`pages`] — batched GitBook page fetching with derived metadata.
//! * [`wiki`] — Confluence space export through its REST content API.
//! * [`sources`] — aggregation of the configured sources into one sequence.
//! * [`extract`] — HTML-to-text extraction shared by the loaders.
//!
//! [`RawDocument`]: crate::types::RawDocument

pub mod extract;
pub mod pages;
pub mod sitemap;
pub mod sources;
pub mod wiki;

pub use pages::GitbookLoader;
pub use sitemap::fetch_sitemap_urls;
pub use sources::{DocumentAggregator, SourceSelector};
pub use wiki::ConfluenceLoader;
