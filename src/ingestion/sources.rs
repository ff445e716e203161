//! Aggregation of the configured document sources into one ordered sequence.

use std::str::FromStr;

use crate::ingestion::{ConfluenceLoader, GitbookLoader};
use crate::types::{DeskError, RawDocument};

/// Which documentation sources to ingest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceSelector {
    Confluence,
    Gitbook,
    Both,
}

impl SourceSelector {
    pub fn includes_confluence(self) -> bool {
        matches!(self, Self::Confluence | Self::Both)
    }

    pub fn includes_gitbook(self) -> bool {
        matches!(self, Self::Gitbook | Self::Both)
    }
}

impl FromStr for SourceSelector {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confluence" => Ok(Self::Confluence),
            "gitbook" => Ok(Self::Gitbook),
            "both" => Ok(Self::Both),
            other => Err(DeskError::Config(format!(
                "unknown document source '{other}'. Expected 'confluence', 'gitbook', or 'both'."
            ))),
        }
    }
}

/// Unions the configured loaders into one ordered document sequence.
///
/// Wiki documents always come first, then GitBook documents. Nothing is
/// deduplicated across sources. Wiki failures propagate; the GitBook loader
/// degrades internally.
pub struct DocumentAggregator {
    confluence: Option<ConfluenceLoader>,
    gitbook: GitbookLoader,
    selector: SourceSelector,
}

impl DocumentAggregator {
    pub fn new(
        confluence: Option<ConfluenceLoader>,
        gitbook: GitbookLoader,
        selector: SourceSelector,
    ) -> Self {
        Self {
            confluence,
            gitbook,
            selector,
        }
    }

    pub async fn load_documents(&self) -> Result<Vec<RawDocument>, DeskError> {
        let mut documents = Vec::new();

        if self.selector.includes_confluence() {
            let loader = self.confluence.as_ref().ok_or_else(|| {
                DeskError::Config(
                    "confluence source selected but no wiki loader is configured".into(),
                )
            })?;
            documents.extend(loader.load().await?);
        }

        if self.selector.includes_gitbook() {
            documents.extend(self.gitbook.load().await);
        }

        tracing::info!(total = documents.len(), "documents aggregated");
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_case_insensitively() {
        assert_eq!(
            "Confluence".parse::<SourceSelector>().unwrap(),
            SourceSelector::Confluence
        );
        assert_eq!(
            "GITBOOK".parse::<SourceSelector>().unwrap(),
            SourceSelector::Gitbook
        );
        assert_eq!(
            "both".parse::<SourceSelector>().unwrap(),
            SourceSelector::Both
        );
        assert!("wiki".parse::<SourceSelector>().is_err());
    }

    #[test]
    fn selector_branch_flags() {
        assert!(SourceSelector::Both.includes_confluence());
        assert!(SourceSelector::Both.includes_gitbook());
        assert!(!SourceSelector::Gitbook.includes_confluence());
        assert!(!SourceSelector::Confluence.includes_gitbook());
    }
}
