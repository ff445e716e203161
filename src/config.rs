//! Environment-backed configuration for the pipeline.
//!
//! All settings are read once at startup and passed into components
//! explicitly; nothing reads the environment after construction.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::ingestion::sources::SourceSelector;
use crate::types::DeskError;

/// Connection settings for a Confluence space.
#[derive(Clone, Debug)]
pub struct ConfluenceConfig {
    pub base_url: Url,
    pub username: String,
    pub api_key: String,
    pub space_key: String,
}

/// Everything the pipeline needs, resolved from the process environment.
#[derive(Clone, Debug)]
pub struct DeskConfig {
    /// Wiki source settings; absent when only GitBook is configured.
    pub confluence: Option<ConfluenceConfig>,
    /// Sitemap feed enumerating the GitBook site's pages.
    pub gitbook_sitemap: Url,
    /// Which document sources to ingest.
    pub document_source: SourceSelector,
    /// SQLite file holding the vector index.
    pub index_path: PathBuf,
    /// Optional JSONL file the split chunks are dumped to before embedding.
    pub chunk_dump_path: Option<PathBuf>,
    /// API key for the OpenAI-backed embedding and completion providers.
    pub openai_api_key: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub completion_model: String,
}

const DEFAULT_SITEMAP: &str = "https://docs.fe-ta.com/sitemap-pages.xml";
const DEFAULT_INDEX_PATH: &str = "./db/ragdesk.sqlite";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1024;
const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

impl DeskConfig {
    /// Loads configuration from `.env` and the process environment.
    ///
    /// Confluence settings are required only when the selected document source
    /// includes the wiki branch.
    pub fn from_env() -> Result<Self, DeskError> {
        let _ = dotenvy::dotenv();

        let document_source = match env::var("DOCUMENT_SOURCE") {
            Ok(raw) => raw.parse()?,
            Err(_) => SourceSelector::Both,
        };

        let confluence = Self::confluence_from_env()?;
        if confluence.is_none() && document_source.includes_confluence() {
            return Err(DeskError::Config(
                "DOCUMENT_SOURCE includes confluence but CONFLUENCE_* variables are not set"
                    .into(),
            ));
        }

        let gitbook_sitemap = env::var("GITBOOK_SITEMAP")
            .unwrap_or_else(|_| DEFAULT_SITEMAP.to_string());
        let gitbook_sitemap = Url::parse(&gitbook_sitemap)
            .map_err(|err| DeskError::Config(format!("GITBOOK_SITEMAP: {err}")))?;

        let index_path = env::var("RAGDESK_INDEX")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_INDEX_PATH));

        let chunk_dump_path = env::var("RAGDESK_CHUNK_DUMP").ok().map(PathBuf::from);

        let openai_api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| DeskError::Config("OPENAI_API_KEY is not set".into()))?;

        let embedding_model = env::var("RAGDESK_EMBEDDING_MODEL")
            .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
        let embedding_dimensions = match env::var("RAGDESK_EMBEDDING_DIMENSIONS") {
            Ok(raw) => raw
                .parse::<usize>()
                .map_err(|err| DeskError::Config(format!("RAGDESK_EMBEDDING_DIMENSIONS: {err}")))?,
            Err(_) => DEFAULT_EMBEDDING_DIMENSIONS,
        };
        let completion_model = env::var("RAGDESK_COMPLETION_MODEL")
            .unwrap_or_else(|_| DEFAULT_COMPLETION_MODEL.to_string());

        Ok(Self {
            confluence,
            gitbook_sitemap,
            document_source,
            index_path,
            chunk_dump_path,
            openai_api_key,
            embedding_model,
            embedding_dimensions,
            completion_model,
        })
    }

    fn confluence_from_env() -> Result<Option<ConfluenceConfig>, DeskError> {
        let Ok(base_url) = env::var("CONFLUENCE_BASE_URL") else {
            return Ok(None);
        };
        let base_url = Url::parse(&base_url)
            .map_err(|err| DeskError::Config(format!("CONFLUENCE_BASE_URL: {err}")))?;
        let username = env::var("CONFLUENCE_USERNAME")
            .map_err(|_| DeskError::Config("CONFLUENCE_USERNAME is not set".into()))?;
        let api_key = env::var("CONFLUENCE_API_KEY")
            .map_err(|_| DeskError::Config("CONFLUENCE_API_KEY is not set".into()))?;
        let space_key = env::var("CONFLUENCE_SPACE_KEY")
            .map_err(|_| DeskError::Config("CONFLUENCE_SPACE_KEY is not set".into()))?;
        Ok(Some(ConfluenceConfig {
            base_url,
            username,
            api_key,
            space_key,
        }))
    }
}
