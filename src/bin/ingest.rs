//! Rebuilds the vector index from the configured documentation sources.
//!
//! ```bash
//! cargo run --bin ingest             # destructive rebuild
//! cargo run --bin ingest -- --mock   # offline rebuild with the mock embedder
//! ```

use std::sync::Arc;
use std::time::Instant;

use ragdesk::types::DeskError;
use ragdesk::{DeskConfig, DeskPipeline, EmbeddingProvider, MockEmbeddingProvider, RigEmbedding};
use rig::client::EmbeddingsClient;
use rig::providers::openai;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), DeskError> {
    init_tracing();

    let config = DeskConfig::from_env()?;
    let use_mock = std::env::args().any(|arg| arg == "--mock");

    let embedder: Arc<dyn EmbeddingProvider> = if use_mock {
        Arc::new(MockEmbeddingProvider::default())
    } else {
        let client: openai::Client = openai::Client::new(&config.openai_api_key)
            .map_err(|err| DeskError::Config(err.to_string()))?;
        let model =
            client.embedding_model_with_ndims(&config.embedding_model, config.embedding_dimensions);
        Arc::new(RigEmbedding::new(model, config.embedding_model.clone()))
    };

    println!(
        "Rebuilding index at {} from '{:?}' sources (embedder: {})",
        config.index_path.display(),
        config.document_source,
        embedder.id()
    );

    let start = Instant::now();
    let pipeline = DeskPipeline::new(config, embedder)?;
    let store = pipeline.build_or_load_index(true).await?;
    let count = store.count().await?;

    println!("\n✅ Ingestion complete!");
    println!("  chunks indexed : {count}");
    println!("  duration       : {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
