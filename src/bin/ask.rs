//! Answers a question against the persisted index.
//!
//! ```bash
//! cargo run --bin ask -- "배포는 어떻게 하나요?"
//! ```

use std::sync::Arc;

use ragdesk::types::DeskError;
use ragdesk::{DeskConfig, DeskPipeline, RigCompletion, RigEmbedding};
use rig::client::{CompletionClient, EmbeddingsClient};
use rig::providers::openai;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), DeskError> {
    init_tracing();

    let question: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if question.trim().is_empty() {
        return Err(DeskError::Config("usage: ask <question>".into()));
    }

    let config = DeskConfig::from_env()?;
    let client: openai::Client = openai::Client::new(&config.openai_api_key)
        .map_err(|err| DeskError::Config(err.to_string()))?;

    let embedding_model =
        client.embedding_model_with_ndims(&config.embedding_model, config.embedding_dimensions);
    let embedder = Arc::new(RigEmbedding::new(
        embedding_model,
        config.embedding_model.clone(),
    ));

    let agent = client
        .agent(&config.completion_model)
        .temperature(0.0)
        .build();
    let completion = Arc::new(RigCompletion::new(agent));

    let pipeline = DeskPipeline::new(config, embedder)?;
    let store = pipeline.build_or_load_index(false).await?;
    let answerer = pipeline.answerer(store, completion);

    let answer = answerer.answer(&question).await;
    println!("{}", answer.result);
    println!();
    println!("{}", answer.sources);

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("warn").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
