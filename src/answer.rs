//! Retrieval-augmented answering over a persisted index.
//!
//! Stateless per query: embed the question, retrieve the nearest chunks,
//! render the grounded prompt, invoke the model, and rank the cited sources.
//! Every internal failure is converted at this boundary into a fixed
//! apologetic response; callers never see a raw error.

use std::sync::Arc;

use async_trait::async_trait;
use rig::agent::Agent;
use rig::completion::{CompletionModel, Prompt};

use crate::embeddings::EmbeddingProvider;
use crate::stores::{ChunkDocument, SqliteChunkStore};
use crate::types::DeskError;

/// Chunks retrieved per question.
pub const RETRIEVAL_TOP_K: usize = 4;
/// Distinct sources cited per answer.
pub const SOURCE_TOP_K: usize = 2;

const PROMPT_TEMPLATE: &str = "\
주어진 텍스트 조각을 기반으로 질문에 답변해 주세요:
-----
{context}
-----

위 내용을 바탕으로 다음 질문에 친절하고 정확하게 답변해 주세요:
질문: {question}

맥락에 해당하는 정보가 없다면 \"모르겠습니다\"라고 답변하세요.
";

const FALLBACK_RESULT: &str = "죄송합니다. 질문 처리 중 오류가 발생했습니다.";
const FALLBACK_SOURCES: &str = "오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";
const NO_SOURCES: &str = "미안하지만, 질문에 답할 자료를 찾지 못했어요.";

/// A generated answer plus the formatted source citation message.
#[derive(Clone, Debug)]
pub struct Answer {
    pub result: String,
    pub sources: String,
}

/// Language-model seam: rendered prompt in, generated text out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, DeskError>;
}

/// Adapter exposing a rig [`Agent`] through the completion seam.
pub struct RigCompletion<M>
where
    M: CompletionModel,
{
    agent: Agent<M>,
}

impl<M> RigCompletion<M>
where
    M: CompletionModel,
{
    pub fn new(agent: Agent<M>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl<M> CompletionProvider for RigCompletion<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(&self, prompt: &str) -> Result<String, DeskError> {
        self.agent
            .prompt(prompt.to_string())
            .await
            .map_err(|err| DeskError::Answer(err.to_string()))
    }
}

/// Answers questions against a persisted index.
pub struct RetrievalAnswerer {
    store: SqliteChunkStore,
    embedder: Arc<dyn EmbeddingProvider>,
    completion: Arc<dyn CompletionProvider>,
    top_k: usize,
    source_k: usize,
}

impl RetrievalAnswerer {
    pub fn new(
        store: SqliteChunkStore,
        embedder: Arc<dyn EmbeddingProvider>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            store,
            embedder,
            completion,
            top_k: RETRIEVAL_TOP_K,
            source_k: SOURCE_TOP_K,
        }
    }

    /// Answers one question. Never fails: any internal error is logged and
    /// mapped to the fixed apologetic response.
    pub async fn answer(&self, question: &str) -> Answer {
        match self.try_answer(question).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(%err, "answering failed");
                Answer {
                    result: FALLBACK_RESULT.to_string(),
                    sources: FALLBACK_SOURCES.to_string(),
                }
            }
        }
    }

    async fn try_answer(&self, question: &str) -> Result<Answer, DeskError> {
        tracing::info!(question = %preview(question), "answering question");

        let query_embedding = self.embedder.embed_one(question).await?;
        let hits = self
            .store
            .search_similar(&query_embedding, self.top_k)
            .await?;
        tracing::debug!(retrieved = hits.len(), "chunks retrieved");

        let context = hits
            .iter()
            .map(|(document, _)| document.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render_prompt(&context, question);

        let result = self.completion.complete(&prompt).await?;

        let documents: Vec<&ChunkDocument> = hits.iter().map(|(document, _)| document).collect();
        let sources = list_top_k_sources(&documents, self.source_k);

        Ok(Answer { result, sources })
    }
}

/// Renders the grounded prompt with the retrieved context and the question.
pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Formats the `k` most frequent distinct (title, source) pairs.
///
/// Counting is stable: among equal counts, first-seen order wins.
pub fn list_top_k_sources(documents: &[&ChunkDocument], k: usize) -> String {
    let mut counts: Vec<((&str, &str), usize)> = Vec::new();
    for document in documents {
        let pair = (document.title.as_str(), document.source.as_str());
        match counts.iter_mut().find(|(seen, _)| *seen == pair) {
            Some((_, count)) => *count += 1,
            None => counts.push((pair, 1)),
        }
    }
    // Stable sort keeps first-seen order among ties.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let links: Vec<String> = counts
        .into_iter()
        .take(k)
        .map(|((title, source), _)| format!("[{title}]({source})"))
        .collect();

    match links.len() {
        0 => NO_SOURCES.to_string(),
        1 => format!(
            "여기에 도움이 될 수 있는 자료가 있어요:  \n- {}",
            links[0]
        ),
        n => format!(
            "여기에 도움이 될 수 있는 자료 {n}개가 있어요:  \n- {}",
            links.join("  \n- ")
        ),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(title: &str, source: &str) -> ChunkDocument {
        ChunkDocument {
            id: format!("{title}-{source}"),
            source: source.to_string(),
            title: title.to_string(),
            heading: String::new(),
            chunk_index: 0,
            content: "content".to_string(),
            metadata: serde_json::Value::Object(Default::default()),
        }
    }

    #[test]
    fn prompt_carries_context_question_and_dont_know_instruction() {
        let prompt = render_prompt("조각 하나", "설치는 어떻게 하나요?");
        assert!(prompt.contains("조각 하나"));
        assert!(prompt.contains("질문: 설치는 어떻게 하나요?"));
        assert!(prompt.contains("모르겠습니다"));
        assert!(!prompt.contains("{context}"));
        assert!(!prompt.contains("{question}"));
    }

    #[test]
    fn no_sources_message() {
        assert_eq!(list_top_k_sources(&[], 2), NO_SOURCES);
    }

    #[test]
    fn single_source_uses_singular_phrasing() {
        let a = document("Guide", "https://docs.example.com/guide");
        let message = list_top_k_sources(&[&a], 2);
        assert!(message.contains("자료가 있어요"));
        assert!(message.contains("[Guide](https://docs.example.com/guide)"));
        assert!(!message.contains("개가 있어요"));
    }

    #[test]
    fn tie_breaking_is_first_seen_and_plural_counts() {
        let a = document("Alpha", "https://docs.example.com/a");
        let b = document("Beta", "https://docs.example.com/b");
        let message = list_top_k_sources(&[&a, &a, &b], 2);
        assert!(message.contains("자료 2개가 있어요"));
        let alpha_at = message.find("[Alpha]").unwrap();
        let beta_at = message.find("[Beta]").unwrap();
        assert!(alpha_at < beta_at, "most frequent source listed first");
    }

    #[test]
    fn more_than_k_sources_are_truncated() {
        let a = document("Alpha", "https://docs.example.com/a");
        let b = document("Beta", "https://docs.example.com/b");
        let c = document("Gamma", "https://docs.example.com/c");
        let message = list_top_k_sources(&[&b, &b, &a, &c, &c, &c], 2);
        assert!(message.contains("[Gamma]"));
        assert!(message.contains("[Beta]"));
        assert!(!message.contains("[Alpha]"));
    }

    #[test]
    fn duplicate_chunks_from_one_page_count_as_one_source() {
        let a1 = document("Guide", "https://docs.example.com/guide");
        let a2 = document("Guide", "https://docs.example.com/guide");
        let message = list_top_k_sources(&[&a1, &a2], 2);
        assert!(message.contains("자료가 있어요"));
    }
}
