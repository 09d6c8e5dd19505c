//! Single-shot grounded answers

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::Retriever;
use crate::types::Answer;

use super::prompt::PromptBuilder;

/// Retrieves context and asks the model once
pub struct AnswerSynthesizer {
    retriever: Arc<Retriever>,
    llm: Arc<dyn LlmProvider>,
}

impl AnswerSynthesizer {
    pub fn new(retriever: Arc<Retriever>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { retriever, llm }
    }

    /// Answer a question from the campaign notes
    ///
    /// When nothing relevant is retrieved the fixed not-found answer is
    /// returned without calling the model.
    pub async fn answer(
        &self,
        question: &str,
        top_k: usize,
        include_gm_only: bool,
    ) -> Result<Answer> {
        let start = Instant::now();

        let retrieved = self
            .retriever
            .retrieve(question, top_k, include_gm_only)
            .await?;

        if retrieved.is_empty() {
            tracing::info!("No context found for question, skipping generation");
            return Ok(Answer::not_found(start.elapsed().as_millis() as u64));
        }

        let context = PromptBuilder::build_context(&retrieved.contexts);
        let prompt = PromptBuilder::build_user_prompt(question, &context);

        tracing::info!(
            "Generating answer from {} chunks with {}",
            retrieved.contexts.len(),
            self.llm.model()
        );
        let answer = self
            .llm
            .generate(&PromptBuilder::grounding_system_prompt(), &prompt)
            .await?;

        Ok(Answer {
            answer: answer.trim().to_string(),
            chunks_retrieved: retrieved.contexts.len(),
            sources: retrieved.titles.into_iter().collect(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{Indexer, TextChunker};
    use crate::providers::{MemoryVectorStore, VectorStoreProvider};
    use crate::testing::{page, HashingEmbedder, ScriptedLlm};
    use crate::types::NOTHING_FOUND_ANSWER;

    async fn setup(docs: Vec<crate::types::Document>) -> Arc<Retriever> {
        let store: Arc<dyn VectorStoreProvider> = Arc::new(MemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let indexer = Indexer::new(
            TextChunker::default(),
            Arc::clone(&store),
            "notes",
            HashingEmbedder::DIMENSIONS,
        );
        indexer.ensure_collection(true).await.unwrap();
        for doc in &docs {
            indexer.index_document(doc, embedder.as_ref()).await.unwrap();
        }
        Arc::new(Retriever::new(store, embedder, "notes"))
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_model() {
        let retriever = setup(Vec::new()).await;
        let llm = Arc::new(ScriptedLlm::default().with_reply("should not be used"));
        let synthesizer = AnswerSynthesizer::new(retriever, llm.clone());

        let answer = synthesizer.answer("Who is Mira?", 5, false).await.unwrap();

        assert_eq!(answer.answer, NOTHING_FOUND_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_gm_only_notes_never_reach_prompt() {
        let retriever = setup(vec![
            page("p1", "Mira", "Mira is a halfling rogue from Greywood.", false),
            page("p2", "GM Notes", "Mira is secretly the lich's daughter.", true),
        ])
        .await;
        let llm = Arc::new(ScriptedLlm::default().with_reply("  Mira is a halfling rogue.  "));
        let synthesizer = AnswerSynthesizer::new(retriever, llm.clone());

        let answer = synthesizer.answer("Who is Mira?", 5, false).await.unwrap();

        assert_eq!(answer.answer, "Mira is a halfling rogue.");
        assert_eq!(answer.sources, vec!["Mira".to_string()]);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].1.contains("halfling rogue"));
        assert!(!prompts[0].1.contains("lich's daughter"));
    }

    #[tokio::test]
    async fn test_sources_sorted_and_unique() {
        let retriever = setup(vec![
            page("p2", "Zeta Keep", "Wolves guard Zeta Keep.", false),
            page("p1", "Alder Road", "Wolves hunt on Alder Road.", false),
        ])
        .await;
        let llm = Arc::new(ScriptedLlm::default().with_reply("Wolves."));
        let synthesizer = AnswerSynthesizer::new(retriever, llm);

        let answer = synthesizer.answer("wolves", 5, false).await.unwrap();
        assert_eq!(answer.sources, vec!["Alder Road".to_string(), "Zeta Keep".to_string()]);
        assert_eq!(answer.chunks_retrieved, 2);
    }
}
