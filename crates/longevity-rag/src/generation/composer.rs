//! Grounded answer composition: retrieve, prompt, complete

use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::providers::{ChatMessage, ChatProvider, ChatRequest};
use crate::retrieval::Retriever;
use crate::types::UserProfile;

use super::prompt::PromptBuilder;

/// A generated answer
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Completion text, verbatim
    pub text: String,
    /// Number of passages placed in the context
    pub passages_used: usize,
}

/// Answers questions from retrieved context with one chat completion
pub struct AnswerComposer {
    retriever: Arc<Retriever>,
    chat: Arc<dyn ChatProvider>,
    config: GenerationConfig,
}

impl AnswerComposer {
    pub fn new(retriever: Arc<Retriever>, chat: Arc<dyn ChatProvider>, config: GenerationConfig) -> Self {
        Self {
            retriever,
            chat,
            config,
        }
    }

    /// Answer `question`, personalised by `profile` when given
    pub async fn answer(&self, question: &str, profile: Option<&UserProfile>) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::validation("question must not be empty"));
        }
        if let Some(profile) = profile {
            profile.validate()?;
        }

        let passages = self
            .retriever
            .retrieve(question, self.retriever.default_top_k())
            .await?;
        let context = PromptBuilder::build_context(&passages);

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(PromptBuilder::system_prompt()),
                ChatMessage::user(PromptBuilder::user_prompt(&context, profile, question)),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::info!(
            "Generating answer with {} ({} passages, {} context chars)",
            self.chat.name(),
            passages.len(),
            context.chars().count()
        );

        let text = self.chat.complete(&request).await?;
        if text.trim().is_empty() {
            return Err(Error::llm("chat completion returned no content"));
        }

        Ok(Answer {
            text,
            passages_used: passages.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::providers::{
        ChatRole, Embedder, EmbeddingProvider, EmbeddingResult, IndexSpec, IndexedRecord,
        InMemoryVectorStore, VectorStoreProvider,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct UnitProvider;

    #[async_trait]
    impl EmbeddingProvider for UnitProvider {
        async fn embed(&self, texts: &[String]) -> Result<EmbeddingResult> {
            Ok(EmbeddingResult {
                vectors: texts.iter().map(|_| vec![1.0, 0.0]).collect(),
            })
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model(&self) -> &str {
            "unit"
        }

        fn max_batch_size(&self) -> usize {
            4
        }

        fn name(&self) -> &str {
            "unit"
        }
    }

    /// Records every request and replies with a fixed text
    struct RecordingChat {
        reply: String,
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ChatProvider for RecordingChat {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.requests.lock().push(request.clone());
            Ok(self.reply.clone())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    async fn composer(reply: &str, records: usize) -> (AnswerComposer, Arc<RecordingChat>) {
        let store = Arc::new(InMemoryVectorStore::new());
        store.ensure_index(&IndexSpec::cosine("test", 2)).await.unwrap();
        let records: Vec<IndexedRecord> = (1..=records)
            .map(|n| IndexedRecord {
                id: format!("id-{}", n),
                vector: vec![1.0, 0.0],
                payload: json!({"text": format!("passage {}", n), "source": "a.txt", "chunk_index": n}),
            })
            .collect();
        store.upsert(&records).await.unwrap();

        let embedder = Arc::new(Embedder::new(Arc::new(UnitProvider), 2).unwrap());
        let retriever = Arc::new(Retriever::new(embedder, store, RetrievalConfig::default()));
        let chat = Arc::new(RecordingChat {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        });
        let composer = AnswerComposer::new(retriever, chat.clone(), GenerationConfig::default());
        (composer, chat)
    }

    #[tokio::test]
    async fn test_answer_is_verbatim_and_uses_defaults() {
        let (composer, chat) = composer("  Eat 0.8g/kg/day.\n", 5).await;
        let answer = composer.answer("How much protein?", None).await.unwrap();
        assert_eq!(answer.text, "  Eat 0.8g/kg/day.\n");
        assert_eq!(answer.passages_used, 3);

        let requests = chat.requests.lock();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 1000);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert_eq!(request.messages[1].role, ChatRole::User);
        assert_eq!(request.messages[1].content.matches("---").count(), 2);
    }

    #[tokio::test]
    async fn test_profile_reaches_prompt() {
        let (composer, chat) = composer("ok", 1).await;
        let profile = UserProfile {
            age: Some(30),
            ..Default::default()
        };
        composer.answer("Breakfast ideas?", Some(&profile)).await.unwrap();
        let requests = chat.requests.lock();
        assert!(requests[0].messages[1].content.contains("User profile:\nAge: 30 years"));
    }

    #[tokio::test]
    async fn test_blank_question_rejected_without_calls() {
        let (composer, chat) = composer("ok", 1).await;
        let err = composer.answer("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(chat.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_completion_is_llm_error() {
        let (composer, _) = composer("  ", 1).await;
        let err = composer.answer("Protein?", None).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }

    #[tokio::test]
    async fn test_empty_index_is_not_found() {
        let (composer, chat) = composer("ok", 0).await;
        let err = composer.answer("Protein?", None).await.unwrap_err();
        assert!(matches!(err, Error::NoRelevantDocuments(_)));
        assert!(chat.requests.lock().is_empty());
    }
}
