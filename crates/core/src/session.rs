use crate::embeddings::Embedder;
use crate::generation::Generator;
use crate::rag::{AnswerPipeline, QueryOutcome};
use crate::traits::VectorStore;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const GREETING: &str = "Merhaba 👋 KVKK hakkındaki sorularınızı bana sorabilirsiniz.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

/// In-memory chat history for one interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Starts a conversation with the assistant greeting.
    pub fn new() -> Self {
        Self {
            turns: vec![ConversationTurn {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }],
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
        });
    }

    /// Records the question, answers it and records the reply.
    ///
    /// The user turn is stored before the pipeline runs, so it survives a
    /// failed query. Blank input is ignored and returns `None`.
    pub async fn ask<E, S, G>(
        &mut self,
        pipeline: &AnswerPipeline<E, S, G>,
        input: &str,
    ) -> Option<QueryOutcome>
    where
        E: Embedder,
        S: VectorStore,
        G: Generator,
    {
        if input.trim().is_empty() {
            return None;
        }

        self.push(Role::User, input);
        let outcome = pipeline.answer(input).await;
        self.push(Role::Assistant, outcome.response_text());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{HashingEmbedder, TaskType};
    use crate::generation::ModelReply;
    use crate::prompt::Prompt;
    use crate::rag::ERROR_PREFIX;
    use crate::{ProviderError, ScoredRecord, StoreError, StoreRecord};
    use async_trait::async_trait;

    struct EmptyStore;

    #[async_trait]
    impl VectorStore for EmptyStore {
        async fn add(&self, _record: StoreRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn query(&self, _e: &[f32], _k: usize) -> Result<Vec<ScoredRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn len(&self) -> usize {
            0
        }

        async fn contains_source(&self, _source: &str) -> bool {
            false
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, prompt: &Prompt) -> Result<ModelReply, ProviderError> {
            Ok(ModelReply {
                answer: Some(format!("yanıt: {}", prompt.input)),
                output_text: None,
            })
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        fn model(&self) -> &str {
            "down"
        }

        async fn embed(&self, _text: &str, _task: TaskType) -> Result<Vec<f32>, ProviderError> {
            Err(ProviderError::Decode("bağlantı yok".to_string()))
        }
    }

    #[test]
    fn new_conversation_starts_with_greeting() {
        let conversation = Conversation::new();
        assert_eq!(
            conversation.turns(),
            &[ConversationTurn {
                role: Role::Assistant,
                content: GREETING.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn ask_appends_user_and_assistant_turns() {
        let pipeline = AnswerPipeline::new(HashingEmbedder::default(), EmptyStore, EchoGenerator);
        let mut conversation = Conversation::new();

        let outcome = conversation.ask(&pipeline, "Rıza nedir?").await;

        assert!(outcome.is_some_and(|o| o.is_done()));
        let turns = conversation.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "Rıza nedir?");
        assert_eq!(turns[2].role, Role::Assistant);
        assert_eq!(turns[2].content, "yanıt: Rıza nedir?");
    }

    #[tokio::test]
    async fn failed_query_keeps_user_turn_and_records_error() {
        let pipeline = AnswerPipeline::new(DownEmbedder, EmptyStore, EchoGenerator);
        let mut conversation = Conversation::new();

        conversation.ask(&pipeline, "Soru").await;
        conversation.ask(&pipeline, "İkinci soru").await;

        let turns = conversation.turns();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[1].content, "Soru");
        assert!(turns[2].content.starts_with(ERROR_PREFIX));
        assert!(turns[2].content.contains("bağlantı yok"));
        assert_eq!(turns[3].content, "İkinci soru");
    }

    #[tokio::test]
    async fn blank_input_is_ignored() {
        let pipeline = AnswerPipeline::new(HashingEmbedder::default(), EmptyStore, EchoGenerator);
        let mut conversation = Conversation::new();

        assert!(conversation.ask(&pipeline, "  \n").await.is_none());
        assert_eq!(conversation.turns().len(), 1);
    }
}
