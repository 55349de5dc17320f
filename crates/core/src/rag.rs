use crate::embeddings::{Embedder, TaskType};
use crate::generation::Generator;
use crate::prompt::Prompt;
use crate::traits::VectorStore;
use crate::{QueryError, ScoredRecord};
use tracing::{debug, info, warn};

pub const RETRIEVAL_TOP_K: usize = 8;

pub const ERROR_PREFIX: &str = "⚠️ Hata oluştu: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Embedding,
    Retrieving,
    Prompting,
    Generating,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Done {
        answer: String,
        prompt: Prompt,
        sources: Vec<ScoredRecord>,
    },
    Failed {
        /// Stage that was running when the query failed.
        stage: QueryStage,
        message: String,
    },
}

impl QueryOutcome {
    pub fn stage(&self) -> QueryStage {
        match self {
            Self::Done { .. } => QueryStage::Done,
            Self::Failed { .. } => QueryStage::Failed,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Text shown to the user for this turn.
    pub fn response_text(&self) -> String {
        match self {
            Self::Done { answer, .. } => answer.clone(),
            Self::Failed { message, .. } => format!("{ERROR_PREFIX}{message}"),
        }
    }

    fn failed(stage: QueryStage, error: QueryError) -> Self {
        warn!(?stage, %error, "query failed");
        Self::Failed {
            stage,
            message: error.to_string(),
        }
    }
}

/// Retrieval chain built once per process and shared by reference.
pub struct AnswerPipeline<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
{
    embedder: E,
    store: S,
    generator: G,
    top_k: usize,
}

impl<E, S, G> AnswerPipeline<E, S, G>
where
    E: Embedder,
    S: VectorStore,
    G: Generator,
{
    pub fn new(embedder: E, store: S, generator: G) -> Self {
        Self {
            embedder,
            store,
            generator,
            top_k: RETRIEVAL_TOP_K,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embeds the question and returns the nearest stored chunks.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredRecord>, QueryError> {
        let query_vector = self.embed_question(question).await?;
        Ok(self.store.query(&query_vector, self.top_k).await?)
    }

    /// Runs one question through embedding, retrieval, prompting and
    /// generation. Never panics or returns early with an error: failures
    /// come back as [`QueryOutcome::Failed`].
    pub async fn answer(&self, question: &str) -> QueryOutcome {
        debug!(stage = ?QueryStage::Embedding, "query started");
        let query_vector = match self.embed_question(question).await {
            Ok(vector) => vector,
            Err(error) => return QueryOutcome::failed(QueryStage::Embedding, error),
        };

        debug!(stage = ?QueryStage::Retrieving, top_k = self.top_k);
        let sources = match self.store.query(&query_vector, self.top_k).await {
            Ok(hits) => hits,
            Err(error) => {
                warn!(%error, "retrieval failed, answering without context");
                Vec::new()
            }
        };

        debug!(stage = ?QueryStage::Prompting, context_chunks = sources.len());
        let prompt = Prompt::assemble(sources.iter().map(|hit| hit.document.as_str()), question);

        debug!(stage = ?QueryStage::Generating);
        let reply = match self.generator.generate(&prompt).await {
            Ok(reply) => reply,
            Err(error) => {
                return QueryOutcome::failed(QueryStage::Generating, QueryError::Generation(error))
            }
        };

        info!(context_chunks = sources.len(), "query answered");
        QueryOutcome::Done {
            answer: reply.into_answer(),
            prompt,
            sources,
        }
    }

    async fn embed_question(&self, question: &str) -> Result<Vec<f32>, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        self.embedder
            .embed(question, TaskType::RetrievalQuery)
            .await
            .map_err(QueryError::Embedding)
    }
}
