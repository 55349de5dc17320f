pub mod chunking;
pub mod cleaning;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod session;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, chunk_words, normalize_whitespace, WORDS_PER_CHUNK};
pub use cleaning::{TextCleaner, BOILERPLATE_PATTERNS};
pub use config::{ApiKey, ProviderSettings};
pub use embeddings::{embed_for_ingestion, Embedder, GeminiEmbedder, TaskType};
pub use error::{ConfigError, IngestError, ProviderError, QueryError, StoreError};
pub use extractor::{
    retained_text, Element, ElementKind, LineClassifier, LopdfPartitioner, OcrEndpointConfig,
    PartitionStrategy, PdfPartitioner,
};
pub use generation::{GeminiGenerator, Generator, ModelReply, ResolvedAnswer, NO_ANSWER_PLACEHOLDER};
pub use ingest::{collect_pdf_files, discover_pdf_files, DocumentOutcome, IngestionReport, Ingestor};
pub use models::{
    DuplicatePolicy, IngestionOptions, RecordMetadata, ScoredRecord, StoreRecord, TextChunk,
};
pub use prompt::{render_template, Prompt, SYSTEM_PROMPT_TEMPLATE};
pub use rag::{AnswerPipeline, QueryOutcome, QueryStage, RETRIEVAL_TOP_K};
pub use session::{Conversation, ConversationTurn, Role, GREETING};
pub use stores::LocalCollection;
pub use traits::VectorStore;
