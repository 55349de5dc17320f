use crate::chunking::WORDS_PER_CHUNK;
use crate::extractor::PartitionStrategy;
use serde::{Deserialize, Serialize};

/// One word window of a document, before it is embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub id: String,
    pub source_path: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
}

/// The persisted unit of the vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: RecordMetadata,
}

impl StoreRecord {
    pub fn from_chunk(chunk: TextChunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id,
            embedding,
            document: chunk.text,
            metadata: RecordMetadata {
                source: chunk.source_path,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
    pub similarity: f32,
}

/// What ingestion does with a PDF whose path is already in the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Store new records next to the old ones.
    #[default]
    Append,
    /// Leave the document out of this run.
    SkipExistingSources,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub strategy: PartitionStrategy,
    pub words_per_chunk: usize,
    pub duplicates: DuplicatePolicy,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            strategy: PartitionStrategy::HiRes,
            words_per_chunk: WORDS_PER_CHUNK,
            duplicates: DuplicatePolicy::Append,
        }
    }
}
