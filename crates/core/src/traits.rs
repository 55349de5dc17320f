use crate::{ScoredRecord, StoreError, StoreRecord};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(&self, record: StoreRecord) -> Result<(), StoreError>;

    /// Returns at most `k` records, most similar first.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredRecord>, StoreError>;

    async fn len(&self) -> usize;

    async fn contains_source(&self, source: &str) -> bool;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
