use crate::error::IngestError;
use crate::models::TextChunk;
use uuid::Uuid;

pub const WORDS_PER_CHUNK: usize = 500;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits text into consecutive, non-overlapping windows of `window` words.
///
/// The last window may be shorter. Text without words yields no windows.
pub fn chunk_words(text: &str, window: usize) -> Result<Vec<String>, IngestError> {
    if window == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "words per chunk must be at least 1".to_string(),
        ));
    }

    let words = text.split_whitespace().collect::<Vec<_>>();
    Ok(words.chunks(window).map(|words| words.join(" ")).collect())
}

/// Chunks one document's cleaned text, giving every chunk a fresh id.
pub fn build_chunks(
    source_path: &str,
    cleaned: &str,
    window: usize,
) -> Result<Vec<TextChunk>, IngestError> {
    Ok(chunk_words(cleaned, window)?
        .into_iter()
        .map(|text| TextChunk {
            id: Uuid::new_v4().to_string(),
            source_path: source_path.to_string(),
            text,
        })
        .collect())
}
