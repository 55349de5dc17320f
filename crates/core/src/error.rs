use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_API_KEY is not set; add it to the environment or a .env file (GOOGLE_API_KEY=...)")]
    MissingApiKey,

    #[error("invalid provider base url {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("http client setup failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("multimodal OCR failed: {0}")]
    OcrFailed(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {snippet}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        snippet: String,
    },

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("vector store not found at {0}; run `kvkk-rag ingest` first to build it")]
    Missing(String),

    #[error("invalid collection name {0:?}")]
    InvalidName(String),

    #[error("record id {0} already exists in the collection")]
    DuplicateId(String),

    #[error("embedding dimension {actual} does not match collection dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corrupt record at line {line} of {path}: {details}")]
    Corrupt {
        path: String,
        line: usize,
        details: String,
    },
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] StoreError),

    #[error("generation failed: {0}")]
    Generation(#[source] ProviderError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
