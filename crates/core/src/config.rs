use crate::error::ConfigError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_TEMPERATURE: f32 = 0.55;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_PERSIST_DIR: &str = "chroma_db_kvkk";
pub const DEFAULT_COLLECTION: &str = "kvkk_docs";

/// Provider credential. `Debug` never prints the secret.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Fails with [`ConfigError::MissingApiKey`] for absent or blank values.
    pub fn new(raw: Option<String>) -> Result<Self, ConfigError> {
        match raw.map(|value| value.trim().to_string()) {
            Some(key) if !key.is_empty() => Ok(Self(key)),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Everything the hosted embedding and chat clients need.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: ApiKey,
    pub base_url: Url,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProviderSettings {
    pub fn new(api_key: ApiKey, base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base url must use http or https: {base_url}"
            )));
        }

        Ok(Self {
            api_key,
            base_url: parsed,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_models(mut self, embedding_model: &str, chat_model: &str) -> Self {
        self.embedding_model = embedding_model.trim().to_string();
        self.chat_model = chat_model.trim().to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base}/v1beta/{path}` without doubled slashes.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1beta/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(self.api_key.expose())
            .map_err(|error| ConfigError::Invalid(format!("api key is not a valid header: {error}")))?;
        headers.insert("x-goog-api-key", key);

        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()?)
    }
}
