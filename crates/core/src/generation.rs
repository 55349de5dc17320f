use crate::config::ProviderSettings;
use crate::embeddings::{ensure_success, qualified_model, Content, Part};
use crate::error::{ConfigError, ProviderError};
use crate::prompt::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

pub const NO_ANSWER_PLACEHOLDER: &str = "Cevap üretilemedi.";

/// Raw reply from a chat model. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub answer: Option<String>,
    pub output_text: Option<String>,
}

/// Which field of a [`ModelReply`] the final text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAnswer {
    Answer(String),
    OutputText(String),
    Missing,
}

impl ResolvedAnswer {
    pub fn into_text(self) -> String {
        match self {
            Self::Answer(text) | Self::OutputText(text) => text,
            Self::Missing => NO_ANSWER_PLACEHOLDER.to_string(),
        }
    }
}

impl ModelReply {
    /// `answer`, then `output_text`, then nothing. Blank strings count as absent.
    pub fn resolve(self) -> ResolvedAnswer {
        let non_blank = |value: Option<String>| value.filter(|text| !text.trim().is_empty());

        if let Some(answer) = non_blank(self.answer) {
            ResolvedAnswer::Answer(answer)
        } else if let Some(output) = non_blank(self.output_text) {
            ResolvedAnswer::OutputText(output)
        } else {
            ResolvedAnswer::Missing
        }
    }

    pub fn into_answer(self) -> String {
        self.resolve().into_text()
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<ModelReply, ProviderError>;
}

/// Client for the Generative Language `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: reqwest::Client,
    model: String,
    url: String,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: [UserContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct UserContent<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiGenerator {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let model = qualified_model(&settings.chat_model);
        let url = settings.endpoint(&format!("{model}:generateContent"));
        Ok(Self {
            client: settings.http_client()?,
            model,
            url,
            temperature: settings.temperature,
        })
    }

    fn request<'a>(&self, prompt: &'a Prompt) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: Content {
                parts: [Part {
                    text: &prompt.system,
                }],
            },
            contents: [UserContent {
                role: "user",
                parts: [Part {
                    text: &prompt.input,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<ModelReply, ProviderError> {
        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(&self.request(prompt))
            .send()
            .await?;
        let response = ensure_success(response, &self.url).await?;
        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::Decode(format!("generateContent body: {error}")))?;

        debug!(
            model = %self.model,
            candidates = parsed.candidates.len(),
            latency_ms = started.elapsed().as_millis(),
            "generated reply"
        );
        Ok(reply_from_response(parsed))
    }
}

/// The first candidate becomes `answer`; text from any other candidates is
/// kept as `output_text`.
fn reply_from_response(response: GenerateContentResponse) -> ModelReply {
    let mut texts = response.candidates.into_iter().map(|candidate| {
        candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
    });

    let answer = texts.next().flatten();
    let rest = texts.flatten().collect::<Vec<_>>();

    ModelReply {
        answer,
        output_text: if rest.is_empty() {
            None
        } else {
            Some(rest.join("\n"))
        },
    }
}
