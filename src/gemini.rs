//! Gemini `generateContent` client.
//!
//! Speaks the Generative Language REST API directly: one JSON request per
//! submission with the image inlined as base64, one JSON response whose
//! first candidate carries the generated text.

use crate::{
    config::Config,
    model::{Content, GenerativeModel},
};
use serde::{Deserialize, Serialize};

/// Errors raised by [`GeminiClient`].
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("request to Gemini failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the API (bad key, quota, bad image, ...).
    #[error("Gemini API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The prompt or image was blocked by safety filters.
    #[error("Gemini blocked the request: {0}")]
    Blocked(String),

    /// The API answered but produced no text.
    #[error("Gemini returned no text{}", finish_suffix(.0))]
    EmptyResponse(Option<String>),

    /// Response body was not the expected JSON.
    #[error("unexpected Gemini response: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeminiError {
    /// Builds an [`GeminiError::Api`] from a failed response body.
    fn api(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        Self::Api { status, message }
    }
}

fn finish_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (finish reason: {r})"))
        .unwrap_or_default()
}

/// Blocking client for one Gemini model.
///
/// Built once at startup from [`Config`]; meant to be owned by the
/// [`InfernumEngine`](crate::InfernumEngine) worker thread.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, GeminiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config
                .model
                .trim_start_matches("models/")
                .to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GenerativeModel for GeminiClient {
    type Error = GeminiError;

    fn model_id(&self) -> &str {
        &self.model
    }

    fn generate_content(&mut self, content: Content) -> Result<String, Self::Error> {
        let body = GenerateContentRequest::new(&content);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(GeminiError::api(status.as_u16(), &text));
        }

        serde_json::from_str::<GenerateContentResponse>(&text)?.into_text()
    }
}

// ---------- Wire Structures ----------

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<WireContent<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(content: &'a Content) -> Self {
        let image = content.image();
        let mut parts = Vec::with_capacity(2);
        if let Some(prompt) = content.prompt() {
            parts.push(Part::Text(prompt));
        }
        parts.push(Part::InlineData(InlineData {
            mime_type: image.mime_type(),
            data: image.to_base64(),
        }));

        Self {
            contents: vec![WireContent {
                role: "user",
                parts,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum Part<'a> {
    Text(&'a str),
    InlineData(InlineData),
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate.
    fn into_text(self) -> Result<String, GeminiError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => GeminiError::Blocked(reason),
                None => GeminiError::EmptyResponse(None),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(GeminiError::EmptyResponse(candidate.finish_reason));
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
