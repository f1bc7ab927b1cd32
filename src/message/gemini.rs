//! Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::generator::TextGenerator;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// HTTP client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(GenerationError::Network)?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, "Calling generateContent");
        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(GenerationError::Network)?;

        let status = response.status();
        let text = response.text().await.map_err(GenerationError::Network)?;

        if !status.is_success() {
            return Err(classify_error(status, &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let message: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(message)
    }
}

/// Map a non-success response to a [`GenerationError`].
fn classify_error(status: StatusCode, body: &str) -> GenerationError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Unauthorized {
            status: status.as_u16(),
        },
        // Gemini reports a bad key as 400 INVALID_ARGUMENT
        StatusCode::BAD_REQUEST if message.contains("API key not valid") => {
            GenerationError::Unauthorized {
                status: status.as_u16(),
            }
        }
        StatusCode::TOO_MANY_REQUESTS => GenerationError::QuotaExceeded { message },
        _ if api_status == "RESOURCE_EXHAUSTED" => GenerationError::QuotaExceeded { message },
        _ => GenerationError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
