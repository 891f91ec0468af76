//! Gemini completion client.
//!
//! Prompts go to `generateContent`, walking a fallback list of models until
//! one answers. Replies are free text; callers pull the first JSON object out
//! of them with [`extract_json_object`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::http::check_status;

const SERVICE: &str = "gemini";

/// Text completion from an LLM.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> ServiceResult<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Tried in order until one succeeds.
    pub models: Vec<String>,
}

impl GeminiConfig {
    pub fn from_env() -> ServiceResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| ServiceError::config("GEMINI_API_KEY not set"))?;
        let models = std::env::var("GEMINI_MODELS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(default_models);

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            models,
        })
    }
}

fn default_models() -> Vec<String> {
    ["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn from_env() -> ServiceResult<Self> {
        Ok(Self::new(GeminiConfig::from_env()?))
    }

    async fn call_gemini_api(&self, model: &str, prompt: &str) -> ServiceResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            model,
            self.config.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::malformed(SERVICE, e.to_string()))?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ServiceError::malformed(SERVICE, "no content in response"))
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> ServiceResult<String> {
        let mut last_error = None;

        for model in &self.config.models {
            info!("Attempting Gemini API with model: {}", model);
            match self.call_gemini_api(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ServiceError::config("no Gemini models configured")))
    }
}

/// The first balanced `{...}` span in `text`, ignoring braces inside strings.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode the first JSON object in an LLM reply.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> ServiceResult<T> {
    let json = extract_json_object(reply).ok_or_else(|| ServiceError::malformed(SERVICE, "no JSON object in reply"))?;
    serde_json::from_str(json).map_err(|e| ServiceError::malformed(SERVICE, e.to_string()))
}
