//! Extraction backed by the Gemini `generateContent` REST API

use crate::config::ExtractionConfig;
use crate::extract::{ExtractionError, ExtractionOutcome, ExtractionResult, Extractor};
use crate::url::Locator;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const EXTRACTION_CONNECT_TIMEOUT_SECS: u64 = 30;

const SYSTEM_INSTRUCTION: &str = "You are an expert web scraper. Your task is to parse HTML to \
extract Multiple-Choice Questions (MCQs), their source exam, relevant images, and the next page \
URL. Adhere strictly to the JSON schema provided.";

/// Extractor that asks a Gemini model for schema-constrained JSON
#[derive(Clone)]
pub struct GeminiExtractor {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_output_tokens: u32,
    thinking_budget: u32,
}

impl GeminiExtractor {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let defaults = ExtractionConfig::default();
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            max_output_tokens: defaults.max_output_tokens,
            thinking_budget: defaults.thinking_budget,
        }
    }

    /// Builds an extractor from config, reading the key from `api-key-env`
    ///
    /// The HTTP client is built from `[extraction]` so that slow model calls
    /// are not cut off by the relay fetch timeout.
    pub fn from_config(config: &ExtractionConfig) -> ExtractionResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ExtractionError::MissingApiKey(config.api_key_env.clone()))?;

        let http = build_extraction_client(config)?;

        Ok(Self::new(http, &config.endpoint, &config.model, api_key)
            .with_max_output_tokens(config.max_output_tokens)
            .with_thinking_budget(config.thinking_budget))
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = budget;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, content: &str, base: Option<&Locator>) -> GenerateRequest {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(SYSTEM_INSTRUCTION.to_string()),
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_prompt(content, base)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
                max_output_tokens: self.max_output_tokens,
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            },
        }
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(
        &self,
        content: &str,
        base: Option<&Locator>,
    ) -> ExtractionResult<ExtractionOutcome> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        tracing::debug!(model = %self.model, bytes = content.len(), "Extraction request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(content, base))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            ExtractionError::MalformedResponse(format!("unexpected API response shape: {}", e))
        })?;

        let text = parsed.text();
        if text.is_empty() {
            return Err(ExtractionError::Empty(parsed.empty_reason()));
        }

        ExtractionOutcome::from_json(&text, base)
    }
}

/// Builds the HTTP client used for extraction calls
pub fn build_extraction_client(config: &ExtractionConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(EXTRACTION_CONNECT_TIMEOUT_SECS))
        .build()
}

/// Builds the user prompt for one page
fn build_prompt(content: &str, base: Option<&Locator>) -> String {
    let base_hint = match base {
        Some(base) => format!(
            "IMPORTANT: The base URL for this page is {}. You MUST convert any relative image URLs \
             (like '/path/image.png' or 'image.png') into absolute URLs using this base URL.",
            base
        ),
        None => String::new(),
    };

    format!(
        "From the provided HTML, extract all physics MCQs, including any relevant images and the \
         exam name for each, and the URL for the next page. {} \n\nHTML:\n{}",
        base_hint, content
    )
}

/// JSON schema the model output must satisfy
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "mcqs": {
                "type": "ARRAY",
                "description": "An array of all the multiple choice questions found on the page.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "question": {
                            "type": "STRING",
                            "description": "The full text of the question. Preserve any formatting like subscripts or superscripts if possible (e.g., using HTML tags or simple text representation like x^2)."
                        },
                        "options": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "An array of strings, with each string representing one of the multiple-choice options."
                        },
                        "correctAnswer": {
                            "type": "STRING",
                            "description": "The exact text of the correct answer from the provided options list."
                        },
                        "examName": {
                            "type": "STRING",
                            "description": "The name of the examination or context usually found below the question text (e.g., \"UPSC IAS, 2012\"). If no exam name is present for a question, return an empty string."
                        },
                        "imageUrl": {
                            "type": "STRING",
                            "description": "The absolute URL of an image relevant to the question, like a diagram or figure. Ignore logos, icons, and placeholder images. Return null if no suitable image is found."
                        }
                    },
                    "required": ["question", "options", "correctAnswer", "examName"]
                }
            },
            "nextUrl": {
                "type": "STRING",
                "description": "The absolute URL for the \"Next\" or \"Next Page\" button, if one exists on the page. If there is no next button, return null."
            }
        },
        "required": ["mcqs"]
    })
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    max_output_tokens: u32,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated, trimmed text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    /// Explains why no text came back
    fn empty_reason(&self) -> String {
        let block_reason = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        let finish_reason = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref());

        match (block_reason, finish_reason) {
            (Some(reason), _) => format!("Request was blocked by the API. Reason: {}.", reason),
            (None, Some(reason)) if reason != "STOP" => format!(
                "The model stopped generating for an unexpected reason: {}.",
                reason
            ),
            _ => "API returned an empty response.".to_string(),
        }
    }
}
