//! Gemini `generateContent` client
//!
//! Sends one prompt per file and asks for a JSON document matching
//! [`response_schema`], which deserializes straight into a
//! [`TransformResult`].

use async_trait::async_trait;
use morph_common::types::{MigrationConfig, TransformResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{validate_source, TransformationClient};
use crate::error::TransformError;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_THINKING_BUDGET: u32 = 4096;
pub const DEFAULT_TRANSFORM_TIMEOUT: Duration = Duration::from_secs(300);

/// [`TransformationClient`] backed by the Gemini REST API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    thinking_budget: u32,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, TransformError> {
        Self::with_timeout(api_key, DEFAULT_TRANSFORM_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, TransformError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("codemorph/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point at a different endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = budget;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: String) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            },
        }
    }
}

#[async_trait]
impl TransformationClient for GeminiClient {
    #[instrument(skip(self, source_code, config), fields(model = %self.model))]
    async fn transform(
        &self,
        source_code: &str,
        config: &MigrationConfig,
        file_name: &str,
    ) -> Result<TransformResult, TransformError> {
        validate_source(source_code)?;

        let body = self.request_body(build_prompt(source_code, config, file_name));
        debug!(bytes = source_code.len(), "Sending transformation request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, text));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| TransformError::MalformedResponse(e.to_string()))?;

        let text = payload.into_text()?;
        parse_transform_result(&text)
    }
}

fn map_status_error(status: StatusCode, text: String) -> TransformError {
    match status.as_u16() {
        429 => TransformError::RateLimited(text),
        401 | 403 => TransformError::Authentication(text),
        code => {
            error!(status = %status, "Gemini API error: {}", text);
            TransformError::Service {
                status: code,
                message: text,
            }
        },
    }
}

/// Prompt sent for one file
pub fn build_prompt(source_code: &str, config: &MigrationConfig, file_name: &str) -> String {
    format!(
        "Role: Senior Software Architect specializing in Legacy Migration.\n\
         Task: Modernize the provided legacy code file ({file_name}).\n\
         \n\
         Source Tech Stack: {source}\n\
         Target Tech Stack: {target}\n\
         \n\
         Requirements:\n\
         1. Maintain functional parity while upgrading syntax and libraries.\n\
         2. Adhere strictly to the \"Target Tech Stack\" best practices.\n\
         3. Replace deprecated security patterns (e.g., WebSecurityConfigurerAdapter -> SecurityFilterChain).\n\
         4. Generate robust unit tests compatible with the target stack.\n\
         5. Return ONLY valid code for the language derived from the file name.\n\
         \n\
         Legacy Code:\n\
         {source_code}\n",
        source = config.source_stack(),
        target = config.target_stack(),
    )
}

/// JSON schema the model must answer with
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "modernCode": {
                "type": "STRING",
                "description": "The fully rewritten modern code implementing the requested stack."
            },
            "unitTests": {
                "type": "STRING",
                "description": "Comprehensive unit tests for the modern code (e.g., JUnit 5, PyTest)."
            },
            "documentation": {
                "type": "STRING",
                "description": "Markdown documentation explaining the changes and architectural decisions."
            },
            "securityReport": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "severity": { "type": "STRING", "enum": ["HIGH", "MEDIUM", "LOW"] },
                        "description": { "type": "STRING" },
                        "remediation": { "type": "STRING" }
                    },
                    "required": ["severity", "description", "remediation"]
                }
            }
        },
        "required": ["modernCode", "unitTests", "documentation", "securityReport"]
    })
}

/// Parse the model's JSON answer, tolerating a surrounding code fence
pub fn parse_transform_result(text: &str) -> Result<TransformResult, TransformError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim()).map_err(|e| TransformError::MalformedResponse(e.to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate, thoughts excluded
    fn into_text(self) -> Result<String, TransformError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => TransformError::Blocked(reason),
                None => TransformError::EmptyResponse,
            });
        };

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| part.text)
            .collect();

        if text.trim().is_empty() {
            return Err(TransformError::EmptyResponse);
        }
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
