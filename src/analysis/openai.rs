//! OpenAI-compatible vision client.
//!
//! Requests go to `{api_base}/chat/completions` with temperature 0 and the
//! `json_object` response format so the service returns low-variance
//! structured output; the results feed automated decisions downstream.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::analysis::{extract_json_object, DesignComparison, UxAudit, VisionClient};
use crate::config::VisionConfig;
use crate::errors::{PipelineError, PipelineResult};

const AUDIT_SYSTEM_PROMPT: &str =
    "You are a UX auditor. Analyze screenshots and return JSON insights. Keep responses structured.";

const AUDIT_USER_PROMPT: &str = "Analyze the UX of this uploaded screenshot. Output JSON with \
UX_score, hierarchy, readability, spacing, and color. Highlight strengths and issues of each.";

const COMPARE_SYSTEM_PROMPT: &str = r#"You are a senior UX reviewer. Compare the Production Image (Image A) vs Design Image (Image B).

Return structured JSON:

{
"overall_change": "...",
"improvements": ["...", "..."],
"regressions": ["...", "..."],
"spacing_changes": [...],
"color_changes": [...],
"typography_changes": [...],
"layout_changes": [...],
"missing_elements": [...],
"recommendations": [...]
}"#;

#[derive(Debug, Clone)]
pub struct VisionServiceConfig {
    pub api_base: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl From<&VisionConfig> for VisionServiceConfig {
    fn from(config: &VisionConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

pub struct OpenAiVisionClient {
    client: Client,
    config: VisionServiceConfig,
}

impl OpenAiVisionClient {
    pub fn new(config: VisionServiceConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PipelineError::analysis(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    /// The credential is resolved on first use so a missing key surfaces as a
    /// request failure, not a startup failure.
    fn api_key(&self) -> PipelineResult<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()))
            .ok_or_else(|| PipelineError::analysis("vision service API key is not configured"))
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_parts: Vec<ContentPart>,
    ) -> PipelineResult<T> {
        let key = self.api_key()?;
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: 0.0,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: MessageContent::Text(system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: MessageContent::Parts(user_parts),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::analysis(format!("vision request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(PipelineError::analysis(format!(
                "vision service returned {status}: {text}"
            )));
        }

        let response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::analysis(format!("vision response invalid: {err}")))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| PipelineError::analysis("vision response missing content"))?;

        parse_structured(content)
    }
}

/// Normalize the service's textual payload into `T`, preserving the parse
/// failure cause.
fn parse_structured<T: DeserializeOwned>(content: &str) -> PipelineResult<T> {
    let json = extract_json_object(content)
        .ok_or_else(|| PipelineError::analysis("vision response contained no JSON object"))?;
    serde_json::from_str(&json)
        .map_err(|err| PipelineError::analysis(format!("failed to parse vision JSON: {err}")))
}

fn image_part(b64: &str) -> ContentPart {
    ContentPart::ImageUrl {
        image_url: ImageUrl {
            url: format!("data:image/png;base64,{b64}"),
        },
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn audit(&self, png: &[u8]) -> PipelineResult<UxAudit> {
        let b64 = Base64.encode(png);
        self.invoke(
            AUDIT_SYSTEM_PROMPT,
            vec![
                ContentPart::Text {
                    text: AUDIT_USER_PROMPT.to_string(),
                },
                image_part(&b64),
            ],
        )
        .await
    }

    async fn compare(&self, prod_b64: &str, design_b64: &str) -> PipelineResult<DesignComparison> {
        self.invoke(
            COMPARE_SYSTEM_PROMPT,
            vec![
                ContentPart::Text {
                    text: "Image A = Production Image".to_string(),
                },
                image_part(prod_b64),
                ContentPart::Text {
                    text: "Image B = Design Image".to_string(),
                },
                image_part(design_b64),
            ],
        )
        .await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
