//! Student-name extraction from a photographed class list.
//!
//! [`HttpNameExtractor`] sends the image to an OpenAI-compatible
//! chat-completions endpoint and parses the reply with
//! [`parse_student_names`]. Models answer either with the requested JSON
//! array (often inside a markdown fence) or with a plain list, so both are
//! accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;

use crate::config::AiSettings;

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

const SYSTEM_PROMPT: &str = "You read photographed or scanned class lists. \
Extract every student's full name exactly as written, in reading order. \
Respond with a JSON array of strings and nothing else.";

const USER_PROMPT: &str = "Extract the student names from this image.";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Image data required")]
    MissingImage,

    #[error("Name extraction not configured: {0}")]
    Configuration(String),

    #[error("AI service request failed: {0}")]
    Transport(String),

    #[error("AI service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected AI service response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        ExtractionError::Transport(err.to_string())
    }
}

/// Base64 image payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub data_base64: String,
    pub mime_type: String,
}

impl ImageInput {
    /// Build from request fields; a blank MIME type becomes
    /// [`DEFAULT_MIME_TYPE`].
    pub fn new(
        data_base64: Option<String>,
        mime_type: Option<String>,
    ) -> Result<Self, ExtractionError> {
        let data_base64 = data_base64
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or(ExtractionError::MissingImage)?;
        let mime_type = mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
        Ok(Self {
            data_base64,
            mime_type,
        })
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

#[async_trait]
pub trait NameExtractor: Send + Sync {
    async fn extract_names(&self, image: &ImageInput) -> Result<Vec<String>, ExtractionError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for the configured AI service.
#[derive(Clone, Debug)]
pub struct HttpNameExtractor {
    client: Client,
    settings: AiSettings,
}

impl HttpNameExtractor {
    pub fn new(settings: AiSettings) -> Result<Self, ExtractionError> {
        if settings.api_url.trim().is_empty() {
            return Err(ExtractionError::Configuration("ai.api_url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self { client, settings })
    }

    fn request_body(&self, image: &ImageInput) -> Value {
        json!({
            "model": self.settings.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_PROMPT },
                        { "type": "image_url", "image_url": { "url": image.data_url() } }
                    ]
                }
            ]
        })
    }
}

#[async_trait]
impl NameExtractor for HttpNameExtractor {
    async fn extract_names(&self, image: &ImageInput) -> Result<Vec<String>, ExtractionError> {
        if self.settings.api_key.is_empty() {
            return Err(ExtractionError::Configuration("ai.api_key is empty".to_string()));
        }

        let response = self
            .client
            .post(&self.settings.api_url)
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Upstream {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ExtractionError::Malformed("reply has no content".to_string()))?;

        Ok(parse_student_names(&content))
    }
}

/// Extractor answering with a fixed reply, for tests and local runs.
#[derive(Debug, Clone)]
pub struct StaticNameExtractor {
    reply: Result<String, String>,
}

impl StaticNameExtractor {
    /// Parse `reply` as if the AI service had returned it.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
        }
    }
}

#[async_trait]
impl NameExtractor for StaticNameExtractor {
    async fn extract_names(&self, _image: &ImageInput) -> Result<Vec<String>, ExtractionError> {
        match &self.reply {
            Ok(text) => Ok(parse_student_names(text)),
            Err(message) => Err(ExtractionError::Transport(message.clone())),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line.
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line
        .trim()
        .trim_start_matches(['-', '*', '•', '·'])
        .trim_start();

    let digits_end = line
        .char_indices()
        .find(|(_, c)| !c.is_numeric())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    if digits_end > 0 {
        let rest = &line[digits_end..];
        if let Some(stripped) = rest
            .strip_prefix(['.', ')', '-', ':'])
            .filter(|s| s.starts_with(char::is_whitespace) || s.is_empty())
        {
            return stripped.trim();
        }
    }
    line
}

fn names_from_json(value: Value) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("names") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    Some(
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                Value::Object(mut obj) => match obj.remove("name") {
                    Some(Value::String(name)) => Some(name),
                    _ => None,
                },
                _ => None,
            })
            .collect(),
    )
}

/// Turn a model reply into a clean list of names.
///
/// Accepts a JSON array (bare, fenced, or under a `names` key) or a plain
/// list with bullets or numbering. Names are trimmed, blanks dropped and
/// duplicates removed keeping the first occurrence.
pub fn parse_student_names(reply: &str) -> Vec<String> {
    let body = strip_code_fence(reply);

    let candidates = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(names_from_json)
        .unwrap_or_else(|| {
            body.lines()
                .map(strip_list_marker)
                .map(|line| line.trim_matches(|c| c == '"' || c == ',').to_string())
                .collect()
        });

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
