use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::types::LlmClient;
use super::InsightError;
use crate::config::LlmConfig;

/// Sampling temperature for all insight requests.
const TEMPERATURE: f32 = 0.3;

/// OpenAI-compatible chat-completion client (Groq by default).
pub struct GroqClient {
    url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GroqClient {
    /// Build a client from config. Fails without an API key.
    pub fn new(config: &LlmConfig) -> Result<Self, InsightError> {
        let api_key = config.api_key.clone().ok_or(InsightError::MissingApiKey)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| InsightError::HttpClient(e.to_string()))?;

        Ok(Self {
            url: config.url.clone(),
            model: config.model.clone(),
            api_key,
            client,
            timeout_secs: config.timeout.as_secs(),
        })
    }
}

/// Request body for /chat/completions
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response body from /chat/completions
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

impl LlmClient for GroqClient {
    fn complete_json(&self, prompt: &str) -> Result<Map<String, Value>, InsightError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    InsightError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    InsightError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| InsightError::ResponseParsing(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| InsightError::ResponseParsing("No choices in response".into()))?;

        debug!(model = %self.model, chars = content.len(), "LLM reply received");
        parse_json_object(&content)
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse an LLM reply as a JSON object.
pub fn parse_json_object(content: &str) -> Result<Map<String, Value>, InsightError> {
    let value: Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| InsightError::ResponseParsing(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(InsightError::NotAnObject),
    }
}

// ═══════════════════════════════════════════════════════════
// Test double
// ═══════════════════════════════════════════════════════════

/// Client returning a canned reply and recording every prompt.
/// Clones share the prompt log.
#[derive(Clone)]
pub struct MockLlmClient {
    response: Option<String>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            prompts: Rc::default(),
        }
    }

    /// Client whose every call fails as if the endpoint were down.
    pub fn failing() -> Self {
        Self {
            response: None,
            prompts: Rc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl LlmClient for MockLlmClient {
    fn complete_json(&self, prompt: &str) -> Result<Map<String, Value>, InsightError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match &self.response {
            Some(r) => parse_json_object(r),
            None => Err(InsightError::HttpClient("mock endpoint unreachable".into())),
        }
    }
}
