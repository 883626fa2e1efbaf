use anyhow::Result;
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::SummarizerConfig;
use crate::llm::{GenerateError, Generator};

const MAX_TOKENS: u32 = 100;
const TEMPERATURE: f32 = 0.3;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Body of a chat-completions response. Either field may be absent.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub message: String,
}

impl ChatResponse {
    pub fn into_text(self) -> Result<String, GenerateError> {
        if let Some(err) = self.error {
            return Err(GenerateError::Api(err.message));
        }
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GenerateError::Empty)
    }
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(cfg: &SummarizerConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            api_key,
            model: cfg.model.clone(),
        })
    }
}

impl Generator for OpenAiClient {
    fn generate(&self, system: &str, user: &str) -> Result<String, GenerateError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        debug!("{} answered HTTP {}", self.endpoint, status.as_u16());

        match serde_json::from_str::<ChatResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.error.is_some() => parsed.into_text(),
            _ => Err(GenerateError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_is_trimmed() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"  Interview on Monday.\n"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Interview on Monday.");
    }

    #[test]
    fn error_payload_wins() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
        .unwrap();
        match parsed.into_text() {
            Err(GenerateError::Api(msg)) => assert!(msg.contains("Incorrect API key")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_content_is_empty() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(parsed.into_text(), Err(GenerateError::Empty)));

        let parsed: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(parsed.into_text(), Err(GenerateError::Empty)));
    }
}
