//! Completion model capability.
//!
//! [`CompletionModel`] is the only thing the survey builder needs from a
//! language model: send a prompt, get text back. [`OpenAiChat`] implements it
//! against any OpenAI-compatible `/chat/completions` endpoint.

use crate::config::LlmSettings;
use crate::error::{Result, SurveyError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Sampling temperature for survey drafts
pub const SURVEY_TEMPERATURE: f64 = 0.3;

/// Models offered by the front-ends
pub const AVAILABLE_MODELS: &[&str] = &["gpt-4", "gpt-3.5-turbo"];

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Send a prompt, receive a text completion.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Token usage reported by the API
#[derive(Debug, Clone, Default)]
struct TokenUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// OpenAI-compatible API response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

/// Chat-completions client bound to one model and one credential
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    settings: LlmSettings,
    model: String,
    temperature: f64,
}

impl OpenAiChat {
    /// Create a client for `model` at the survey temperature.
    ///
    /// No request timeout is set; the call is bounded by the provider.
    pub fn new(settings: LlmSettings, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SurveyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            settings,
            model: model.into(),
            temperature: SURVEY_TEMPERATURE,
        })
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending LLM request");

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.settings.api_key))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(SurveyError::Network)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SurveyError::Api {
                code: status.as_u16() as i32,
                message: format!("LLM API error: {} - {}", status, error_text),
            });
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SurveyError::Parse(format!("Failed to parse LLM response: {}", e)))?;

        let usage = api_response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        info!(
            model = %self.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "LLM completion received"
        );

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SurveyError::Parse("LLM response has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: &str) -> LlmSettings {
        LlmSettings {
            api_key: "sk-test".to_string(),
            base_url: base_url.to_string(),
        }
    }

    #[test]
    fn test_request_body() {
        let chat = OpenAiChat::new(settings("http://localhost"), "gpt-4").expect("client");
        let body = chat.request_body("hello");

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"].as_array().map(|m| m.len()), Some(1));
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        let temperature = body["temperature"].as_f64().expect("temperature");
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-3.5-turbo"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "## Background\n..."}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let chat = OpenAiChat::new(settings(&format!("{}/v1/", mock_server.uri())), DEFAULT_MODEL)
            .expect("client");
        let text = chat.complete("prompt").await.expect("completion");
        assert_eq!(text, "## Background\n...");
    }

    #[tokio::test]
    async fn test_complete_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&mock_server)
            .await;

        let chat = OpenAiChat::new(settings(&mock_server.uri()), "gpt-4").expect("client");
        let err = chat.complete("prompt").await.expect_err("401 must fail");
        match err {
            SurveyError::Api { code, message } => {
                assert_eq!(code, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices_is_parse_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&mock_server)
            .await;

        let chat = OpenAiChat::new(settings(&mock_server.uri()), "gpt-4").expect("client");
        let err = chat.complete("prompt").await.expect_err("empty choices must fail");
        assert!(matches!(err, SurveyError::Parse(_)));
    }
}
