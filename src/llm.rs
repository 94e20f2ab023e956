use crate::config::LlmConfig;
use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Message in OpenAI chat format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system", "user", "assistant"
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// A system + user exchange, which is the only shape the pipeline sends.
    pub fn new(model: &str, system: &str, user: &str, temperature: f32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Content of the last user message.
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Opaque text completion service. May be slow, may fail, may return
/// malformed SQL.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Client for OpenAI-compatible chat completion endpoints
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AssistantError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key, config.base_url.clone()))
    }

    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });

        // Newer models reject max_tokens in favour of max_completion_tokens
        if let Some(max_tokens) = request.max_tokens {
            if request.model.starts_with("gpt-5")
                || request.model.contains("o1")
                || request.model.starts_with("gpt-4")
            {
                body["max_completion_tokens"] = serde_json::json!(max_tokens);
            } else {
                body["max_tokens"] = serde_json::json!(max_tokens);
            }
        }

        body
    }
}

/// Pull the first choice's content out of a chat completion response.
fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(AssistantError::Llm(format!("LLM API error: {}", error)));
    }

    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| AssistantError::Llm("No choices array in LLM response".to_string()))?;

    let first = choices
        .first()
        .ok_or_else(|| AssistantError::Llm("Empty choices array in LLM response".to_string()))?;

    match first.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(AssistantError::Llm(
                "LLM response was filtered by content policy".to_string(),
            ))
        }
        _ => {}
    }

    let content = first["message"]["content"]
        .as_str()
        .ok_or_else(|| AssistantError::Llm("No content in LLM response".to_string()))?;

    if content.trim().is_empty() {
        return Err(AssistantError::Llm("Empty content in LLM response".to_string()));
    }

    Ok(content.to_string())
}

#[async_trait]
impl TextCompletion for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        debug!(model = %request.model, temperature = request.temperature, "Calling LLM");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&Self::request_body(&request))
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_uses_completion_tokens_for_newer_models() {
        let request = CompletionRequest::new("gpt-4o-mini", "sys", "user", 0.0).with_max_tokens(12);
        let body = LlmClient::request_body(&request);
        assert_eq!(body["max_completion_tokens"], json!(12));
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("user"));

        let legacy = CompletionRequest::new("llama3", "sys", "user", 0.0).with_max_tokens(12);
        let body = LlmClient::request_body(&legacy);
        assert_eq!(body["max_tokens"], json!(12));
    }

    #[test]
    fn test_extract_content() {
        let ok = json!({"choices": [{"message": {"content": "SELECT 1"}, "finish_reason": "stop"}]});
        assert_eq!(extract_content(&ok).unwrap(), "SELECT 1");

        let filtered = json!({"choices": [{"message": {"content": "x"}, "finish_reason": "content_filter"}]});
        assert!(matches!(extract_content(&filtered), Err(AssistantError::Llm(_))));

        let empty = json!({"choices": []});
        assert!(extract_content(&empty).is_err());

        let api_error = json!({"error": {"message": "bad key"}});
        let err = extract_content(&api_error).unwrap_err();
        assert!(err.to_string().contains("bad key"));
    }
}
