//! Language-model collaborator client.
//!
//! The pipeline treats the model as a text-in, text-out collaborator behind
//! the [`LlmClient`] trait. [`ChatCompletionClient`] speaks the standard
//! OpenAI-compatible chat completions protocol, which covers Groq, OpenAI,
//! and local servers alike.

pub mod response;

use crate::error::RetrieverError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

pub use response::{LlmReply, parse_reply};

/// A text generation backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for `prompt`, optionally under a system
    /// instruction.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    /// Base URL of the API, e.g. `https://api.groq.com/openai/v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// OpenAI-compatible chat completions client.
#[derive(Debug)]
pub struct ChatCompletionClient {
    config: ChatCompletionConfig,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    pub fn new(config: ChatCompletionConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RetrieverError::MissingCredentials { name: "llm api_key" }.into());
        }
        Ok(Self {
            config,
            client: reqwest::Client::new(),
        })
    }

    fn build_messages(prompt: &str, system: Option<&str>) -> Vec<Value> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));
        messages
    }
}

#[async_trait]
impl LlmClient for ChatCompletionClient {
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": Self::build_messages(prompt, system),
        });

        let url = format!(
            "{}/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("llm request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("llm api error {status}: {text}");
        }

        let json: Value = response
            .json()
            .await
            .context("malformed llm response body")?;
        let content = json["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| anyhow::anyhow!("no choices in llm response"))?;
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let result = ChatCompletionClient::new(ChatCompletionConfig {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
        });
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RetrieverError>(),
            Some(RetrieverError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn test_message_order_system_first() {
        let messages = ChatCompletionClient::build_messages("question", Some("be terse"));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "question");
    }

    #[test]
    fn test_no_system_message_when_absent() {
        let messages = ChatCompletionClient::build_messages("question", None);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }
}
