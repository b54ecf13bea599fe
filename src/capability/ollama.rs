//! Ollama-backed text generation.
//!
//! Sends each prompt as a single user message to the `/api/chat` endpoint
//! with streaming disabled.

use crate::capability::Generator;
use crate::error::CapabilityError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.7,
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

/// Generator that talks to a local or remote Ollama server.
pub struct OllamaGenerator {
    settings: OllamaSettings,
    http_client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(settings: OllamaSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.settings.ollama_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, prompt: &str) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model: &self.settings.model_name,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
            options: OllamaOptions {
                temperature: self.settings.temperature,
            },
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, CapabilityError> {
        let url = self.chat_url();
        debug!("Sending {} byte prompt to {}", prompt.len(), url);

        let response = self
            .http_client
            .post(&url)
            .timeout(timeout)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout(timeout)
                } else if e.is_connect() {
                    CapabilityError::Provider(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.settings.ollama_url
                    ))
                } else {
                    CapabilityError::Provider(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Provider(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CapabilityError::Timeout(timeout)
            } else {
                CapabilityError::Provider(format!("Failed to parse Ollama response: {}", e))
            }
        })?;

        completion_text(chat_response)
    }

    fn model_name(&self) -> &str {
        &self.settings.model_name
    }
}

/// Extract the completion, treating a blank answer as a provider failure.
fn completion_text(response: OllamaChatResponse) -> Result<String, CapabilityError> {
    let content = response.message.content.trim();
    if content.is_empty() {
        return Err(CapabilityError::Provider(
            "Ollama returned an empty completion".to_string(),
        ));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = OllamaSettings::default();
        assert_eq!(settings.model_name, "llama3.2:latest");
        assert_eq!(settings.ollama_url, "http://localhost:11434");
    }

    #[test]
    fn test_request_shape() {
        let generator = OllamaGenerator::new(OllamaSettings {
            ollama_url: "http://ollama:11434/".to_string(),
            ..OllamaSettings::default()
        })
        .unwrap();

        assert_eq!(generator.chat_url(), "http://ollama:11434/api/chat");
        assert_eq!(generator.model_name(), "llama3.2:latest");

        let json = serde_json::to_value(generator.build_request("Was X a tyrant?")).unwrap();
        assert_eq!(json["model"], "llama3.2:latest");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Was X a tyrant?");
    }

    #[test]
    fn test_completion_text() {
        let response: OllamaChatResponse = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":"  verdict \n"},"done":true}"#,
        )
        .unwrap();
        assert_eq!(completion_text(response).unwrap(), "verdict");

        let blank: OllamaChatResponse = serde_json::from_str(
            r#"{"message":{"role":"assistant","content":"   "},"done":true}"#,
        )
        .unwrap();
        assert!(matches!(
            completion_text(blank),
            Err(CapabilityError::Provider(_))
        ));
    }
}
