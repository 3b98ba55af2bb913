// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! LLM client abstraction for the judge and target deployments

use async_trait::async_trait;
use inboxeval_core::{ConfigError, ModelConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trait for chat-completion clients
///
/// One call is one network round trip. Implementations must not retry or
/// cache; callers decide on timeouts.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a conversation and return the first completion
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<LLMResponse, LLMError>;

    /// Get model (deployment) name
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
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

/// Sampling parameters sent with a request. Unset fields are left to the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    params: &'a ChatParameters,
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error ({status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The service answered but produced no usable completion
    #[error("No completion returned")]
    NoCompletion,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Azure OpenAI chat-completions client
///
/// `reqwest::Client` pools connections behind an `Arc`, so a single instance
/// can be shared by every row of a run.
pub struct AzureOpenAIClient {
    api_key: String,
    deployment: String,
    api_version: String,
    endpoint: String,
    client: reqwest::Client,
}

impl AzureOpenAIClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            api_key: config.api_key.clone(),
            deployment: config.azure_deployment.clone(),
            api_version: config.api_version.clone(),
            endpoint: config.azure_endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Route requests to another deployment on the same resource
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        )
    }
}

#[async_trait]
impl LLMClient for AzureOpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        params: &ChatParameters,
    ) -> Result<LLMResponse, LLMError> {
        let request = ChatRequest {
            messages: &messages,
            params,
        };

        tracing::debug!(deployment = %self.deployment, "Sending chat completion request");

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LLMError::NoCompletion)?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.deployment.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.deployment
    }
}
