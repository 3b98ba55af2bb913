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

//! Target answer generation
//!
//! Produces the candidate reply that the evaluators score: the model under
//! test acts as an email assistant and answers the row's query.

use crate::{
    llm_client::{ChatParameters, LLMClient, LLMError},
    prompt::PromptTemplate,
    AzureOpenAIClient, EvalError, EvalInputs,
};
use inboxeval_core::{ModelConfig, TargetOutput};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply recorded when the model returns no usable completion
pub const GENERATION_ERROR_RESPONSE: &str = "Error in generating a response.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are an Email Assistant and provide answers for emails given a context and user instructions.

user instructions:
{{user_instructions}}

context:
{{context}}";

pub struct ResponseGenerator {
    llm_client: Arc<dyn LLMClient>,
    prompt: PromptTemplate,
}

impl ResponseGenerator {
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: PromptTemplate {
                name: "email_assistant".to_string(),
                system: DEFAULT_SYSTEM_PROMPT.to_string(),
                user: "{{query}}".to_string(),
                parameters: ChatParameters::default(),
            },
        }
    }

    /// Generate with `model` as the deployment on the configured resource.
    /// `system_prompt` may use `{{user_instructions}}` and `{{context}}`.
    pub fn from_config(
        config: &ModelConfig,
        model: &str,
        system_prompt: Option<&str>,
    ) -> Result<Self, EvalError> {
        let client = AzureOpenAIClient::new(&config.for_deployment(model))?;
        let mut generator = Self::new(Arc::new(client));
        if let Some(system) = system_prompt {
            generator.prompt.system = system.to_string();
        }
        Ok(generator)
    }

    pub fn model_name(&self) -> &str {
        self.llm_client.model_name()
    }

    /// Answer one query. An empty completion becomes
    /// [`GENERATION_ERROR_RESPONSE`] so the row can still be scored; any
    /// other failure is returned.
    pub async fn generate(
        &self,
        query: &str,
        user_instructions: &str,
        context: &str,
    ) -> Result<TargetOutput, EvalError> {
        let inputs = EvalInputs::new()
            .with("query", query)
            .with("user_instructions", user_instructions)
            .with("context", context);

        let messages = self.prompt.render(&inputs);
        match self.llm_client.complete(messages, &self.prompt.parameters).await {
            Ok(response) => {
                debug!(model = %response.model, answer = %response.content, "Generated response");
                Ok(TargetOutput::new(response.content))
            }
            Err(LLMError::NoCompletion) => {
                warn!(model = self.model_name(), "No completion returned; using error response");
                Ok(TargetOutput::new(GENERATION_ERROR_RESPONSE))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{ChatMessage, LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockLLMClient {
        reply: Option<&'static str>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LLMClient for MockLLMClient {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            _params: &ChatParameters,
        ) -> Result<LLMResponse, LLMError> {
            *self.seen.lock().unwrap() = messages;
            match self.reply {
                Some(content) => Ok(LLMResponse {
                    content: content.to_string(),
                    usage: TokenUsage::default(),
                    model: "gpt-4o".to_string(),
                }),
                None => Err(LLMError::NoCompletion),
            }
        }

        fn model_name(&self) -> &str {
            "gpt-4o"
        }
    }

    #[tokio::test]
    async fn test_generate_builds_email_assistant_prompt() {
        let client = Arc::new(MockLLMClient {
            reply: Some("Hi Sam, Thursday works for me."),
            seen: Mutex::new(Vec::new()),
        });
        let generator = ResponseGenerator::new(client.clone());

        let output = generator
            .generate("Does Thursday work?", "Sign as Alex", "Alex is free Thursday")
            .await
            .unwrap();
        assert_eq!(output.response, "Hi Sam, Thursday works for me.");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].role, "system");
        assert!(seen[0].content.starts_with("You are an Email Assistant"));
        assert!(seen[0].content.contains("user instructions:\nSign as Alex"));
        assert!(seen[0].content.contains("context:\nAlex is free Thursday"));
        assert_eq!(seen[1], ChatMessage::user("Does Thursday work?"));
    }

    #[tokio::test]
    async fn test_no_completion_uses_error_response() {
        let generator = ResponseGenerator::new(Arc::new(MockLLMClient {
            reply: None,
            seen: Mutex::new(Vec::new()),
        }));

        let output = generator.generate("Hello?", "", "").await.unwrap();
        assert_eq!(output.response, GENERATION_ERROR_RESPONSE);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let config = ModelConfig {
            azure_endpoint: "http://127.0.0.1:1".to_string(),
            api_key: "key".to_string(),
            azure_deployment: "judge".to_string(),
            api_version: "2024-06-01".to_string(),
        };
        let generator = ResponseGenerator::from_config(&config, "gpt-4o", None).unwrap();
        assert_eq!(generator.model_name(), "gpt-4o");

        let err = generator.generate("Hello?", "", "").await.unwrap_err();
        assert!(matches!(err, EvalError::LLMClient(LLMError::Http(_))));
    }
}
