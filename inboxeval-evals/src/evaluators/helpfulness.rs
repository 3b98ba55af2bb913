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

//! Helpfulness scoring using LLM-as-judge

use crate::{
    llm_client::{LLMClient, LLMError},
    prompt::PromptTemplate,
    tagged_output::TaggedOutputParser,
    AzureOpenAIClient, EvalError, EvalInputs, EvalOutput, Evaluator, EvaluatorMetadata,
};
use async_trait::async_trait;
use inboxeval_core::ModelConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Judges how helpful a reply is to the sender's query, given the context
///
/// Produces `helpfulness` (1-5, NaN when the judge gave no score) and
/// `helpfulness_reason`. One judge call per row, no retry: transport errors
/// and unparseable scores are returned to the caller.
pub struct HelpfulnessEvaluator {
    llm_client: Arc<dyn LLMClient>,
    prompt: PromptTemplate,
    parser: TaggedOutputParser,
}

impl HelpfulnessEvaluator {
    pub const METRIC: &'static str = "helpfulness";

    /// Create a new evaluator with the default judge prompt
    pub fn new(llm_client: Arc<dyn LLMClient>) -> Self {
        Self {
            llm_client,
            prompt: PromptTemplate::helpfulness(),
            parser: TaggedOutputParser::default(),
        }
    }

    /// Bind the judge to the configured deployment
    pub fn from_config(config: &ModelConfig) -> Result<Self, EvalError> {
        Ok(Self::new(Arc::new(AzureOpenAIClient::new(config)?)))
    }

    /// Replace the judge prompt. It must ask for the same score and reason tags.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }
}

#[async_trait]
impl Evaluator for HelpfulnessEvaluator {
    fn id(&self) -> &str {
        Self::METRIC
    }

    async fn evaluate(&self, inputs: &EvalInputs) -> Result<EvalOutput, EvalError> {
        let start = Instant::now();

        let bound = EvalInputs::new()
            .with("query", inputs.require("query")?)
            .with("context", inputs.require("context")?)
            .with("response", inputs.require("response")?);

        let messages = self.prompt.render(&bound);
        let llm_output = match self.llm_client.complete(messages, &self.prompt.parameters).await {
            Ok(response) => Some(response.content),
            Err(LLMError::NoCompletion) => None,
            Err(e) => return Err(e.into()),
        };

        let (score, reason) = self.parser.parse(llm_output.as_deref())?;
        if score.is_nan() {
            warn!(
                model = self.llm_client.model_name(),
                "Judge output carried no score; recording NaN"
            );
        }

        debug!(
            score,
            duration_ms = start.elapsed().as_millis() as u64,
            "Helpfulness evaluated"
        );

        Ok(EvalOutput::score_with_reason(Self::METRIC, score, reason))
    }

    fn metadata(&self) -> EvaluatorMetadata {
        EvaluatorMetadata {
            name: "Helpfulness".to_string(),
            version: "1.0.0".to_string(),
            description: "Rates from 1 to 5 how well a reply serves the sender's query given the instructions and email context, using LLM-as-judge.".to_string(),
            inputs: vec![
                "query".to_string(),
                "context".to_string(),
                "response".to_string(),
            ],
            tags: vec!["helpfulness".to_string(), "llm-as-judge".to_string()],
        }
    }
}
