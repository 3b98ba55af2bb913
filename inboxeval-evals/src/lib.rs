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

//! # Inboxeval Evaluation Framework
//!
//! LLM-as-judge evaluation for email assistant responses.
//!
//! ## Features
//!
//! - **Trait-based evaluator system**: every metric is an interchangeable [`Evaluator`]
//! - **Helpfulness judge**: prompt-driven scorer with tolerant score/reason extraction
//! - **Column mapping**: bind dataset and target fields to evaluator inputs per row
//! - **Target generation**: produce the candidate reply under evaluation
//! - **NaN-safe summaries**: unjudged rows never skew aggregate scores
//!
//! ## Example
//!
//! ```rust,ignore
//! use inboxeval_core::{DatasetRow, EvalSettings};
//! use inboxeval_evals::{ColumnMapping, EvaluatorRegistry, ResponseGenerator};
//! use inboxeval_evals::evaluators::HelpfulnessEvaluator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = EvalSettings::load(None)?;
//!
//!     let mut registry = EvaluatorRegistry::new();
//!     registry.register(
//!         Arc::new(HelpfulnessEvaluator::from_config(&settings.model)?),
//!         ColumnMapping::helpfulness(),
//!     )?;
//!
//!     let row = DatasetRow::new("Can we meet Friday?", "Calendar is free", "Be brief", "");
//!     let target = ResponseGenerator::from_config(&settings.model, "gpt-4o", None)?;
//!     let answer = target.generate(&row.query, &row.user_instructions, &row.context).await?;
//!     let output = registry.evaluate_row(&row, &answer).await?;
//!     println!("{:?}", output.float("helpfulness"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod evaluators;
pub mod llm_client;
pub mod prompt;
pub mod registry;
pub mod summary;
pub mod tagged_output;
pub mod target;

pub use inboxeval_core::{EvalOutput, MetricValue};
pub use llm_client::{AzureOpenAIClient, ChatMessage, ChatParameters, LLMClient, LLMError};
pub use prompt::PromptTemplate;
pub use registry::{ColumnMapping, EvaluatorRegistry};
pub use summary::{summarize, MetricSummary};
pub use tagged_output::{format_reason_score, parse_reason_score, TaggedOutputParser};
pub use target::{ResponseGenerator, GENERATION_ERROR_RESPONSE};

/// Core trait that all evaluators must implement
///
/// Implementations hold no per-row state, so one instance can be shared
/// across rows and tasks.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Name the evaluator is registered under (e.g., "helpfulness")
    fn id(&self) -> &str;

    /// Evaluate a single row's bound inputs
    async fn evaluate(&self, inputs: &EvalInputs) -> Result<EvalOutput, EvalError>;

    /// Metadata about this evaluator (name, version, inputs)
    fn metadata(&self) -> EvaluatorMetadata;
}

/// Named string inputs for one evaluator call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalInputs {
    values: BTreeMap<String, String>,
}

impl EvalInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value of a bound input. Empty text is a valid value; an unbound name is not.
    pub fn require(&self, name: &str) -> Result<&str, EvalError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| EvalError::MissingField(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Metadata about an evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorMetadata {
    /// Human-readable name
    pub name: String,

    /// Version string (e.g., "1.0.0")
    pub version: String,

    /// Description of what this evaluator does
    pub description: String,

    /// Inputs the evaluator reads from [`EvalInputs`]
    pub inputs: Vec<String>,

    /// Tags for categorization
    pub tags: Vec<String>,
}

/// Errors that can occur during evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("LLM client error: {0}")]
    LLMClient(#[from] LLMError),

    #[error("Score is not a number: {raw:?}")]
    ScoreParse {
        raw: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown evaluator: {0}")]
    UnknownEvaluator(String),

    #[error("Evaluation timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(#[from] inboxeval_core::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_distinguishes_empty_from_missing() {
        let inputs = EvalInputs::new().with("query", "").with("response", "Thanks!");

        assert_eq!(inputs.require("query").unwrap(), "");
        assert_eq!(inputs.require("response").unwrap(), "Thanks!");
        assert!(matches!(
            inputs.require("context"),
            Err(EvalError::MissingField(name)) if name == "context"
        ));
    }
}
