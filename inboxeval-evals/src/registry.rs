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

//! Evaluator registration and per-row input binding
//!
//! Each evaluator is registered under its id together with a column mapping
//! that says where its named inputs come from. Mapping templates reference
//! dataset columns as `${data.<column>}` and the generated reply as
//! `${target.response}`, and may mix in literal text.

use crate::{EvalError, EvalInputs, EvalOutput, Evaluator};
use inboxeval_core::{DatasetRow, TargetOutput};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Evaluator parameter name -> binding template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    bindings: BTreeMap<String, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, parameter: impl Into<String>, template: impl Into<String>) -> Self {
        self.bindings.insert(parameter.into(), template.into());
        self
    }

    /// Helpfulness sees the user's instructions prepended to the email context
    pub fn helpfulness() -> Self {
        Self::new()
            .with("query", "${data.query}")
            .with("context", "${data.user_instructions}\n${data.context}")
            .with("response", "${target.response}")
    }

    /// Bind every parameter for one row
    pub fn resolve(&self, row: &DatasetRow, target: &TargetOutput) -> Result<EvalInputs, EvalError> {
        let mut inputs = EvalInputs::new();
        for (parameter, template) in &self.bindings {
            inputs.insert(parameter.clone(), render_binding(template, row, target)?);
        }
        Ok(inputs)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

fn binding_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(data|target)\.(\w+)\}").expect("binding pattern is valid")
    })
}

fn render_binding(
    template: &str,
    row: &DatasetRow,
    target: &TargetOutput,
) -> Result<String, EvalError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in binding_pattern().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        rendered.push_str(&template[last..whole.start()]);

        let value = match (&caps[1], &caps[2]) {
            ("data", column) => row.field(column),
            ("target", "response") => Some(target.response.clone()),
            _ => None,
        };
        let value = value.ok_or_else(|| EvalError::MissingField(format!("{}.{}", &caps[1], &caps[2])))?;
        rendered.push_str(&value);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

struct Registration {
    evaluator: Arc<dyn Evaluator>,
    mapping: ColumnMapping,
}

/// Evaluators keyed by id, each with its column mapping
#[derive(Default)]
pub struct EvaluatorRegistry {
    entries: BTreeMap<String, Registration>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an evaluator under its id. Ids must be unique.
    pub fn register(
        &mut self,
        evaluator: Arc<dyn Evaluator>,
        mapping: ColumnMapping,
    ) -> Result<(), EvalError> {
        let id = evaluator.id().to_string();
        if self.entries.contains_key(&id) {
            return Err(EvalError::InvalidInput(format!(
                "Evaluator already registered: {}",
                id
            )));
        }
        debug!(evaluator = %id, "Registered evaluator");
        self.entries.insert(id, Registration { evaluator, mapping });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Evaluator>> {
        self.entries.get(id).map(|r| r.evaluator.clone())
    }

    pub fn mapping(&self, id: &str) -> Option<&ColumnMapping> {
        self.entries.get(id).map(|r| &r.mapping)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Run one evaluator on one row
    pub async fn evaluate(
        &self,
        id: &str,
        row: &DatasetRow,
        target: &TargetOutput,
    ) -> Result<EvalOutput, EvalError> {
        let entry = self
            .entries
            .get(id)
            .ok_or_else(|| EvalError::UnknownEvaluator(id.to_string()))?;
        let inputs = entry.mapping.resolve(row, target)?;
        entry.evaluator.evaluate(&inputs).await
    }

    /// Run every registered evaluator on one row and merge their metrics.
    /// Stops at the first failing evaluator.
    pub async fn evaluate_row(
        &self,
        row: &DatasetRow,
        target: &TargetOutput,
    ) -> Result<EvalOutput, EvalError> {
        let mut merged = EvalOutput::new();
        for id in self.entries.keys() {
            merged.extend(self.evaluate(id, row, target).await?);
        }
        Ok(merged)
    }
}
