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

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Type-safe metric values for evaluation outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
    Json(serde_json::Value),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(v) => Some(*v),
            MetricValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetricValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Named metric outputs of one evaluator call on one row
///
/// Non-finite floats serialize as `null`, so a "no judgment" score stays
/// distinguishable from zero in written results. Reading a `null` back yields
/// `Float(NaN)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalOutput {
    #[serde(deserialize_with = "metrics_with_nan")]
    pub metrics: BTreeMap<String, MetricValue>,
}

fn metrics_with_nan<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetricValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut metrics = BTreeMap::<String, MetricValue>::deserialize(deserializer)?;
    for value in metrics.values_mut() {
        if *value == MetricValue::Json(serde_json::Value::Null) {
            *value = MetricValue::Float(f64::NAN);
        }
    }
    Ok(metrics)
}

impl EvalOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `<metric>` / `<metric>_reason` pair expected for judge metrics
    pub fn score_with_reason(metric: &str, score: f64, reason: impl Into<String>) -> Self {
        let mut output = Self::new();
        output.insert(metric, MetricValue::Float(score));
        output.insert(
            &Self::reason_key(metric),
            MetricValue::String(reason.into()),
        );
        output
    }

    pub fn reason_key(metric: &str) -> String {
        format!("{}_reason", metric)
    }

    pub fn insert(&mut self, name: &str, value: MetricValue) {
        self.metrics.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.metrics.get(name)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(MetricValue::as_f64)
    }

    pub fn reason(&self, metric: &str) -> Option<&str> {
        self.get(&Self::reason_key(metric))
            .and_then(MetricValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Merge another evaluator's metrics into this row
    pub fn extend(&mut self, other: EvalOutput) {
        self.metrics.extend(other.metrics);
    }
}
