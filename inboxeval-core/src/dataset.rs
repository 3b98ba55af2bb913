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

//! Dataset rows and target outputs
//!
//! A row carries the fields the target and the evaluators bind to. The
//! candidate response is never read from the dataset: any `response` column
//! is dropped on load because the target generates it fresh.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column that is stripped from incoming rows
pub const RESPONSE_COLUMN: &str = "response";

/// One evaluation row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDatasetRow")]
pub struct DatasetRow {
    pub query: String,
    pub context: String,
    pub user_instructions: String,
    pub ground_truth: String,

    /// Any other columns, kept for column mappings that reference them
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawDatasetRow {
    #[serde(default)]
    query: Option<serde_json::Value>,
    #[serde(default)]
    context: Option<serde_json::Value>,
    #[serde(default)]
    user_instructions: Option<serde_json::Value>,
    #[serde(default)]
    ground_truth: Option<serde_json::Value>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl From<RawDatasetRow> for DatasetRow {
    fn from(raw: RawDatasetRow) -> Self {
        let mut extra = raw.extra;
        extra.remove(RESPONSE_COLUMN);
        Self {
            query: raw.query.as_ref().map(cell_text).unwrap_or_default(),
            context: raw.context.as_ref().map(cell_text).unwrap_or_default(),
            user_instructions: raw
                .user_instructions
                .as_ref()
                .map(cell_text)
                .unwrap_or_default(),
            ground_truth: raw.ground_truth.as_ref().map(cell_text).unwrap_or_default(),
            extra,
        }
    }
}

impl DatasetRow {
    pub fn new(
        query: impl Into<String>,
        context: impl Into<String>,
        user_instructions: impl Into<String>,
        ground_truth: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            context: context.into(),
            user_instructions: user_instructions.into(),
            ground_truth: ground_truth.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Parse one line of a line-delimited JSON dataset
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Look up a column by name. Null extra values read as empty text.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "query" => Some(self.query.clone()),
            "context" => Some(self.context.clone()),
            "user_instructions" => Some(self.user_instructions.clone()),
            "ground_truth" => Some(self.ground_truth.clone()),
            _ => self.extra.get(name).map(cell_text),
        }
    }
}

/// Text of a dataset cell: strings as is, null as empty, anything else as JSON
fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// What the target generator produced for a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutput {
    pub response: String,
}

impl TargetOutput {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_column_is_dropped() {
        let row = DatasetRow::from_json_line(
            r#"{"query":"Can we move the call?","context":"Call is at 3pm","user_instructions":"Be brief","ground_truth":"Sure","response":"stale answer","tone":"formal"}"#,
        )
        .unwrap();

        assert_eq!(row.query, "Can we move the call?");
        assert_eq!(row.user_instructions, "Be brief");
        assert!(row.field("response").is_none());
        assert_eq!(row.field("tone").as_deref(), Some("formal"));
    }

    #[test]
    fn test_missing_and_null_fields_are_empty() {
        let row = DatasetRow::from_json_line(r#"{"query":"Hi","context":null,"priority":null,"id":7}"#)
            .unwrap();

        assert_eq!(row.context, "");
        assert_eq!(row.ground_truth, "");
        assert_eq!(row.field("priority").as_deref(), Some(""));
        assert_eq!(row.field("id").as_deref(), Some("7"));
        assert!(row.field("unknown").is_none());
    }

    #[test]
    fn test_numeric_cells_read_as_text() {
        let row = DatasetRow::from_json_line(r#"{"query":"q","context":3.5,"ground_truth":42}"#)
            .unwrap();

        assert_eq!(row.query, "q");
        assert_eq!(row.context, "3.5");
        assert_eq!(row.ground_truth, "42");
        assert_eq!(row.field("ground_truth").as_deref(), Some("42"));
    }
}
