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

//! Aggregate scores across rows
//!
//! A NaN score means the judge produced no judgment for that row. It must
//! not be averaged as a value, so non-finite scores are counted as skipped
//! and left out of every statistic.

use crate::EvalOutput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,

    /// Mean over finite scores; None when no row produced one
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,

    /// Rows with a finite score
    pub evaluated: usize,

    /// Rows whose score was NaN, infinite or absent
    pub skipped: usize,
}

/// Summarize one numeric metric over evaluated rows
pub fn summarize(metric: &str, rows: &[EvalOutput]) -> MetricSummary {
    let scores: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.float(metric))
        .filter(|score| score.is_finite())
        .collect();

    let evaluated = scores.len();
    let mean = (evaluated > 0).then(|| scores.iter().sum::<f64>() / evaluated as f64);
    let min = scores.iter().copied().reduce(f64::min);
    let max = scores.iter().copied().reduce(f64::max);

    MetricSummary {
        metric: metric.to_string(),
        mean,
        min,
        max,
        evaluated,
        skipped: rows.len() - evaluated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(score: f64) -> EvalOutput {
        EvalOutput::score_with_reason("helpfulness", score, "")
    }

    #[test]
    fn test_nan_rows_are_skipped() {
        let rows = vec![row(4.0), row(f64::NAN), row(2.0), EvalOutput::new()];
        let summary = summarize("helpfulness", &rows);

        assert_eq!(summary.mean, Some(3.0));
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.max, Some(4.0));
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_all_unjudged() {
        let summary = summarize("helpfulness", &[row(f64::NAN)]);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.skipped, 1);
    }
}
