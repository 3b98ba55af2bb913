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

//! Score and reason extraction from tagged judge output
//!
//! Judge prompts ask the model to wrap its justification in `<S1>…</S1>` and
//! its numeric score in `<S2>…</S2>`. The model may add prose around them,
//! repeat the format in a worked example, or leave a tag out entirely. Only
//! the first complete occurrence of each tag pair counts.

use crate::EvalError;
use regex::Regex;
use std::sync::OnceLock;

/// Step-by-step reasoning the judge is asked to write first. Never parsed.
pub const THOUGHT_TAGS: (&str, &str) = ("<S0>", "</S0>");

/// Justification for the score
pub const REASON_TAGS: (&str, &str) = ("<S1>", "</S1>");

/// Numeric score
pub const SCORE_TAGS: (&str, &str) = ("<S2>", "</S2>");

/// Extracts `(score, reason)` from raw judge text
///
/// Stateless once built; share one instance freely across threads.
#[derive(Debug, Clone)]
pub struct TaggedOutputParser {
    reason: Regex,
    score: Regex,
}

impl TaggedOutputParser {
    /// Build a parser for custom marker pairs. Markers are matched verbatim.
    pub fn new(reason_tags: (&str, &str), score_tags: (&str, &str)) -> Result<Self, regex::Error> {
        Ok(Self {
            reason: tag_pattern(reason_tags)?,
            score: tag_pattern(score_tags)?,
        })
    }

    /// Parse judge output into a score and a reason.
    ///
    /// Absent output or absent tags are not errors: the score falls back to
    /// NaN and the reason to an empty string. A score tag whose content is not
    /// a decimal number is an error.
    pub fn parse(&self, llm_output: Option<&str>) -> Result<(f64, String), EvalError> {
        let mut score = f64::NAN;
        let mut reason = String::new();

        let text = match llm_output {
            Some(text) if !text.is_empty() => text,
            _ => return Ok((score, reason)),
        };

        if let Some(raw) = first_capture(&self.score, text) {
            let raw = raw.trim();
            score = raw.parse::<f64>().map_err(|source| EvalError::ScoreParse {
                raw: raw.to_string(),
                source,
            })?;
        }

        if let Some(raw) = first_capture(&self.reason, text) {
            reason = raw.trim().to_string();
        }

        Ok((score, reason))
    }
}

impl Default for TaggedOutputParser {
    fn default() -> Self {
        Self::new(REASON_TAGS, SCORE_TAGS).expect("escaped tag markers form a valid pattern")
    }
}

fn tag_pattern((open, close): (&str, &str)) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "(?s){}(.*?){}",
        regex::escape(open),
        regex::escape(close)
    ))
}

fn first_capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse judge output with the default `<S1>`/`<S2>` markers
pub fn parse_reason_score(llm_output: Option<&str>) -> Result<(f64, String), EvalError> {
    static PARSER: OnceLock<TaggedOutputParser> = OnceLock::new();
    PARSER.get_or_init(TaggedOutputParser::default).parse(llm_output)
}

/// Render a score and reason in the tagged form the judge is asked to produce
///
/// Parsing the result gives back the same pair only when `reason` has no
/// leading or trailing whitespace and does not contain the closing reason tag.
/// Padding is trimmed away on the way back.
pub fn format_reason_score(score: f64, reason: &str) -> String {
    format!(
        "{}{}{} {}{}{}",
        REASON_TAGS.0, reason, REASON_TAGS.1, SCORE_TAGS.0, score, SCORE_TAGS.1
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_tags_with_preamble() {
        let (score, reason) = parse_reason_score(Some(
            "Some preamble. <S1>The response directly answers the question.</S1> trailing text <S2>4</S2>",
        ))
        .unwrap();

        assert_eq!(score, 4.0);
        assert_eq!(reason, "The response directly answers the question.");
    }

    #[test]
    fn test_tag_order_does_not_matter() {
        let (score, reason) = parse_reason_score(Some("<S2>3.5</S2><S1>Partially helpful</S1>")).unwrap();
        assert_eq!(score, 3.5);
        assert_eq!(reason, "Partially helpful");
    }

    #[test]
    fn test_empty_and_absent_output() {
        for output in [None, Some("")] {
            let (score, reason) = parse_reason_score(output).unwrap();
            assert!(score.is_nan());
            assert_eq!(reason, "");
        }
    }

    #[test]
    fn test_reason_only() {
        let (score, reason) = parse_reason_score(Some("<S1>  Misses the attachment request \n</S1>")).unwrap();
        assert!(score.is_nan());
        assert_eq!(reason, "Misses the attachment request");
    }

    #[test]
    fn test_score_only() {
        let (score, reason) = parse_reason_score(Some("Score: <S2> 2 </S2>")).unwrap();
        assert_eq!(score, 2.0);
        assert_eq!(reason, "");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let output = "Format example: <S1>reason</S1><S2>1</S2>\n\
                      Actual: <S1>Polite and complete</S1><S2>5</S2>";
        let (score, reason) = parse_reason_score(Some(output)).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(reason, "reason");
    }

    #[test]
    fn test_multiline_content() {
        let (score, reason) =
            parse_reason_score(Some("<S1>Covers the dates.\nSkips the budget.</S1>\n<S2>\n4.5\n</S2>")).unwrap();
        assert_eq!(score, 4.5);
        assert_eq!(reason, "Covers the dates.\nSkips the budget.");
    }

    #[test]
    fn test_unterminated_tags_are_absent() {
        let (score, reason) = parse_reason_score(Some("<S1>cut off mid-sentence <S2>4")).unwrap();
        assert!(score.is_nan());
        assert_eq!(reason, "");
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let (score, _) = parse_reason_score(Some("<s2>4</s2>")).unwrap();
        assert!(score.is_nan());
    }

    #[test]
    fn test_malformed_score_is_an_error() {
        let err = parse_reason_score(Some("<S1>fine</S1><S2>four</S2>")).unwrap_err();
        match err {
            EvalError::ScoreParse { raw, .. } => assert_eq!(raw, "four"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_score_tag_is_an_error() {
        assert!(matches!(
            parse_reason_score(Some("<S2>  </S2>")),
            Err(EvalError::ScoreParse { .. })
        ));
    }

    #[test]
    fn test_format_then_parse_round_trip() {
        let cases = [
            (4.0, "Addresses every question in the email."),
            (2.5, "Tone is off.\nMissing the meeting time."),
            (0.125, ""),
        ];
        for (score, reason) in cases {
            let rendered = format_reason_score(score, reason);
            assert_eq!(parse_reason_score(Some(rendered.as_str())).unwrap(), (score, reason.to_string()));
        }
    }

    #[test]
    fn test_padded_reason_comes_back_trimmed() {
        let rendered = format_reason_score(3.0, "  Polite reply.\n");
        let (score, reason) = parse_reason_score(Some(rendered.as_str())).unwrap();
        assert_eq!(score, 3.0);
        assert_eq!(reason, "Polite reply.");
    }

    #[test]
    fn test_custom_markers() {
        let parser = TaggedOutputParser::new(("[why]", "[/why]"), ("[score]", "[/score]")).unwrap();
        let (score, reason) = parser.parse(Some("[score]3[/score] [why]ok[/why] <S2>5</S2>")).unwrap();
        assert_eq!(score, 3.0);
        assert_eq!(reason, "ok");
    }
}
