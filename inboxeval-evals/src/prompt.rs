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

//! Prompt templates for judge evaluators
//!
//! Templates use `{{name}}` placeholders filled from [`EvalInputs`] in one
//! pass, so input text that happens to contain `{{...}}` is left as is.

use crate::llm_client::{ChatMessage, ChatParameters};
use crate::tagged_output::{REASON_TAGS, SCORE_TAGS, THOUGHT_TAGS};
use crate::EvalInputs;
use regex::{Captures, Regex};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub name: String,
    pub system: String,
    pub user: String,
    pub parameters: ChatParameters,
}

impl PromptTemplate {
    /// Substitute inputs into the system and user messages.
    /// Placeholders with no matching input render as empty text.
    pub fn render(&self, inputs: &EvalInputs) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(fill(&self.system, inputs)),
            ChatMessage::user(fill(&self.user, inputs)),
        ]
    }

    /// Placeholder names referenced by this template, in order of first use
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for text in [&self.system, &self.user] {
            for caps in placeholder_pattern().captures_iter(text) {
                let name = caps[1].to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Judge prompt rating how well a reply helps with the user's email
    pub fn helpfulness() -> Self {
        let system = r#"# Instruction
## Goal
### You are an expert in evaluating the quality of a RESPONSE from an intelligent email assistant based on provided definition and data. Your goal will involve answering the questions below using the information provided.
- **Definition**: You are given a definition of the helpfulness that is being evaluated to help guide your Score.
- **Data**: Your input data include QUERY, CONTEXT and RESPONSE.
- **Tasks**: To complete your evaluation you will be asked to evaluate the Data in different ways."#
            .to_string();

        let user = format!(
            r#"# Definition
**Helpfulness** refers to how well the RESPONSE serves the user who sent the QUERY, given the CONTEXT (the user's instructions and the email material the assistant had available). A helpful RESPONSE addresses every request in the QUERY, uses the CONTEXT correctly, follows the user's instructions, and could be sent with little or no editing.

# Ratings
## [Helpfulness: 1] (Unhelpful)
**Definition:** The RESPONSE ignores the QUERY, contradicts the CONTEXT, or could not be used at all.

## [Helpfulness: 2] (Slightly Helpful)
**Definition:** The RESPONSE touches on the QUERY but misses most of what was asked or gets key facts from the CONTEXT wrong.

## [Helpfulness: 3] (Moderately Helpful)
**Definition:** The RESPONSE addresses the main request but leaves parts unanswered or needs noticeable editing before use.

## [Helpfulness: 4] (Helpful)
**Definition:** The RESPONSE addresses all requests accurately and follows the instructions, with only minor gaps in detail or tone.

## [Helpfulness: 5] (Very Helpful)
**Definition:** The RESPONSE fully resolves the QUERY, uses the CONTEXT precisely, follows every instruction, and is ready to send.

# Data
QUERY: {{{{query}}}}
CONTEXT: {{{{context}}}}
RESPONSE: {{{{response}}}}

# Tasks
## Please provide your assessment Score for the previous RESPONSE in relation to the QUERY and CONTEXT based on the Definitions above. Your output should include the following information:
- **ThoughtChain**: To improve the reasoning process, think step by step and include a step-by-step explanation of your thought process as you analyze the data based on the definitions. Keep it brief and start your ThoughtChain with "Let's think step by step:".
- **Explanation**: a very short explanation of why you think the input Data should get that Score.
- **Score**: based on your previous analysis, provide your Score. The Score you give MUST be an integer score (i.e., "1", "2"...) based on the levels of the definitions.

## Please provide your answers between the tags: {t0}your chain of thoughts{t1}, {r0}your explanation{r1}, {s0}your Score{s1}.
# Output"#,
            t0 = THOUGHT_TAGS.0,
            t1 = THOUGHT_TAGS.1,
            r0 = REASON_TAGS.0,
            r1 = REASON_TAGS.1,
            s0 = SCORE_TAGS.0,
            s1 = SCORE_TAGS.1,
        );

        Self {
            name: "helpfulness".to_string(),
            system,
            user,
            parameters: ChatParameters {
                temperature: Some(0.0),
                max_tokens: Some(800),
                top_p: Some(1.0),
                presence_penalty: Some(0.0),
                frequency_penalty: Some(0.0),
            },
        }
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

fn fill(template: &str, inputs: &EvalInputs) -> String {
    placeholder_pattern()
        .replace_all(template, |caps: &Captures| {
            inputs.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpfulness_placeholders() {
        let template = PromptTemplate::helpfulness();
        assert_eq!(template.placeholders(), vec!["query", "context", "response"]);
        assert!(template.user.contains("<S1>your explanation</S1>"));
        assert!(template.user.contains("<S2>your Score</S2>"));
        assert_eq!(template.parameters.temperature, Some(0.0));
    }

    #[test]
    fn test_render_substitutes_inputs() {
        let template = PromptTemplate::helpfulness();
        let inputs = EvalInputs::new()
            .with("query", "Can you resend the invoice?")
            .with("context", "Invoice #42 was sent on May 3")
            .with("response", "Sure, attached again.");

        let messages = template.render(&inputs);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("QUERY: Can you resend the invoice?"));
        assert!(messages[1].content.contains("RESPONSE: Sure, attached again."));
        assert!(!messages[1].content.contains("{{"));
    }

    #[test]
    fn test_inputs_are_not_re_expanded() {
        let template = PromptTemplate {
            name: "echo".to_string(),
            system: String::new(),
            user: "Q={{ query }} C={{context}} X={{missing}}".to_string(),
            parameters: ChatParameters::default(),
        };
        let inputs = EvalInputs::new()
            .with("query", "{{context}}")
            .with("context", "inbox");

        let messages = template.render(&inputs);
        assert_eq!(messages[1].content, "Q={{context}} C=inbox X=");
    }
}
