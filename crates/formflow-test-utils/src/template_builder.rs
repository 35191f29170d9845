// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fluent builder for form templates in tests.

use formflow_core::types::{
    ActionDescriptor, AgentRole, Block, ChoiceOption, FormTemplate, Question, QuestionType,
    VisibilityCondition,
};

/// Builds a [`FormTemplate`] question by question.
///
/// ```
/// use formflow_test_utils::TemplateBuilder;
/// use formflow_core::types::QuestionType;
///
/// let template = TemplateBuilder::new("intake")
///     .question("name", "Your name?", QuestionType::Name)
///     .choice("city", "Which city?", &[("Santiago", "scl"), ("Valparaiso", "vap")])
///     .build();
/// assert_eq!(template.questions.len(), 2);
/// ```
pub struct TemplateBuilder {
    code: String,
    name: String,
    blocks: Vec<Block>,
    questions: Vec<Question>,
    current_block: String,
}

impl TemplateBuilder {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            blocks: Vec::new(),
            questions: Vec::new(),
            current_block: "default".to_string(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Start a new block; questions added afterwards belong to it.
    pub fn block(mut self, id: &str, name: &str) -> Self {
        let mut block = Block::new(id);
        block.name = name.to_string();
        self.blocks.push(block);
        self.current_block = id.to_string();
        self
    }

    /// Attach an on-complete action to the most recently declared block.
    pub fn on_complete(mut self, endpoint: &str, payload: serde_json::Value) -> Self {
        if let Some(block) = self.blocks.last_mut() {
            block.on_complete = Some(ActionDescriptor {
                name: format!("{}-complete", block.id),
                endpoint: Some(endpoint.to_string()),
                method: "POST".to_string(),
                payload,
            });
        }
        self
    }

    pub fn question(mut self, qid: &str, label: &str, qtype: QuestionType) -> Self {
        let mut q = Question::new(qid, label, qtype);
        q.block_id = self.current_block.clone();
        self.questions.push(q);
        self
    }

    pub fn choice(mut self, qid: &str, label: &str, options: &[(&str, &str)]) -> Self {
        let mut q = Question::new(qid, label, QuestionType::SingleChoice);
        q.block_id = self.current_block.clone();
        q.options = options
            .iter()
            .map(|(l, v)| ChoiceOption::new(*l, *v))
            .collect();
        self.questions.push(q);
        self
    }

    /// Make the last added question conditional.
    pub fn show_if(mut self, qid: &str, equals: &str) -> Self {
        if let Some(q) = self.questions.last_mut() {
            q.show_if = Some(VisibilityCondition {
                qid: qid.to_string(),
                equals: equals.to_string(),
            });
        }
        self
    }

    /// Make the last added question optional.
    pub fn optional(mut self) -> Self {
        if let Some(q) = self.questions.last_mut() {
            q.required = false;
        }
        self
    }

    /// Flag the last added question for risk evaluation.
    pub fn risk_checked(mut self) -> Self {
        if let Some(q) = self.questions.last_mut() {
            q.behavior.risk_check = true;
        }
        self
    }

    /// Flag the last added question as requiring evidence.
    pub fn with_evidence(mut self) -> Self {
        if let Some(q) = self.questions.last_mut() {
            q.behavior.requires_evidence = true;
        }
        self
    }

    /// Attribute the last added question to a specific agent.
    pub fn agent(mut self, agent: AgentRole) -> Self {
        if let Some(q) = self.questions.last_mut() {
            q.behavior.agent = Some(agent);
        }
        self
    }

    /// Build, panicking on authoring errors (tests own their templates).
    pub fn build(self) -> FormTemplate {
        FormTemplate::new(self.code, self.name, 1, self.questions, self.blocks)
            .expect("invalid test template")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_blocks_in_order() {
        let template = TemplateBuilder::new("t")
            .block("a", "Block A")
            .question("q1", "Q1?", QuestionType::Text)
            .block("b", "Block B")
            .question("q2", "Q2?", QuestionType::Text)
            .build();
        assert_eq!(template.questions[0].block_id, "a");
        assert_eq!(template.questions[1].block_id, "b");
        assert_eq!(template.build_blocks().len(), 2);
    }

    #[test]
    fn on_complete_lands_on_last_block() {
        let template = TemplateBuilder::new("t")
            .block("a", "Block A")
            .on_complete("https://example.test/hook", serde_json::json!({"x": 1}))
            .question("q1", "Q1?", QuestionType::Text)
            .build();
        let block = &template.build_blocks()[0];
        assert_eq!(
            block.on_complete.as_ref().unwrap().endpoint.as_deref(),
            Some("https://example.test/hook")
        );
    }
}
