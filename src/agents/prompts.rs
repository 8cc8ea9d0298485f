//! Decision prompt templates
//!
//! Templates are plain text with `{{ name }}` placeholders. They are built once
//! and handed to the decision agent, so tests can substitute their own.

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;

const DECIDE_TEMPLATE: &str = include_str!("../../prompts/decide.tmpl");
const AGENT_ANSWER_TEMPLATE: &str = include_str!("../../prompts/agent_answer.tmpl");

pub const DECIDE_FILE: &str = "decide.tmpl";
pub const AGENT_ANSWER_FILE: &str = "agent_answer.tmpl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read template {}: {}", path.display(), e))
        })?;
        if source.trim().is_empty() {
            return Err(Error::Config(format!("Template {} is empty", path.display())));
        }
        Ok(Self::new(source))
    }

    /// Substitute placeholders; unknown names render as empty text
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            out.push_str(&rest[..start]);

            let key = rest[start + 2..start + 2 + len].trim();
            match vars.iter().find(|(name, _)| *name == key) {
                Some((_, value)) => out.push_str(value),
                None => tracing::debug!("[PromptTemplate] No value for '{}'", key),
            }
            rest = &rest[start + 2 + len + 2..];
        }

        out.push_str(rest);
        out
    }
}

/// The two templates the decision agent renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplates {
    pub decide: PromptTemplate,
    pub agent_answer: PromptTemplate,
}

impl PromptTemplates {
    pub fn new(decide: PromptTemplate, agent_answer: PromptTemplate) -> Self {
        Self {
            decide,
            agent_answer,
        }
    }

    /// Load `decide.tmpl` and `agent_answer.tmpl` from a directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Ok(Self::new(
            PromptTemplate::from_file(&dir.join(DECIDE_FILE))?,
            PromptTemplate::from_file(&dir.join(AGENT_ANSWER_FILE))?,
        ))
    }

    pub fn render_decision(
        &self,
        question: &str,
        agents_prompt: &str,
        call_agent_prompt: &str,
    ) -> String {
        self.decide.render(&[
            ("question", question),
            ("agents_prompt", agents_prompt),
            ("call_agent_prompt", call_agent_prompt),
        ])
    }

    /// History fragment; a blank placeholder when nothing has been called yet
    pub fn render_called_agents(&self, called_agents: Option<&[Value]>) -> String {
        match called_agents {
            Some(called) if !called.is_empty() => {
                let history = called
                    .iter()
                    .map(|entry| format!("- {}", entry))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.agent_answer.render(&[("called_agents", &history)])
            }
            _ => " ".to_string(),
        }
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::new(
            PromptTemplate::new(DECIDE_TEMPLATE),
            PromptTemplate::new(AGENT_ANSWER_TEMPLATE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_substitutes_placeholders() {
        let template = PromptTemplate::new("Q: {{ question }} / {{agents}} / {{ missing }}!");
        let rendered = template.render(&[("question", "why?"), ("agents", "A, B")]);

        assert_eq!(rendered, "Q: why? / A, B / !");
    }

    #[test]
    fn test_unterminated_placeholder_is_literal() {
        let template = PromptTemplate::new("keep {{ this");
        assert_eq!(template.render(&[("this", "x")]), "keep {{ this");
    }

    #[test]
    fn test_no_history_is_blank_placeholder() {
        let templates = PromptTemplates::default();

        assert_eq!(templates.render_called_agents(None), " ");
        assert_eq!(templates.render_called_agents(Some(&[][..])), " ");
    }

    #[test]
    fn test_history_is_embedded() {
        let templates = PromptTemplates::new(
            PromptTemplate::new("{{ question }}|{{ agents_prompt }}|{{ call_agent_prompt }}"),
            PromptTemplate::new("called:\n{{ called_agents }}"),
        );
        let history = [json!({"name": "weather", "answer": "sunny"})];

        let fragment = templates.render_called_agents(Some(&history[..]));
        let prompt = templates.render_decision("q", "agents", &fragment);

        assert_eq!(fragment, "called:\n- {\"answer\":\"sunny\",\"name\":\"weather\"}");
        assert!(prompt.starts_with("q|agents|called:"));
    }

    #[test]
    fn test_default_templates_reference_every_input() {
        let templates = PromptTemplates::default();
        let prompt = templates.render_decision("QUESTION", "AGENTS", "HISTORY");

        assert!(prompt.contains("QUESTION"));
        assert!(prompt.contains("AGENTS"));
        assert!(prompt.contains("HISTORY"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DECIDE_FILE), "decide {{ question }}").unwrap();
        std::fs::write(dir.path().join(AGENT_ANSWER_FILE), "called {{ called_agents }}").unwrap();

        let templates = PromptTemplates::from_dir(dir.path()).unwrap();

        assert_eq!(templates.render_decision("x", "", ""), "decide x");
    }

    #[test]
    fn test_from_dir_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(PromptTemplates::from_dir(dir.path()), Err(Error::Config(_))));
    }
}
