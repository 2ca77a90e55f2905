//! Conversation templates
//!
//! A template wraps a raw user prompt into the chat format a given model
//! family expects: system text, role tags, and separators. Templates are
//! looked up by name; `one_shot` is the default every backend falls back to.

use crate::error::{Error, Result};

/// A named conversation-formatting template
#[derive(Debug, Clone, PartialEq)]
pub struct ConvTemplate {
    /// Registry name
    pub name: String,
    /// System text prepended to every conversation
    pub system: String,
    /// Role tags for the user and the assistant
    pub roles: (String, String),
    /// Separator between turns
    pub sep: String,
}

impl ConvTemplate {
    /// Template with a single worked example ahead of the real prompt
    pub fn one_shot() -> Self {
        Self {
            name: "one_shot".to_string(),
            system: "A chat between a curious human and an artificial intelligence assistant. \
                     The assistant gives helpful, detailed, and polite answers."
                .to_string(),
            roles: ("Human".to_string(), "Assistant".to_string()),
            sep: "\n### ".to_string(),
        }
    }

    /// Bare prompt passthrough with newline separators
    pub fn plain() -> Self {
        Self {
            name: "plain".to_string(),
            system: String::new(),
            roles: (String::new(), String::new()),
            sep: "\n".to_string(),
        }
    }

    /// Instruction-style template with [INST] markers
    pub fn llama2() -> Self {
        Self {
            name: "llama2".to_string(),
            system: "You are a helpful, respectful and honest assistant.".to_string(),
            roles: ("[INST]".to_string(), "[/INST]".to_string()),
            sep: " ".to_string(),
        }
    }

    /// Wrap a raw prompt into this template's chat format
    pub fn render(&self, prompt: &str) -> String {
        if self.roles.0.is_empty() {
            return format!("{prompt}{}", self.sep);
        }
        let mut out = String::new();
        if !self.system.is_empty() {
            out.push_str(&self.system);
        }
        out.push_str(&self.sep);
        out.push_str(&self.roles.0);
        out.push_str(": ");
        out.push_str(prompt);
        out.push_str(&self.sep);
        out.push_str(&self.roles.1);
        out.push_str(": ");
        out
    }
}

/// Look up a template by registry name
///
/// # Errors
///
/// Returns `UnknownTemplate` for names outside the registry.
pub fn get_template(name: &str) -> Result<ConvTemplate> {
    match name {
        "one_shot" => Ok(ConvTemplate::one_shot()),
        "plain" => Ok(ConvTemplate::plain()),
        "llama2" => Ok(ConvTemplate::llama2()),
        other => Err(Error::UnknownTemplate(other.to_string())),
    }
}
