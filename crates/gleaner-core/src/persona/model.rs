//! Persona domain model.
//!
//! A persona controls how the interviewer sounds: tone, formality and the
//! template used for the opening greeting.

use serde::{Deserialize, Serialize};

/// How formal the persona's replies are.
#[derive(
    Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Formality {
    Casual,
    #[default]
    Neutral,
    Formal,
}

/// Interviewer persona configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    /// Unique persona name (referenced by sessions)
    pub name: String,
    /// Name the persona introduces itself with
    #[serde(default)]
    pub display_name: Option<String>,
    /// Tone of voice (e.g. "warm and curious")
    #[serde(default = "default_tone")]
    pub tone: String,
    /// Formality level
    #[serde(default)]
    pub formality: Formality,
    /// Free-form style guidance added to the responder prompt
    #[serde(default)]
    pub style_notes: String,
    /// Template for the opening greeting.
    ///
    /// Rendered with `persona_name`, `domain_name` and `domain_description`.
    #[serde(default = "default_greeting_template")]
    pub greeting_template: String,
}

impl PersonaConfig {
    /// Name used when the persona speaks about itself.
    pub fn speaker_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

fn default_tone() -> String {
    "warm and curious".to_string()
}

fn default_greeting_template() -> String {
    "Hello! I'm {{ persona_name }}. I'm collecting what people know about \
     {{ domain_description or domain_name }}. What would you like to share first?"
        .to_string()
}
