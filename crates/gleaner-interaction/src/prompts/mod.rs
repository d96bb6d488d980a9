//! Prompt templates.
//!
//! Step prompts live next to this file as minijinja templates and are
//! compiled once into a shared [`PromptLibrary`].

use crate::gateway::Prompt;
use gleaner_core::domain::DomainConfig;
use gleaner_core::error::{GleanerError, Result};
use gleaner_core::persona::PersonaConfig;
use gleaner_core::pipeline::StepKind;
use minijinja::{Environment, context};
use serde::Serialize;

const TEMPLATES: &[(&str, &str)] = &[
    ("classifier.system", include_str!("classifier.system.j2")),
    ("classifier.user", include_str!("classifier.user.j2")),
    ("gap_reasoner.system", include_str!("gap_reasoner.system.j2")),
    ("gap_reasoner.user", include_str!("gap_reasoner.user.j2")),
    ("persona_responder.system", include_str!("persona_responder.system.j2")),
    ("persona_responder.user", include_str!("persona_responder.user.j2")),
    ("structuring.system", include_str!("structuring.system.j2")),
    ("structuring.user", include_str!("structuring.user.j2")),
];

pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| GleanerError::internal(format!("template {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Renders the system and user prompt of `step`.
    pub fn render_step<S: Serialize>(&self, step: StepKind, ctx: S) -> Result<Prompt> {
        let ctx = minijinja::Value::from_serialize(&ctx);
        Ok(Prompt {
            system_prompt: self.render(&format!("{step}.system"), &ctx)?,
            user_message: self.render(&format!("{step}.user"), &ctx)?,
        })
    }

    /// Renders a persona's greeting template. No model call is involved.
    pub fn render_greeting(&self, persona: &PersonaConfig, domain: &DomainConfig) -> Result<String> {
        let description = (!domain.description.is_empty()).then_some(domain.description.as_str());
        self.env
            .render_str(
                &persona.greeting_template,
                context! {
                    persona_name => persona.speaker_name(),
                    domain_name => &domain.name,
                    domain_description => description,
                },
            )
            .map(|s| s.trim().to_string())
            .map_err(|e| {
                GleanerError::config(format!(
                    "greeting template of persona '{}': {e}",
                    persona.name
                ))
            })
    }

    fn render(&self, name: &str, ctx: &minijinja::Value) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| GleanerError::internal(format!("template {name}: {e}")))?;
        template
            .render(ctx)
            .map(|s| s.trim().to_string())
            .map_err(|e| GleanerError::internal(format!("rendering {name}: {e}")))
    }
}
