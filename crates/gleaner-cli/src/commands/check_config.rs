use crate::app::{self, AppPaths};
use anyhow::{Result, bail};
use colored::Colorize;
use gleaner_interaction::PromptLibrary;

/// Loads the configuration, reports structural problems and renders every
/// persona greeting against every domain.
pub fn run(paths: &AppPaths) -> Result<()> {
    let repository = app::load_config(paths)?;
    let config = repository.config();
    let mut problems = repository.problems();

    let prompts = PromptLibrary::new()?;
    for persona in &config.personas {
        for domain in &config.domains {
            if let Err(e) = prompts.render_greeting(persona, domain) {
                problems.push(e.to_string());
            }
        }
    }

    if let Some(source) = repository.source() {
        println!("{}", format!("Config: {}", source.display()).bright_black());
    }
    for domain in &config.domains {
        println!(
            "domain {} ({} categories)",
            domain.name.bold(),
            domain.categories.len()
        );
    }
    for persona in &config.personas {
        println!("persona {} ({})", persona.name.bold(), persona.speaker_name());
    }

    if problems.is_empty() {
        println!("{}", "Configuration OK".bright_green());
        return Ok(());
    }
    for problem in &problems {
        eprintln!("{}", format!("- {problem}").red());
    }
    bail!("{} configuration problem(s) found", problems.len())
}
