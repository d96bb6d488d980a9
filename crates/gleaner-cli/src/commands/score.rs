//! Offline completeness scoring of a saved entry.

use crate::app::{self, AppPaths};
use anyhow::{Context, Result};
use colored::Colorize;
use gleaner_core::domain::{ConfigRepository, DomainConfig};
use gleaner_core::knowledge::{KnowledgeEntry, completeness_score};
use std::path::Path;

pub fn run(paths: &AppPaths, entry_path: &Path, domain: &str) -> Result<()> {
    let config = app::load_config(paths)?;
    let domain = config
        .domain(domain)
        .with_context(|| format!("Unknown domain '{domain}'"))?;

    let content = std::fs::read_to_string(entry_path)
        .with_context(|| format!("Cannot read {}", entry_path.display()))?;
    let entry: KnowledgeEntry =
        serde_json::from_str(&content).context("File is not a knowledge entry")?;

    let score = completeness_score(&entry, &domain);
    println!(
        "{} {:.2}",
        format!("{} [{}]", entry.title, entry.category_id).bold(),
        score
    );
    let missing = missing_required(&entry, &domain);
    if !missing.is_empty() {
        println!("{}", format!("missing: {}", missing.join(", ")).yellow());
    }
    Ok(())
}

fn missing_required(entry: &KnowledgeEntry, domain: &DomainConfig) -> Vec<String> {
    domain
        .category(&entry.category_id)
        .map(|category| {
            category
                .required_fields
                .iter()
                .filter(|field| !entry.has_field(field))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
