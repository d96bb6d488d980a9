use crate::app::{self, AppPaths};
use anyhow::Result;
use colored::Colorize;
use gleaner_core::session::SessionRepository;

pub async fn run(paths: &AppPaths) -> Result<()> {
    let stores = app::open_stores(paths).await?;
    let sessions = stores.sessions.list_all().await?;

    if sessions.is_empty() {
        println!("{}", "No sessions yet.".bright_black());
        return Ok(());
    }
    for session in sessions {
        let title = session
            .current_entry
            .as_ref()
            .map_or("-", |entry| entry.title.as_str());
        println!(
            "{}  {:<9} {:>3} turns  {}/{}  {}",
            session.id.bold(),
            session.status.to_string(),
            session.turns.len(),
            session.domain_config_name,
            session.persona_config_name,
            title
        );
    }
    Ok(())
}
