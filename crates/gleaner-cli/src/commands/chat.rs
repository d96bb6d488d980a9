//! Interactive interview REPL.

use crate::app::{self, AppPaths};
use anyhow::{Result, bail};
use colored::Colorize;
use gleaner_application::SessionService;
use gleaner_core::session::{Session, SessionMetadata, SessionResponse};
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow::{self, Borrowed, Owned};

const COMMANDS: &[&str] = &["/end", "/status", "/help", "/quit"];

/// Completes and highlights slash commands.
struct ChatHelper;

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ChatHelper {}

enum Command {
    End,
    Status,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let command = line.strip_prefix('/')?;
    Some(match command.trim() {
        "end" => Command::End,
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    })
}

pub async fn run(
    paths: &AppPaths,
    domain: &str,
    persona: &str,
    resume: Option<&str>,
) -> Result<()> {
    let service = app::session_service(paths).await?;

    println!("{}", "=== Gleaner ===".bright_magenta().bold());
    println!(
        "{}",
        "Share what you know. Commands: /status, /end, /help, /quit".bright_black()
    );
    println!();

    let session_id = match resume {
        Some(id) => {
            let session = service.get_session(id).await?;
            if !session.is_active() {
                bail!("Session {} is already {}", session.id, session.status);
            }
            println!("{}", format!("Resuming session {}", session.id).bright_black());
            print_status(&session);
            session.id
        }
        None => {
            let init = service
                .init_session(SessionMetadata::new(domain, persona))
                .await?;
            println!("{}", format!("Session {}", init.session_id).bright_black());
            for line in init.greeting.lines() {
                println!("{}", line.bright_blue());
            }
            init.session_id
        }
    };

    let mut rl: Editor<ChatHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(ChatHelper));

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match parse_command(trimmed) {
                    Some(Command::Quit) => {
                        println!(
                            "{}",
                            format!("Session {session_id} left open. Resume with --resume.")
                                .bright_green()
                        );
                        break;
                    }
                    Some(Command::End) => {
                        let session = service.end_session(&session_id).await?;
                        println!(
                            "{}",
                            format!("Session {} ({} turns).", session.status, session.turns.len())
                                .bright_green()
                        );
                        break;
                    }
                    Some(Command::Status) => match service.get_session(&session_id).await {
                        Ok(session) => print_status(&session),
                        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
                    },
                    Some(Command::Help) => print_help(),
                    Some(Command::Unknown(other)) => {
                        println!("{}", format!("Unknown command: /{other}").bright_black());
                    }
                    None => take_turn(&service, &session_id, trimmed).await,
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {err:?}").red());
                break;
            }
        }
    }

    Ok(())
}

async fn take_turn(service: &SessionService, session_id: &str, input: &str) {
    match service.continue_session(session_id, input).await {
        Ok(response) => print_response(&response),
        Err(e) if e.is_recoverable() => {
            eprintln!("{}", format!("{e}. Please try again.").yellow());
        }
        Err(e) => eprintln!("{}", format!("Error: {e}").red()),
    }
}

fn print_response(response: &SessionResponse) {
    for line in response.response.lines() {
        println!("{}", line.bright_blue());
    }
    for question in &response.follow_up_questions {
        println!("  {}", format!("? {question}").cyan());
    }

    let category = response.category_id.as_deref().unwrap_or("-");
    let mut footer = format!(
        "[{} / {}] completeness {:.0}%",
        response.intent,
        category,
        response.completeness * 100.0
    );
    if response.is_topic_change {
        footer.push_str(", new topic");
    }
    if response.is_complete {
        footer.push_str(", entry complete (/end to finish)");
    }
    println!("{}", footer.bright_black());
}

fn print_status(session: &Session) {
    println!(
        "{}",
        format!(
            "Session {} ({}), {} turns, domain {}",
            session.id,
            session.status,
            session.turns.len(),
            session.domain_config_name
        )
        .bright_yellow()
    );
    match &session.current_entry {
        Some(entry) => {
            let completeness = session.last_turn().map_or(0.0, |t| t.completeness);
            println!(
                "{}",
                format!(
                    "  {} [{}] completeness {:.0}%",
                    entry.title,
                    entry.category_id,
                    completeness * 100.0
                )
                .yellow()
            );
            for (field, value) in &entry.structured_data {
                println!("    {field}: {value}");
            }
        }
        None => println!("{}", "  No entry collected yet.".yellow()),
    }
}

fn print_help() {
    println!("{}", "/status  show the entry collected so far".bright_black());
    println!("{}", "/end     finish the session".bright_black());
    println!("{}", "/quit    leave without ending the session".bright_black());
}
