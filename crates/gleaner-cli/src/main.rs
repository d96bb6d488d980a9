use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "gleaner")]
#[command(about = "Gleaner - collect structured knowledge through guided conversations", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/gleaner/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for sessions and knowledge (defaults to ~/.local/share/gleaner)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start (or resume) an interview session
    Chat {
        #[arg(long)]
        domain: String,
        #[arg(long)]
        persona: String,
        /// Resume an existing active session instead of starting a new one
        #[arg(long)]
        resume: Option<String>,
    },
    /// Score a knowledge entry JSON file against a domain
    Score {
        entry: PathBuf,
        #[arg(long)]
        domain: String,
    },
    /// Validate the configuration file
    CheckConfig,
    /// List stored sessions, most recent first
    Sessions,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "gleaner=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let paths = app::AppPaths {
        config: cli.config,
        data_dir: cli.data_dir,
    };

    match cli.command {
        Commands::Chat {
            domain,
            persona,
            resume,
        } => commands::chat::run(&paths, &domain, &persona, resume.as_deref()).await?,
        Commands::Score { entry, domain } => commands::score::run(&paths, &entry, &domain)?,
        Commands::CheckConfig => commands::check_config::run(&paths)?,
        Commands::Sessions => commands::sessions::run(&paths).await?,
    }

    Ok(())
}
