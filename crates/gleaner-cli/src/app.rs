//! Wiring of the concrete collaborators behind the CLI commands.

use anyhow::{Context, Result, bail};
use gleaner_application::{PipelineOrchestrator, SessionService};
use gleaner_core::llm::LanguageModelClient;
use gleaner_core::search::EmbeddingSearchClient;
use gleaner_infrastructure::{
    AsyncDirKnowledgeRepository, AsyncDirSessionRepository, LocalEmbeddingSearch,
    TomlConfigRepository,
};
use gleaner_interaction::steps::PipelineSteps;
use gleaner_interaction::{ClaudeApiClient, ModelGateway, PromptLibrary};
use std::path::PathBuf;
use std::sync::Arc;

/// Location overrides from the command line.
pub struct AppPaths {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

pub fn load_config(paths: &AppPaths) -> Result<TomlConfigRepository> {
    let repository = match &paths.config {
        Some(path) => TomlConfigRepository::load(path),
        None => TomlConfigRepository::default_location(),
    };
    repository.context("Failed to load configuration")
}

pub struct Stores {
    pub sessions: Arc<AsyncDirSessionRepository>,
    pub knowledge: Arc<AsyncDirKnowledgeRepository>,
}

pub async fn open_stores(paths: &AppPaths) -> Result<Stores> {
    let (sessions, knowledge) = match &paths.data_dir {
        Some(dir) => (
            AsyncDirSessionRepository::new(dir).await,
            AsyncDirKnowledgeRepository::new(dir).await,
        ),
        None => (
            AsyncDirSessionRepository::default_location().await,
            AsyncDirKnowledgeRepository::default_location().await,
        ),
    };
    Ok(Stores {
        sessions: Arc::new(sessions.context("Failed to open session store")?),
        knowledge: Arc::new(knowledge.context("Failed to open knowledge store")?),
    })
}

fn model_client(config: &TomlConfigRepository) -> Result<Arc<dyn LanguageModelClient>> {
    let settings = &config.config().model;
    match settings.provider.as_str() {
        "claude" => Ok(Arc::new(ClaudeApiClient::from_settings(settings)?)),
        other => bail!("Unsupported model provider '{other}'"),
    }
}

/// Builds the session service with the model-backed pipeline.
pub async fn session_service(paths: &AppPaths) -> Result<SessionService> {
    let config = load_config(paths)?;
    let stores = open_stores(paths).await?;
    let settings = config.config().clone();

    let gateway = Arc::new(ModelGateway::from_settings(
        model_client(&config)?,
        &settings.gateway,
    ));
    let prompts = Arc::new(PromptLibrary::new()?);
    let search: Arc<dyn EmbeddingSearchClient> = Arc::new(
        LocalEmbeddingSearch::new(stores.knowledge.clone())
            .with_min_similarity(settings.pipeline.min_similarity),
    );
    let steps = PipelineSteps::model_backed(gateway, prompts.clone(), Some(search))?;

    Ok(SessionService::new(
        stores.sessions,
        stores.knowledge,
        Arc::new(config),
        Arc::new(PipelineOrchestrator::new(steps)),
        prompts,
    )
    .with_settings(settings.pipeline, settings.session))
}
