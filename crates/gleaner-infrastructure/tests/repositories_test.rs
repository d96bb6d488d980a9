use gleaner_core::knowledge::{EntryDraft, KnowledgeEntry, KnowledgeRecord, KnowledgeRepository};
use gleaner_core::search::{EmbeddingSearchClient, SimilarityQuery};
use gleaner_core::session::{Session, SessionMetadata, SessionRepository, SessionStatus};
use gleaner_infrastructure::{
    AsyncDirKnowledgeRepository, AsyncDirSessionRepository, InMemoryKnowledgeRepository,
    InMemorySessionRepository, LocalEmbeddingSearch,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn record(title: &str, content: &str, session_id: &str, domain: &str) -> KnowledgeRecord {
    let mut structured_data = serde_json::Map::new();
    structured_data.insert("period".to_string(), json!("18th century"));
    KnowledgeRecord {
        entry: KnowledgeEntry::from_draft(EntryDraft {
            category_id: "history".to_string(),
            title: title.to_string(),
            content: content.to_string(),
            structured_data,
            ..Default::default()
        }),
        session_id: session_id.to_string(),
        domain_name: domain.to_string(),
    }
}

fn session_with_updated_at(updated_at: &str) -> Session {
    let mut session = Session::new(SessionMetadata::new("village", "archivist"));
    session.updated_at = updated_at.to_string();
    session
}

#[tokio::test]
async fn test_dir_session_repository_persists_across_instances() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");

    let mut session = Session::new(SessionMetadata::new("village", "archivist"));
    {
        let repo = AsyncDirSessionRepository::new(&dir).await.unwrap();
        repo.save(&session).await.unwrap();
        session.status = SessionStatus::Complete;
        repo.save(&session).await.unwrap();
    }

    let reopened = AsyncDirSessionRepository::new(&dir).await.unwrap();
    let loaded = reopened.find_by_id(&session.id).await.unwrap().unwrap();
    assert_eq!(loaded, session);
    assert_eq!(loaded.status, SessionStatus::Complete);

    reopened.delete(&session.id).await.unwrap();
    assert!(reopened.find_by_id(&session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_listing_is_most_recent_first() {
    let temp = TempDir::new().unwrap();
    let dir_repo = AsyncDirSessionRepository::new(temp.path()).await.unwrap();
    let memory_repo = InMemorySessionRepository::new();

    let older = session_with_updated_at("2026-01-01T00:00:00+00:00");
    let newer = session_with_updated_at("2026-02-01T00:00:00+00:00");

    let repos: [&dyn SessionRepository; 2] = [&dir_repo, &memory_repo];
    for repo in repos {
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();
        let ids: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![newer.id.clone(), older.id.clone()]);
    }
}

#[tokio::test]
async fn test_knowledge_repositories_filter_by_session_and_domain() {
    let temp = TempDir::new().unwrap();
    let dir_repo = AsyncDirKnowledgeRepository::new(temp.path()).await.unwrap();
    let memory_repo = InMemoryKnowledgeRepository::new();

    let church = record("Old church", "Built in 1732", "s1", "village");
    let mill = record("Water mill", "Ran until 1950", "s2", "village");
    let salmon = record("Salmon run", "Every autumn", "s1", "river");

    let repos: [&dyn KnowledgeRepository; 2] = [&dir_repo, &memory_repo];
    for repo in repos {
        for r in [&church, &mill, &salmon] {
            repo.save(r).await.unwrap();
        }

        let by_session = repo.list_by_session("s1").await.unwrap();
        assert_eq!(by_session.len(), 2);
        assert!(by_session.iter().all(|r| r.session_id == "s1"));

        let by_domain = repo.list_by_domain("village").await.unwrap();
        assert_eq!(by_domain.len(), 2);
        assert!(by_domain.iter().all(|r| r.domain_name == "village"));

        let found = repo.find_by_id(&mill.entry.id).await.unwrap().unwrap();
        assert_eq!(found, mill);
    }
}

#[tokio::test]
async fn test_saving_same_entry_replaces_record() {
    let temp = TempDir::new().unwrap();
    let dir_repo = AsyncDirKnowledgeRepository::new(temp.path()).await.unwrap();
    let memory_repo = InMemoryKnowledgeRepository::new();

    let repos: [&dyn KnowledgeRepository; 2] = [&dir_repo, &memory_repo];
    for repo in repos {
        let mut church = record("Old church", "Built in 1732", "s1", "village");
        repo.save(&church).await.unwrap();

        church.entry.title = "The old church".to_string();
        repo.save(&church).await.unwrap();

        let listed = repo.list_by_session("s1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].entry.title, "The old church");
    }
}

#[tokio::test]
async fn test_sessions_and_knowledge_share_a_base_directory() {
    let temp = TempDir::new().unwrap();
    let sessions = AsyncDirSessionRepository::new(temp.path()).await.unwrap();
    let knowledge = AsyncDirKnowledgeRepository::new(temp.path()).await.unwrap();

    let session = Session::new(SessionMetadata::new("village", "archivist"));
    let church = record("Old church", "Built in 1732", &session.id, "village");
    sessions.save(&session).await.unwrap();
    knowledge.save(&church).await.unwrap();

    assert_eq!(sessions.list_all().await.unwrap().len(), 1);
    assert_eq!(knowledge.list_by_domain("village").await.unwrap(), vec![church]);
}

#[tokio::test]
async fn test_local_search_ranks_within_domain() {
    let knowledge = Arc::new(InMemoryKnowledgeRepository::new());
    knowledge
        .save(&record("Old church", "The old church was built in 1732", "s1", "village"))
        .await
        .unwrap();
    knowledge
        .save(&record("Water mill", "The mill ground grain for two villages", "s2", "village"))
        .await
        .unwrap();
    knowledge
        .save(&record("Old church", "The old church was built in 1732", "s3", "other"))
        .await
        .unwrap();

    let search = LocalEmbeddingSearch::new(knowledge.clone()).with_min_similarity(0.0);
    let vector = search.embed("When was the old church built?").await.unwrap();
    let hits = search
        .search_similar(SimilarityQuery {
            domain_id: "village".to_string(),
            vector,
            limit: 5,
            exclude_session_id: None,
        })
        .await
        .unwrap();

    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.session_id != "s3"));
    assert_eq!(hits[0].entry.title, "Old church");
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_local_search_applies_threshold_limit_and_exclusion() {
    let knowledge = Arc::new(InMemoryKnowledgeRepository::new());
    for (i, session) in ["s1", "s2", "s3"].iter().enumerate() {
        knowledge
            .save(&record(
                &format!("Old church {i}"),
                "The old church was built in 1732",
                session,
                "village",
            ))
            .await
            .unwrap();
    }
    knowledge
        .save(&record("Salmon", "Salmon migrate upstream", "s4", "village"))
        .await
        .unwrap();

    let search = LocalEmbeddingSearch::new(knowledge.clone()).with_min_similarity(0.5);
    let vector = search.embed("The old church was built in 1732").await.unwrap();

    let hits = search
        .search_similar(SimilarityQuery {
            domain_id: "village".to_string(),
            vector: vector.clone(),
            limit: 10,
            exclude_session_id: Some("s1".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|h| h.session_id != "s1" && h.session_id != "s4"));
    assert!(hits.iter().all(|h| h.score >= 0.5));

    let limited = search
        .search_similar(SimilarityQuery {
            domain_id: "village".to_string(),
            vector,
            limit: 1,
            exclude_session_id: None,
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}
