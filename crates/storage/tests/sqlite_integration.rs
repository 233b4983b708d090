use lingua_core::model::{
    AppSettingsDraft, LanguageCode, LevelId, Phrase, Question, SublevelId, Theme,
};
use lingua_core::time::fixed_now;
use sqlx::Row;
use storage::repository::{
    ContentCacheRepository, ProgressRepository, SettingsRepository, SkillRecord, SublevelRecord,
};
use storage::sqlite::SqliteRepository;

fn language(code: &str) -> LanguageCode {
    LanguageCode::new(code).unwrap()
}

fn build_record(level: &str, sublevel: &str, completed: bool, score: u8) -> SublevelRecord {
    SublevelRecord {
        level_id: LevelId::new(level).unwrap(),
        sublevel_id: SublevelId::new(sublevel).unwrap(),
        completed,
        best_score: score,
        attempts: 1,
        last_attempt: fixed_now(),
    }
}

fn build_questions() -> Vec<Question> {
    vec![
        Question::fill_blank(
            Phrase::new("___ means hello", "greeting").unwrap(),
            Phrase::new("Hola", "hello").unwrap(),
        ),
        Question::flashcard(
            Phrase::new("gato", "cat").unwrap(),
            Phrase::new("cat", "cat").unwrap(),
        ),
    ]
}

#[tokio::test]
async fn sqlite_roundtrip_persists_progress() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_progress?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    repo.upsert_sublevel(&es, &build_record("level-1", "foundation-vocab", true, 90))
        .await
        .unwrap();
    repo.upsert_sublevel(&es, &build_record("level-1", "foundation-grammar", false, 55))
        .await
        .unwrap();
    repo.upsert_skill(
        &es,
        &SkillRecord {
            skill: "grammar".into(),
            attempts: 4,
            accuracy_total: 300,
        },
    )
    .await
    .unwrap();
    repo.set_xp(&es, 130).await.unwrap();

    let progress = repo.load_language(&es).await.unwrap();
    let level = LevelId::new("level-1").unwrap();

    let vocab = progress
        .sublevel(&level, &SublevelId::new("foundation-vocab").unwrap())
        .unwrap();
    assert!(vocab.is_completed());
    assert_eq!(vocab.best_score(), 90);
    assert_eq!(vocab.last_attempt(), fixed_now());

    let grammar = progress
        .sublevel(&level, &SublevelId::new("foundation-grammar").unwrap())
        .unwrap();
    assert!(!grammar.is_completed());
    assert_eq!(grammar.best_score(), 55);

    assert_eq!(progress.skill_accuracy("grammar"), Some(75));
    assert_eq!(progress.xp(), 130);
}

#[tokio::test]
async fn sqlite_upsert_replaces_the_existing_record() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_upsert?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    repo.upsert_sublevel(&es, &build_record("level-1", "a", false, 60))
        .await
        .unwrap();

    let mut improved = build_record("level-1", "a", true, 95);
    improved.attempts = 2;
    repo.upsert_sublevel(&es, &improved).await.unwrap();

    let progress = repo.load_language(&es).await.unwrap();
    let record = progress
        .sublevel(
            &LevelId::new("level-1").unwrap(),
            &SublevelId::new("a").unwrap(),
        )
        .unwrap();
    assert!(record.is_completed());
    assert_eq!(record.best_score(), 95);
    assert_eq!(record.attempts(), 2);
}

#[tokio::test]
async fn sqlite_clear_language_is_scoped() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    let fr = language("fr");
    repo.upsert_sublevel(&es, &build_record("level-1", "a", true, 80))
        .await
        .unwrap();
    repo.set_xp(&es, 40).await.unwrap();
    repo.upsert_sublevel(&fr, &build_record("level-1", "a", true, 70))
        .await
        .unwrap();
    repo.set_xp(&fr, 90).await.unwrap();

    ProgressRepository::clear_language(&repo, &es).await.unwrap();

    let es_progress = repo.load_language(&es).await.unwrap();
    assert_eq!(es_progress.xp(), 0);
    assert_eq!(es_progress.completed_sublevel_count(), 0);

    let fr_progress = repo.load_language(&fr).await.unwrap();
    assert_eq!(fr_progress.xp(), 90);
    assert_eq!(fr_progress.completed_sublevel_count(), 1);
}

#[tokio::test]
async fn sqlite_cache_roundtrip_and_remove() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_cache?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    let sub = SublevelId::new("foundation-vocab").unwrap();
    let questions = build_questions();

    assert!(repo.get(&es, &sub).await.unwrap().is_none());
    repo.set(&es, &sub, &questions, fixed_now()).await.unwrap();
    assert_eq!(repo.get(&es, &sub).await.unwrap().unwrap(), questions);

    repo.remove(&es, &sub).await.unwrap();
    assert!(repo.get(&es, &sub).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_cache_evicts_malformed_payloads() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_malformed?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    let sub = SublevelId::new("foundation-vocab").unwrap();

    // Simulate a payload from an older build that no longer decodes.
    sqlx::query(
        "INSERT INTO content_cache (language, sublevel_id, payload, generated_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(es.as_str())
    .bind(sub.as_str())
    .bind("{not json")
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    assert!(repo.get(&es, &sub).await.unwrap().is_none());

    let row = sqlx::query("SELECT COUNT(*) AS n FROM content_cache")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(row.try_get::<i64, _>("n").unwrap(), 0);
}

#[tokio::test]
async fn sqlite_cache_rejects_structurally_invalid_questions() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_invalid?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let es = language("es");
    let sub = SublevelId::new("foundation-vocab").unwrap();

    // Valid JSON, but the correct index points outside the options.
    let payload = r#"[{
        "type": "mcq",
        "question": {"text": "uno", "en": "one"},
        "options": [{"text": "a", "en": "a"}, {"text": "b", "en": "b"}],
        "correctIndex": 9
    }]"#;
    sqlx::query(
        "INSERT INTO content_cache (language, sublevel_id, payload, generated_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(es.as_str())
    .bind(sub.as_str())
    .bind(payload)
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    assert!(repo.get(&es, &sub).await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_settings_roundtrip() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_settings?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert!(repo.get_settings().await.unwrap().is_none());

    let settings = AppSettingsDraft {
        selected_language: Some("es".into()),
        theme: Theme::Dark,
        ai_api_key: Some("test-key".into()),
        ai_model: None,
        ai_base_url: None,
    }
    .validate()
    .unwrap();
    repo.save_settings(&settings).await.unwrap();

    let loaded = repo.get_settings().await.unwrap().unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.theme(), Theme::Dark);
    assert_eq!(loaded.ai_api_key(), Some("test-key"));
}
