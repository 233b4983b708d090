//! Content loading under concurrency: one generation per key, shared
//! outcomes, and distinct setup errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lingua_core::model::{Catalog, LanguageCode, LevelId, Phrase, Question, SublevelId};
use lingua_core::time::fixed_clock;
use services::{
    AiGenerator, ContentError, ContentService, GenerationRequest, GeneratorError,
    QuestionGenerator,
};
use storage::InMemoryRepository;
use tokio::sync::Notify;

/// Parks every generation on a gate so tests control when the in-flight
/// request finishes.
struct GatedGenerator {
    calls: AtomicUsize,
    gate: Notify,
    outcome: Result<Vec<Question>, GeneratorError>,
}

impl GatedGenerator {
    fn new(outcome: Result<Vec<Question>, GeneratorError>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            outcome,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl QuestionGenerator for GatedGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<Vec<Question>, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.outcome.clone()
    }
}

fn sample_questions() -> Vec<Question> {
    let phrase = |text: &str, gloss: &str| Phrase::new(text, gloss).expect("phrase");
    vec![
        Question::flashcard(phrase("hola", "hello"), phrase("adios", "goodbye")),
        Question::fill_blank(phrase("yo ___ pan", "I eat bread"), phrase("como", "eat")),
    ]
}

fn service(generator: Arc<dyn QuestionGenerator>) -> Arc<ContentService> {
    Arc::new(
        ContentService::new(
            Arc::new(Catalog::bundled()),
            Arc::new(InMemoryRepository::new()),
            generator,
        )
        .with_clock(fixed_clock()),
    )
}

fn code(raw: &str) -> LanguageCode {
    raw.parse().expect("language code")
}

fn level(raw: &str) -> LevelId {
    raw.parse().expect("level id")
}

fn sub(raw: &str) -> SublevelId {
    raw.parse().expect("sublevel id")
}

fn spawn_load(
    service: &Arc<ContentService>,
) -> tokio::task::JoinHandle<Result<Vec<Question>, ContentError>> {
    let service = Arc::clone(service);
    tokio::spawn(async move {
        let language = code("es");
        let level = level("level-1");
        let sublevel = sub("foundation-vocab");
        service.load_or_generate(&language, &level, &sublevel).await
    })
}

async fn wait_for_calls(generator: &GatedGenerator, count: usize) {
    for _ in 0..1000 {
        if generator.calls() >= count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("generator never reached {count} calls");
}

#[tokio::test]
async fn concurrent_loads_share_one_generation() {
    let generator = GatedGenerator::new(Ok(sample_questions()));
    let service = service(Arc::clone(&generator) as Arc<dyn QuestionGenerator>);

    let first = spawn_load(&service);
    wait_for_calls(&generator, 1).await;

    let second = spawn_load(&service);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(generator.calls(), 1, "the second load must join the flight");

    generator.release();
    let first = first.await.expect("join").expect("content");
    let second = second.await.expect("join").expect("content");

    assert_eq!(first, second);
    assert_eq!(generator.calls(), 1);

    // The published set is now cached; later loads skip the backend.
    let cached = service
        .load_or_generate(&code("es"), &level("level-1"), &sub("foundation-vocab"))
        .await
        .expect("cached");
    assert_eq!(cached, first);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn waiters_see_the_leaders_failure() {
    let generator = GatedGenerator::new(Err(GeneratorError::HttpStatus(
        reqwest::StatusCode::SERVICE_UNAVAILABLE,
    )));
    let service = service(Arc::clone(&generator) as Arc<dyn QuestionGenerator>);

    let first = spawn_load(&service);
    wait_for_calls(&generator, 1).await;
    let second = spawn_load(&service);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(generator.calls(), 1);

    generator.release();
    for handle in [first, second] {
        let err = handle.await.expect("join").expect_err("should fail");
        assert!(
            matches!(
                err,
                ContentError::Generator(GeneratorError::HttpStatus(status))
                    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE
            ),
            "unexpected error: {err:?}"
        );
    }

    // The failure left nothing cached or in flight, so the next load
    // generates again.
    generator.release();
    let retry = service
        .load_or_generate(&code("es"), &level("level-1"), &sub("foundation-vocab"))
        .await;
    assert!(retry.is_err());
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn distinct_keys_generate_independently() {
    let generator = GatedGenerator::new(Ok(sample_questions()));
    let service = service(Arc::clone(&generator) as Arc<dyn QuestionGenerator>);

    let vocab = spawn_load(&service);
    wait_for_calls(&generator, 1).await;

    let grammar = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let language = code("es");
            let level = level("level-1");
            let sublevel = sub("foundation-grammar");
            service.load_or_generate(&language, &level, &sublevel).await
        })
    };
    wait_for_calls(&generator, 2).await;

    generator.release();
    generator.release();
    vocab.await.expect("join").expect("content");
    grammar.await.expect("join").expect("content");
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn missing_credential_reads_as_a_setup_problem() {
    let service = service(Arc::new(AiGenerator::new(None)));

    let err = service
        .load_or_generate(&code("es"), &level("level-1"), &sub("foundation-vocab"))
        .await
        .expect_err("should fail without a key");
    assert!(matches!(
        err,
        ContentError::Generator(GeneratorError::MissingCredential)
    ));

    // Asking again once a generator is configured succeeds; nothing
    // latched the failure.
    let generator = GatedGenerator::new(Ok(sample_questions()));
    let configured = self::service(Arc::clone(&generator) as Arc<dyn QuestionGenerator>);
    generator.release();
    let questions = configured
        .load_or_generate(&code("es"), &level("level-1"), &sub("foundation-vocab"))
        .await
        .expect("content");
    assert_eq!(questions, sample_questions());
}
