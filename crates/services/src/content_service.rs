use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lingua_core::Clock;
use lingua_core::model::{Catalog, LanguageCode, LevelId, Question, SublevelId};
use storage::ContentCacheRepository;
use tokio::sync::watch;

use crate::error::{ContentError, GeneratorError};
use crate::generator::{GenerationRequest, QuestionGenerator};

type ContentKey = (LanguageCode, SublevelId);
type FlightOutcome = Result<Vec<Question>, GeneratorError>;
type FlightMap = Mutex<HashMap<ContentKey, watch::Receiver<Option<FlightOutcome>>>>;

enum Flight {
    Lead(watch::Sender<Option<FlightOutcome>>),
    Join(watch::Receiver<Option<FlightOutcome>>),
}

/// Question sets for practice, served from the cache and generated on a
/// miss.
///
/// At most one generation runs per `(language, sublevel)` key. The first
/// caller to miss leads the flight; everyone else arriving for the same
/// key awaits the leader's published outcome, success and failure alike.
pub struct ContentService {
    clock: Clock,
    catalog: Arc<Catalog>,
    cache: Arc<dyn ContentCacheRepository>,
    generator: Arc<dyn QuestionGenerator>,
    in_flight: FlightMap,
}

impl ContentService {
    pub fn new(
        catalog: Arc<Catalog>,
        cache: Arc<dyn ContentCacheRepository>,
        generator: Arc<dyn QuestionGenerator>,
    ) -> Self {
        Self {
            clock: Clock::default(),
            catalog,
            cache,
            generator,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Cached questions for the key, generating and caching them on a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is not in the catalog, the cache
    /// cannot be read, or generation fails.
    pub async fn load_or_generate(
        &self,
        language: &LanguageCode,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
    ) -> Result<Vec<Question>, ContentError> {
        let request = self.build_request(language, level_id, sublevel_id)?;
        if let Some(questions) = self.cache.get(language, sublevel_id).await? {
            tracing::debug!(language = %language, sublevel = %sublevel_id, "content cache hit");
            return Ok(questions);
        }

        let key = (language.clone(), sublevel_id.clone());
        match self.join_or_lead(&key)? {
            Flight::Join(rx) => {
                tracing::debug!(
                    language = %language,
                    sublevel = %sublevel_id,
                    "joining in-flight generation"
                );
                Self::await_in_flight(rx).await
            }
            Flight::Lead(tx) => {
                let _guard = FlightGuard {
                    flights: &self.in_flight,
                    key: &key,
                };
                let outcome = self.run_generation(&request, sublevel_id).await;
                // Publish before the guard clears the key so late joiners
                // holding a receiver still see the value.
                let _ = tx.send(Some(outcome.clone()));
                Ok(outcome?)
            }
        }
    }

    /// Drops any cached set for the key and generates a fresh one.
    ///
    /// A flight already running for the key is joined instead, keeping
    /// the one-generation-per-key invariant.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is not in the catalog, the cache
    /// cannot be written, or generation fails.
    pub async fn regenerate(
        &self,
        language: &LanguageCode,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
    ) -> Result<Vec<Question>, ContentError> {
        self.cache.remove(language, sublevel_id).await?;
        self.load_or_generate(language, level_id, sublevel_id).await
    }

    /// # Errors
    ///
    /// Returns an error when the cache row cannot be deleted.
    pub async fn invalidate(
        &self,
        language: &LanguageCode,
        sublevel_id: &SublevelId,
    ) -> Result<(), ContentError> {
        self.cache.remove(language, sublevel_id).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when the cache rows cannot be deleted.
    pub async fn invalidate_language(
        &self,
        language: &LanguageCode,
    ) -> Result<(), ContentError> {
        self.cache.clear_language(language).await?;
        Ok(())
    }

    fn build_request(
        &self,
        language: &LanguageCode,
        level_id: &LevelId,
        sublevel_id: &SublevelId,
    ) -> Result<GenerationRequest, ContentError> {
        let level = self
            .catalog
            .level(level_id)
            .ok_or_else(|| ContentError::UnknownLevel(level_id.clone()))?;
        let sublevel = level
            .sublevel(sublevel_id)
            .ok_or_else(|| ContentError::UnknownSublevel(sublevel_id.clone()))?;
        let language_name = self
            .catalog
            .language(language)
            .map_or_else(|| "the target language".to_owned(), |l| l.name().to_owned());
        Ok(GenerationRequest {
            language: language.clone(),
            language_name,
            level_title: level.title().to_owned(),
            sublevel_title: sublevel.title().to_owned(),
        })
    }

    fn join_or_lead(&self, key: &ContentKey) -> Result<Flight, ContentError> {
        // A poisoned map means a leader panicked; nothing can be joined.
        let mut pending = self
            .in_flight
            .lock()
            .map_err(|_| ContentError::Interrupted)?;
        if let Some(rx) = pending.get(key) {
            return Ok(Flight::Join(rx.clone()));
        }
        let (tx, rx) = watch::channel(None);
        pending.insert(key.clone(), rx);
        Ok(Flight::Lead(tx))
    }

    async fn run_generation(
        &self,
        request: &GenerationRequest,
        sublevel_id: &SublevelId,
    ) -> FlightOutcome {
        let questions = self.generator.generate(request).await?;
        tracing::info!(
            language = %request.language,
            sublevel = %sublevel_id,
            count = questions.len(),
            "generated question set"
        );
        if let Err(err) = self
            .cache
            .set(&request.language, sublevel_id, &questions, self.clock.now())
            .await
        {
            // The generated set is still usable this round; only the
            // next load will have to regenerate.
            tracing::warn!(
                error = %err,
                language = %request.language,
                sublevel = %sublevel_id,
                "failed to cache generated content"
            );
        }
        Ok(questions)
    }

    async fn await_in_flight(
        mut rx: watch::Receiver<Option<FlightOutcome>>,
    ) -> Result<Vec<Question>, ContentError> {
        let outcome = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ContentError::Interrupted)?
            .clone();
        // `wait_for` only returns once the value is `Some`.
        let outcome = outcome.ok_or(ContentError::Interrupted)?;
        Ok(outcome?)
    }
}

impl std::fmt::Debug for ContentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentService").finish_non_exhaustive()
    }
}

/// Clears the in-flight entry for a key when the leading request
/// finishes, fails, or is dropped mid-generation. A dropped leader
/// closes the channel, which waiters observe as `Interrupted`.
struct FlightGuard<'a> {
    flights: &'a FlightMap,
    key: &'a ContentKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.flights.lock() {
            pending.remove(self.key);
        }
    }
}
