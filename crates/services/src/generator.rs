use async_trait::async_trait;
use lingua_core::model::{AppSettings, LanguageCode, Question};
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";

const TEMPERATURE: f32 = 0.6;
const MAX_OUTPUT_TOKENS: u32 = 2500;

//
// ─── CONFIG ──────────────────────────────────────────────────────────────────
//

/// Connection settings for the question backend. The API key is kept out
/// of `Debug` output and is never logged.
#[derive(Clone)]
pub struct AiConfig {
    base_url: String,
    api_key: String,
    model: String,
}

impl AiConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reads `LINGUA_AI_API_KEY`, `LINGUA_AI_BASE_URL` and
    /// `LINGUA_AI_MODEL`. Returns `None` when no key is set, which keeps
    /// the generator disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let mut config = Self::new(non_empty_env("LINGUA_AI_API_KEY")?);
        if let Some(base_url) = non_empty_env("LINGUA_AI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(model) = non_empty_env("LINGUA_AI_MODEL") {
            config.model = model;
        }
        Some(config)
    }

    /// Builds a config from stored settings, falling back to the default
    /// endpoint and model. Returns `None` when no key is stored.
    #[must_use]
    pub fn from_settings(settings: &AppSettings) -> Option<Self> {
        let mut config = Self::new(settings.ai_api_key()?);
        if let Some(base_url) = settings.ai_base_url() {
            config.base_url = base_url.to_owned();
        }
        if let Some(model) = settings.ai_model() {
            config.model = model.to_owned();
        }
        Some(config)
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

//
// ─── REQUESTS ────────────────────────────────────────────────────────────────
//

/// What to generate questions for. The display name and titles come from
/// the catalog; the proficiency band is inferred from the level title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub language: LanguageCode,
    pub language_name: String,
    pub level_title: String,
    pub sublevel_title: String,
}

impl GenerationRequest {
    #[must_use]
    pub fn cefr_level(&self) -> &'static str {
        infer_cefr_level(&self.level_title)
    }
}

/// Maps a level title to the CEFR band named in the prompt. Checks are
/// ordered, so a title matching an earlier keyword wins.
fn infer_cefr_level(level_title: &str) -> &'static str {
    let title = level_title.to_lowercase();
    if title.contains("foundation") || title.contains("basic") {
        "A1-A2"
    } else if title.contains("builder") || title.contains("core") {
        "B1"
    } else if title.contains("conversation") || title.contains("usage") {
        "B2"
    } else if title.contains("advanced") || title.contains("real-world") {
        "C1-C2"
    } else {
        "A1-B2"
    }
}

fn build_prompt(request: &GenerationRequest) -> String {
    let language_name = &request.language_name;
    format!(
        r#"You are a native {language_name} language teacher.

Generate ORIGINAL practice content in {language_name}.
Also generate ACCURATE English translations.

STRICT RULES:
- Original text: {language_name} ONLY
- Translation: English ONLY
- JSON ONLY

Schemas:

MCQ:
{{
  "type": "mcq",
  "question": {{ "text": "...", "en": "..." }},
  "options": [{{ "text": "...", "en": "..." }}],
  "correctIndex": 0
}}

Flashcard:
{{
  "type": "flashcard",
  "front": {{ "text": "...", "en": "..." }},
  "back": {{ "text": "...", "en": "..." }}
}}

Fill blank:
{{
  "type": "fill_blank",
  "sentence": {{ "text": "... ___ ...", "en": "..." }},
  "answer": {{ "text": "...", "en": "..." }}
}}

Level: {level}
CEFR: {cefr}
Sublevel: {sublevel}

Return ONLY a valid JSON array.
Do NOT truncate.
Ensure the JSON is complete and properly closed.
"#,
        level = request.level_title,
        cefr = request.cefr_level(),
        sublevel = request.sublevel_title,
    )
}

//
// ─── WIRE TYPES ──────────────────────────────────────────────────────────────
//

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

//
// ─── GENERATOR ───────────────────────────────────────────────────────────────
//

/// Source of generated question sets.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce a fresh question set for the request.
    ///
    /// # Errors
    ///
    /// Returns `GeneratorError` when the backend is not configured,
    /// unreachable, or answers with an unusable payload.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Question>, GeneratorError>;
}

/// Question generation over the Gemini `generateContent` endpoint.
///
/// A malformed payload is requested again exactly once; every other
/// failure is returned as-is.
pub struct AiGenerator {
    client: reqwest::Client,
    config: Option<AiConfig>,
}

impl AiGenerator {
    #[must_use]
    pub fn new(config: Option<AiConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiConfig::from_env())
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn request_questions(
        &self,
        config: &AiConfig,
        prompt: &str,
    ) -> Result<Vec<Question>, GeneratorError> {
        let url = format!(
            "{}/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        let payload = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", config.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|err| GeneratorError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeneratorError::HttpStatus(status));
        }
        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|_| GeneratorError::MalformedResponse)?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or(GeneratorError::EmptyResponse)?;
        parse_questions(&text)
    }
}

#[async_trait]
impl QuestionGenerator for AiGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<Question>, GeneratorError> {
        let config = self
            .config
            .as_ref()
            .ok_or(GeneratorError::MissingCredential)?;
        let prompt = build_prompt(request);

        match self.request_questions(config, &prompt).await {
            Err(GeneratorError::MalformedResponse) => {
                tracing::warn!(
                    language = %request.language,
                    sublevel = %request.sublevel_title,
                    "generated payload was malformed, retrying once"
                );
                self.request_questions(config, &prompt).await
            }
            result => result,
        }
    }
}

impl std::fmt::Debug for AiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiGenerator")
            .field("enabled", &self.enabled())
            .finish_non_exhaustive()
    }
}

//
// ─── PAYLOAD PARSING ─────────────────────────────────────────────────────────
//

/// The span from the first `[` to the last `]`, which tolerates prose or
/// markdown fences around the array.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

fn parse_questions(raw: &str) -> Result<Vec<Question>, GeneratorError> {
    let slice = extract_json_array(raw).ok_or(GeneratorError::MalformedResponse)?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(slice).map_err(|_| GeneratorError::MalformedResponse)?;

    let mut questions = Vec::new();
    let mut dropped = 0usize;
    for entry in entries {
        match serde_json::from_value::<Question>(entry) {
            Ok(question) if question.validate().is_ok() => questions.push(question),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "dropped generated questions that failed validation");
    }
    if questions.is_empty() {
        return Err(GeneratorError::EmptyResponse);
    }
    Ok(questions)
}
