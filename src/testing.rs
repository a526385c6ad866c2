//! Deterministic collaborators shared by the unit tests

use crate::artifacts::{ArtifactOptions, ArtifactService};
use crate::core::rag::{NewStyleRecord, SearchOptions, SearchResult, SimilaritySearch, StyleRecord, StyleUpdate};
use crate::core::{Intent, IntentAction};
use crate::errors::Error;
use crate::llm::providers::LlmProvider;
use crate::llm::{Assessment, AssessmentService, ChatMessage, Embedder, LanguageClassifier};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// One dimension per keyword group
const VOCABULARY: &[&[&str]] = &[
    &["cyberpunk", "赛博朋克"],
    &["neon"],
    &["watercolor"],
    &["paint"],
    &["cat"],
    &["anime"],
    &["ink"],
    &["pixel"],
];

/// Bag-of-keywords embedder with hand-checkable similarities
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len()];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            if let Some(dim) = VOCABULARY.iter().position(|aliases| aliases.contains(&token)) {
                vector[dim] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// LLM provider answering from a fixed script
#[derive(Debug)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn call_llm_api(&self, _messages: Vec<ChatMessage>, _json_mode: bool) -> Result<String, Error> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Llm("script exhausted".to_string()))
    }
}

/// Classifier returning a fixed intent or a fixed failure
pub struct ScriptedClassifier {
    intent: Option<Intent>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent: Some(intent),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn generate(prompt: &str, style: Option<&str>, confidence: f64) -> Self {
        Self::new(Intent {
            action: IntentAction::Generate,
            subject: None,
            style: style.map(str::to_string),
            prompt: prompt.to_string(),
            confidence,
            raw_response: "{}".to_string(),
        })
    }

    pub fn unknown() -> Self {
        Self::new(Intent {
            action: IntentAction::Unknown,
            subject: None,
            style: None,
            prompt: String::new(),
            confidence: 0.2,
            raw_response: "{}".to_string(),
        })
    }

    pub fn failing() -> Self {
        Self {
            intent: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageClassifier for ScriptedClassifier {
    async fn classify(&self, _text: &str) -> Result<Intent, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.intent
            .clone()
            .ok_or_else(|| Error::Llm("classifier unavailable".to_string()))
    }
}

/// Artifact backend recording every request
#[derive(Default)]
pub struct CountingArtifacts {
    fail: bool,
    generate_calls: AtomicUsize,
    edit_calls: AtomicUsize,
    requests: Mutex<Vec<(String, u32)>>,
}

impl CountingArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn edit_calls(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn seeds(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }

    fn record(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.requests.lock().unwrap().push((prompt.to_string(), opts.seed));
        if self.fail {
            return Err(Error::Artifact("backend unavailable".to_string()));
        }
        Ok(format!("artifact://{}", opts.seed))
    }
}

#[async_trait]
impl ArtifactService for CountingArtifacts {
    async fn generate(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt, opts)
    }

    async fn edit(&self, prompt: &str, opts: &ArtifactOptions) -> Result<String, Error> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt, opts)
    }
}

/// Assessor returning a fixed verdict
pub struct ScriptedAssessor {
    result: Result<Assessment, String>,
    calls: AtomicUsize,
}

impl ScriptedAssessor {
    pub fn new(result: Result<Assessment, String>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssessmentService for ScriptedAssessor {
    async fn assess(&self, _intent: &Intent, _artifact_ref: &str) -> Result<Assessment, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(Error::Llm)
    }
}

/// Index whose every operation fails
pub struct FailingIndex;

#[async_trait]
impl SimilaritySearch for FailingIndex {
    async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<SearchResult>, Error> {
        Err(Error::Embedding("index offline".to_string()))
    }

    async fn add(&self, _record: NewStyleRecord) -> Result<StyleRecord, Error> {
        Err(Error::Embedding("index offline".to_string()))
    }

    async fn update(&self, id: &str, _update: StyleUpdate) -> Result<StyleRecord, Error> {
        Err(Error::RecordNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        Err(Error::RecordNotFound(id.to_string()))
    }

    async fn get(&self, _id: &str) -> Option<StyleRecord> {
        None
    }

    async fn list(&self) -> Vec<StyleRecord> {
        Vec::new()
    }
}
