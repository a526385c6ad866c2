use crate::constants::{CLASSIFIER_FORMAT_REMINDER, CLASSIFIER_SYSTEM_PROMPT, INTENT_SCHEMA};
use crate::core::{Intent, IntentAction};
use crate::errors::Error;
use crate::llm::{build_validator, strip_code_fence, validate_response, ChatMessage, LlmClient};
use async_trait::async_trait;
use jsonschema::Validator;
use serde::Deserialize;
use tracing::debug;

/// Turns raw user text into a structured intent
#[async_trait]
pub trait LanguageClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Intent, Error>;
}

/// JSON object the classification model is asked to produce
#[derive(Debug, Deserialize)]
struct IntentResponse {
    action: IntentAction,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    style: Option<String>,
    prompt: String,
    confidence: f64,
    #[serde(default)]
    #[allow(unused)]
    reasoning: Option<String>,
}

/// Classifier backed by a chat model and a JSON schema
#[derive(Debug)]
pub struct LlmIntentClassifier {
    llm_client: LlmClient,
    validator: Validator,
}

impl LlmIntentClassifier {
    pub fn new(llm_client: LlmClient) -> Result<Self, Error> {
        Ok(Self {
            llm_client,
            validator: build_validator(INTENT_SCHEMA)?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a validated classifier answer into an intent
pub fn parse_intent(raw: &str) -> Result<Intent, Error> {
    let parsed: IntentResponse = serde_json::from_str(strip_code_fence(raw))?;
    let confidence = if parsed.confidence.is_finite() {
        parsed.confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Ok(Intent {
        action: parsed.action,
        subject: non_empty(parsed.subject),
        style: non_empty(parsed.style),
        prompt: parsed.prompt.trim().to_string(),
        confidence,
        raw_response: raw.to_string(),
    })
}

#[async_trait]
impl LanguageClassifier for LlmIntentClassifier {
    async fn classify(&self, text: &str) -> Result<Intent, Error> {
        let mut messages = vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_PROMPT),
            ChatMessage::user(text),
        ];
        let response = self
            .llm_client
            .call_llm_with_format_check(
                &mut messages,
                |resp| validate_response(&self.validator, resp).unwrap_or(false),
                CLASSIFIER_FORMAT_REMINDER,
                2,
            )
            .await?;
        debug!("Classifier answer: {}", response);
        parse_intent(&response)
    }
}
