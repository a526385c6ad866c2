use crate::constants::{ASSESSMENT_SCHEMA, ASSESSOR_FORMAT_REMINDER, ASSESSOR_SYSTEM_PROMPT};
use crate::core::Intent;
use crate::errors::Error;
use crate::llm::{build_validator, strip_code_fence, validate_response, ChatMessage, LlmClient};
use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::{json, Value};

/// Loosely-typed verdict returned by an external assessor.
/// The critic validates and coerces every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assessment {
    pub passed: Option<bool>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
}

impl Assessment {
    pub fn from_value(value: &Value) -> Self {
        Self {
            passed: value["passed"].as_bool(),
            score: value["score"].as_f64(),
            feedback: value["feedback"].as_str().map(str::to_string),
            suggestions: value["suggestions"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|s| s.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Scores a produced artifact against the intent
#[async_trait]
pub trait AssessmentService: Send + Sync {
    async fn assess(&self, intent: &Intent, artifact_ref: &str) -> Result<Assessment, Error>;
}

/// Assessor backed by a chat model
#[derive(Debug)]
pub struct LlmAssessor {
    llm_client: LlmClient,
    validator: Validator,
}

impl LlmAssessor {
    pub fn new(llm_client: LlmClient) -> Result<Self, Error> {
        Ok(Self {
            llm_client,
            validator: build_validator(ASSESSMENT_SCHEMA)?,
        })
    }
}

#[async_trait]
impl AssessmentService for LlmAssessor {
    async fn assess(&self, intent: &Intent, artifact_ref: &str) -> Result<Assessment, Error> {
        let request = json!({
            "intent": intent,
            "artifactRef": artifact_ref,
        });
        let mut messages = vec![
            ChatMessage::system(ASSESSOR_SYSTEM_PROMPT),
            ChatMessage::user(&request.to_string()),
        ];
        let response = self
            .llm_client
            .call_llm_with_format_check(
                &mut messages,
                |resp| validate_response(&self.validator, resp).unwrap_or(false),
                ASSESSOR_FORMAT_REMINDER,
                2,
            )
            .await?;
        let value: Value = serde_json::from_str(strip_code_fence(&response))?;
        Ok(Assessment::from_value(&value))
    }
}
