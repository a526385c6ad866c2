use super::workflow::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata key holding the number of retry cycles granted so far
pub const RETRY_COUNT_KEY: &str = "retryCount";
/// Metadata key holding the critic's latest retry decision
pub const SHOULD_RETRY_KEY: &str = "shouldRetry";

/// Mask supplied with an edit request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaskData {
    /// Base64 encoded mask image
    pub base64: String,
    /// Image the mask applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<String>,
}

/// Raw request submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_data: Option<MaskData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_model: Option<String>,
}

impl UserInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }
}

/// Action recognized by the planner
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    Generate,
    EditRegion,
    AdjustParameters,
    Unknown,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::Generate => "generate",
            IntentAction::EditRegion => "edit_region",
            IntentAction::AdjustParameters => "adjust_parameters",
            IntentAction::Unknown => "unknown",
        }
    }
}

/// Classified intent of a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub action: IntentAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    pub prompt: String,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
    pub raw_response: String,
}

/// One retrieved style used to augment the prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedStyle {
    pub style: String,
    pub prompt_fragment: String,
    pub similarity: f64,
}

/// Prompt after retrieval augmentation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancedPrompt {
    pub original: String,
    pub retrieved: Vec<RetrievedStyle>,
    #[serde(rename = "final")]
    pub final_prompt: String,
}

impl EnhancedPrompt {
    /// Enhanced prompt that carries no retrieved material
    pub fn unaugmented(original: &str) -> Self {
        Self {
            original: original.to_string(),
            retrieved: Vec::new(),
            final_prompt: original.to_string(),
        }
    }
}

/// Verdict of the quality critic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityCheck {
    pub passed: bool,
    pub score: f64,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

/// How a UI descriptor combines with a previously rendered one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    Replace,
    Append,
}

/// Rendering instruction for the caller's UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiDescriptor {
    pub widget_type: String,
    pub props: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_mode: Option<UpdateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

impl UiDescriptor {
    pub fn new(widget_type: &str, props: Value) -> Self {
        Self {
            widget_type: widget_type.to_string(),
            props,
            update_mode: None,
            target_id: None,
        }
    }
}

/// Human readable trace entry appended by a stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThoughtLogEntry {
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Completion percentage of the stage, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Error recorded on the workflow state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Raw error text, opaque to downstream logic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl WorkflowError {
    pub fn new(code: &str, message: &str, stage: Stage) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            stage: Some(stage),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// The single record threaded through every stage of one workflow instance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub user_input: UserInput,
    pub intent: Option<Intent>,
    pub enhanced_prompt: Option<EnhancedPrompt>,
    pub artifact_ref: Option<String>,
    pub quality_check: Option<QualityCheck>,
    pub ui_descriptors: Vec<UiDescriptor>,
    pub thought_log: Vec<ThoughtLogEntry>,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
    pub error: Option<WorkflowError>,
}

impl WorkflowState {
    /// Creates the initial state for a request, with `retryCount` set to 0
    pub fn new(user_input: UserInput, session_id: String) -> Self {
        let mut metadata = Map::new();
        metadata.insert(RETRY_COUNT_KEY.to_string(), Value::from(0u64));
        Self {
            user_input,
            intent: None,
            enhanced_prompt: None,
            artifact_ref: None,
            quality_check: None,
            ui_descriptors: Vec::new(),
            thought_log: Vec::new(),
            session_id,
            started_at: Utc::now(),
            metadata,
            error: None,
        }
    }

    pub fn retry_count(&self) -> u32 {
        self.metadata
            .get(RETRY_COUNT_KEY)
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .unwrap_or(0)
    }

    pub fn should_retry(&self) -> bool {
        self.metadata
            .get(SHOULD_RETRY_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Merges a stage's partial update using each field's policy
    pub fn apply(&mut self, update: StateUpdate) {
        replace_latest(&mut self.intent, update.intent);
        replace_latest(&mut self.enhanced_prompt, update.enhanced_prompt);
        replace_latest(&mut self.artifact_ref, update.artifact_ref);
        replace_latest(&mut self.quality_check, update.quality_check);
        replace_latest(&mut self.error, update.error);
        append(&mut self.ui_descriptors, update.ui_descriptors);
        append(&mut self.thought_log, update.thought_log);
        shallow_merge(&mut self.metadata, update.metadata);
    }
}

fn replace_latest<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

fn append<T>(list: &mut Vec<T>, incoming: Vec<T>) {
    list.extend(incoming);
}

fn shallow_merge(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        target.insert(key, value);
    }
}

/// Partial state returned by a stage
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub intent: Option<Intent>,
    pub enhanced_prompt: Option<EnhancedPrompt>,
    pub artifact_ref: Option<String>,
    pub quality_check: Option<QualityCheck>,
    pub ui_descriptors: Vec<UiDescriptor>,
    pub thought_log: Vec<ThoughtLogEntry>,
    pub metadata: Map<String, Value>,
    pub error: Option<WorkflowError>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, stage: Stage, message: impl Into<String>) -> &mut ThoughtLogEntry {
        self.thought_log.push(ThoughtLogEntry {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
            progress: None,
            metadata: None,
        });
        let last = self.thought_log.len() - 1;
        &mut self.thought_log[last]
    }

    pub fn ui(&mut self, descriptor: UiDescriptor) {
        self.ui_descriptors.push(descriptor);
    }

    pub fn meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }
}
