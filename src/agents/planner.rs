use super::StageNode;
use crate::constants::{INTENT_CLASSIFICATION_FAILED, MASK_FORCED_CONFIDENCE};
use crate::core::{Intent, IntentAction, Stage, StateUpdate, WorkflowError, WorkflowState};
use crate::errors::Error;
use crate::llm::LanguageClassifier;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Classifies the raw request into an actionable intent.
///
/// A request carrying a mask is an unambiguous edit and never reaches the classifier.
pub struct PlannerAgent {
    classifier: Arc<dyn LanguageClassifier>,
}

impl PlannerAgent {
    pub fn new(classifier: Arc<dyn LanguageClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl StageNode for PlannerAgent {
    fn stage(&self) -> Stage {
        Stage::Planning
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, Error> {
        let text = &state.user_input.text;
        let mut update = StateUpdate::new();

        if state.user_input.mask_data.is_some() {
            debug!("PlannerAgent: mask supplied, forcing edit_region");
            update.intent = Some(Intent {
                action: IntentAction::EditRegion,
                subject: None,
                style: None,
                prompt: text.clone(),
                confidence: MASK_FORCED_CONFIDENCE,
                raw_response: "mask-forced".to_string(),
            });
            let entry = update.log(Stage::Planning, format!("Editing the masked region: {}", text));
            entry.progress = Some(100);
            entry.metadata = Some(json!({ "action": "edit_region", "confidence": MASK_FORCED_CONFIDENCE }));
            return Ok(update);
        }

        match self.classifier.classify(text).await {
            Ok(intent) => {
                debug!("PlannerAgent: recognized {:?}", intent.action);
                let entry = update.log(
                    Stage::Planning,
                    format!(
                        "Recognized intent '{}' (confidence {:.2}): {}",
                        intent.action.as_str(),
                        intent.confidence,
                        intent.prompt
                    ),
                );
                entry.progress = Some(100);
                entry.metadata = Some(json!({
                    "action": intent.action,
                    "subject": intent.subject,
                    "style": intent.style,
                    "confidence": intent.confidence,
                }));
                update.intent = Some(intent);
            }
            Err(e) => {
                warn!("Intent classification failed: {}", e);
                update.intent = Some(Intent {
                    action: IntentAction::Unknown,
                    subject: None,
                    style: None,
                    prompt: text.clone(),
                    confidence: 0.0,
                    raw_response: String::new(),
                });
                update.error = Some(
                    WorkflowError::new(
                        INTENT_CLASSIFICATION_FAILED,
                        "The request could not be classified",
                        Stage::Planning,
                    )
                    .with_details(&e),
                );
                update.log(Stage::Planning, "Intent classification failed");
            }
        }
        Ok(update)
    }
}
