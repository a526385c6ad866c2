use super::StageNode;
use crate::artifacts::{ArtifactOptions, ArtifactService};
use crate::constants::EXECUTION_FAILED;
use crate::core::{
    IntentAction, Stage, StateUpdate, UiDescriptor, UpdateMode, WorkflowError, WorkflowState,
};
use crate::errors::Error;
use crate::utils::prompt_seed;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces the artifact for the (augmented) prompt
pub struct ExecutorAgent {
    artifacts: Arc<dyn ArtifactService>,
}

impl ExecutorAgent {
    pub fn new(artifacts: Arc<dyn ArtifactService>) -> Self {
        Self { artifacts }
    }
}

fn targeted(mut descriptor: UiDescriptor, target_id: &str) -> UiDescriptor {
    descriptor.update_mode = Some(UpdateMode::Replace);
    descriptor.target_id = Some(target_id.to_string());
    descriptor
}

#[async_trait]
impl StageNode for ExecutorAgent {
    fn stage(&self) -> Stage {
        Stage::Executing
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, Error> {
        let intent = state
            .intent
            .as_ref()
            .ok_or_else(|| Error::Invariant("executing stage reached without an intent".to_string()))?;
        let prompt = state
            .enhanced_prompt
            .as_ref()
            .map(|p| p.final_prompt.as_str())
            .unwrap_or(intent.prompt.as_str());

        let opts = ArtifactOptions {
            seed: prompt_seed(prompt),
            model: state.user_input.preferred_model.clone(),
            mask: state.user_input.mask_data.clone(),
        };
        debug!("ExecutorAgent: {} with seed {}", intent.action.as_str(), opts.seed);

        let result = match intent.action {
            IntentAction::EditRegion => self.artifacts.edit(prompt, &opts).await,
            _ => self.artifacts.generate(prompt, &opts).await,
        };

        let mut update = StateUpdate::new();
        match result {
            Ok(artifact_ref) => {
                let entry = update.log(
                    Stage::Executing,
                    format!("Artifact ready (seed {})", opts.seed),
                );
                entry.progress = Some(100);
                entry.metadata = Some(json!({ "seed": opts.seed, "action": intent.action }));

                update.ui(targeted(
                    UiDescriptor::new(
                        "StatusMessage",
                        json!({ "level": "success", "message": "Your image is ready" }),
                    ),
                    "workflow-status",
                ));
                update.ui(targeted(
                    UiDescriptor::new(
                        "ImageView",
                        json!({
                            "url": artifact_ref,
                            "prompt": prompt,
                            "seed": opts.seed,
                            "model": opts.model,
                        }),
                    ),
                    "artifact-preview",
                ));
                update.ui(targeted(
                    UiDescriptor::new(
                        "ActionPanel",
                        json!({
                            "actions": [{
                                "id": "regenerate",
                                "label": "Regenerate",
                                "payload": { "prompt": prompt }
                            }]
                        }),
                    ),
                    "artifact-actions",
                ));
                update.artifact_ref = Some(artifact_ref);
            }
            Err(e) => {
                warn!("Artifact generation failed: {}", e);
                update.log(Stage::Executing, "Artifact generation failed");
                update.error = Some(
                    WorkflowError::new(EXECUTION_FAILED, "The image could not be produced", Stage::Executing)
                        .with_details(&e),
                );
            }
        }
        Ok(update)
    }
}
