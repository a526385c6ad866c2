use super::StageNode;
use crate::config::CriticConfig;
use crate::constants::DEFAULT_QUALITY_SCORE;
use crate::core::{QualityCheck, Stage, StateUpdate, WorkflowState, RETRY_COUNT_KEY, SHOULD_RETRY_KEY};
use crate::errors::Error;
use crate::llm::{Assessment, AssessmentService};
use crate::utils::clamp_unit;
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores the artifact and decides whether another cycle is granted.
///
/// The critic owns `retryCount`: it increments it exactly once per granted retry
/// and records its decision under `shouldRetry`. An internal failure accepts the
/// artifact unassessed rather than blocking the workflow.
pub struct CriticAgent {
    config: CriticConfig,
    max_retry_count: u32,
    assessor: Option<Arc<dyn AssessmentService>>,
}

impl CriticAgent {
    pub fn new(
        config: CriticConfig,
        max_retry_count: u32,
        assessor: Option<Arc<dyn AssessmentService>>,
    ) -> Self {
        Self {
            config,
            max_retry_count,
            assessor,
        }
    }

    fn heuristic(&self, confidence: f64) -> QualityCheck {
        let jitter = self.config.jitter.abs();
        let perturbation = if jitter > 0.0 {
            rand::thread_rng().gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        let score = clamp_unit(confidence + perturbation, DEFAULT_QUALITY_SCORE);
        let passed = score >= self.config.pass_threshold;
        QualityCheck {
            passed,
            score,
            feedback: format!("Heuristic score derived from intent confidence {:.2}", confidence),
            suggestions: if passed {
                vec![]
            } else {
                vec!["Describe the subject and the style more specifically".to_string()]
            },
        }
    }

    /// Usable only with a finite score inside [0, 1]
    fn from_assessment(assessment: Assessment) -> Option<QualityCheck> {
        let score = assessment.score.filter(|s| s.is_finite() && (0.0..=1.0).contains(s))?;
        Some(QualityCheck {
            passed: assessment.passed.unwrap_or(false),
            score,
            feedback: assessment.feedback.unwrap_or_default(),
            suggestions: assessment.suggestions,
        })
    }

    async fn assess(&self, state: &WorkflowState) -> Result<QualityCheck, Error> {
        let intent = state
            .intent
            .as_ref()
            .ok_or_else(|| Error::Invariant("critic reached without an intent".to_string()))?;
        let artifact_ref = state
            .artifact_ref
            .as_deref()
            .ok_or_else(|| Error::Invariant("critic reached without an artifact".to_string()))?;

        if self.config.use_external_assessment {
            if let Some(assessor) = &self.assessor {
                match assessor.assess(intent, artifact_ref).await {
                    Ok(assessment) => match Self::from_assessment(assessment) {
                        Some(check) => return Ok(check),
                        None => warn!("Assessment out of range, using heuristic score"),
                    },
                    Err(e) => warn!("External assessment failed, using heuristic score: {}", e),
                }
            }
        }
        Ok(self.heuristic(intent.confidence))
    }

    fn unassessed(reason: &Error) -> QualityCheck {
        QualityCheck {
            passed: true,
            score: DEFAULT_QUALITY_SCORE,
            feedback: format!("Quality could not be assessed ({}), accepting the artifact", reason),
            suggestions: vec![],
        }
    }
}

/// Score clamped to [0, 1] with a numeric default
fn normalize(mut check: QualityCheck) -> QualityCheck {
    check.score = clamp_unit(check.score, DEFAULT_QUALITY_SCORE);
    check
}

#[async_trait]
impl StageNode for CriticAgent {
    fn stage(&self) -> Stage {
        Stage::Critiquing
    }

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, Error> {
        let retry_count = state.retry_count();
        let mut update = StateUpdate::new();
        update
            .log(
                Stage::Critiquing,
                format!(
                    "Reviewing the result (attempt {}/{})",
                    retry_count + 1,
                    self.max_retry_count + 1
                ),
            )
            .progress = Some(0);

        let (check, assessed) = match self.assess(state).await {
            Ok(check) => (normalize(check), true),
            Err(e) => {
                warn!("Quality assessment failed, accepting unassessed artifact: {}", e);
                (Self::unassessed(&e), false)
            }
        };

        let should_retry = !check.passed && retry_count < self.max_retry_count;
        if should_retry {
            update.meta(RETRY_COUNT_KEY, retry_count + 1);
        }
        update.meta(SHOULD_RETRY_KEY, should_retry);
        debug!("CriticAgent: score {:.2}, retry {}", check.score, should_retry);

        let message = if check.passed {
            format!("Quality check passed (score {:.2})", check.score)
        } else if should_retry {
            format!(
                "Quality score {:.2} below {:.2}, retrying ({}/{})",
                check.score,
                self.config.pass_threshold,
                retry_count + 1,
                self.max_retry_count
            )
        } else {
            format!(
                "Quality score {:.2} below {:.2}, no retries left",
                check.score, self.config.pass_threshold
            )
        };
        info!("{}", message);
        let entry = update.log(Stage::Critiquing, message);
        entry.progress = Some(100);
        entry.metadata = Some(json!({
            "passed": check.passed,
            "score": check.score,
            "assessed": assessed,
            "shouldRetry": should_retry,
            "suggestions": check.suggestions,
        }));

        update.quality_check = Some(check);
        Ok(update)
    }
}
