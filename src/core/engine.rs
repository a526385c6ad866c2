use super::rag::SimilaritySearch;
use super::state::{IntentAction, UserInput, WorkflowError, WorkflowState};
use super::workflow::{Next, Stage, Termination, Workflow};
use crate::agents::{AugmenterAgent, CriticAgent, ExecutorAgent, PlannerAgent, StageNode};
use crate::artifacts::ArtifactService;
use crate::config::AppConfig;
use crate::constants::{ARTIFACT_MISSING, INTENT_UNKNOWN, INTERNAL_ERROR};
use crate::core::rag::SearchOptions;
use crate::errors::Error;
use crate::event::{ConnectionData, ErrorData, Event, EventSink, EventStream, StreamEndData};
use crate::llm::{AssessmentService, LanguageClassifier};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// External services injected into the engine at startup
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn LanguageClassifier>,
    pub index: Arc<dyn SimilaritySearch>,
    pub artifacts: Arc<dyn ArtifactService>,
    /// Only consulted when external assessment is enabled
    pub assessor: Option<Arc<dyn AssessmentService>>,
}

/// Final result of one workflow instance
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub termination: Termination,
    pub state: WorkflowState,
    /// Number of Augmenting -> Executing -> Critiquing cycles started
    pub cycles: u32,
}

/// Drives the four stages through the transition table.
///
/// The engine owns no per-request state; every call to [`WorkflowEngine::run`]
/// creates a private [`WorkflowState`], so instances may run concurrently.
pub struct WorkflowEngine {
    nodes: HashMap<Stage, Box<dyn StageNode>>,
    workflow: Workflow,
}

impl WorkflowEngine {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Self {
        let options = SearchOptions {
            limit: config.retrieval.limit,
            min_similarity: config.retrieval.min_similarity,
        };
        let stages: Vec<Box<dyn StageNode>> = vec![
            Box::new(PlannerAgent::new(collaborators.classifier)),
            Box::new(AugmenterAgent::new(collaborators.index, options)),
            Box::new(ExecutorAgent::new(collaborators.artifacts)),
            Box::new(CriticAgent::new(
                config.critic.clone(),
                config.workflow.max_retry_count,
                collaborators.assessor,
            )),
        ];
        Self::with_stages(stages, Workflow::standard())
    }

    pub fn with_stages(stages: Vec<Box<dyn StageNode>>, workflow: Workflow) -> Self {
        let nodes = stages.into_iter().map(|node| (node.stage(), node)).collect();
        Self { nodes, workflow }
    }

    /// Runs the workflow in a background task and returns its event stream
    pub fn stream(self: &Arc<Self>, input: UserInput, cancel: CancellationToken) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(tx, cancel);
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.run(input, &sink).await });
        EventStream { rx, handle }
    }

    /// Executes one workflow instance, publishing its events on `sink`
    pub async fn run(&self, input: UserInput, sink: &EventSink) -> Result<WorkflowOutcome, Error> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let mut state = WorkflowState::new(input, session_id.clone());
        info!("Workflow {} started", session_id);
        sink.emit(Event::Connection(ConnectionData {
            status: "connected".to_string(),
            session_id: session_id.clone(),
        }));

        let mut stage = Stage::Planning;
        let mut cycles = 0u32;
        let termination = loop {
            if sink.is_cancelled() {
                info!("Workflow {} cancelled before {}", session_id, stage);
                break Termination::Cancelled;
            }
            let node = self
                .nodes
                .get(&stage)
                .ok_or_else(|| Error::Invariant(format!("no node registered for stage {}", stage)))?;
            if stage == Stage::Augmenting {
                cycles += 1;
            }

            debug!("Workflow {}: running {}", session_id, stage);
            let update = match node.execute(&state).await {
                Ok(update) => update,
                Err(e) => {
                    error!("Stage {} failed: {}", stage, e);
                    sink.emit(Event::Error(ErrorData {
                        code: INTERNAL_ERROR.to_string(),
                        message: format!("The {} stage failed unexpectedly", stage),
                        details: Some(e.to_string()),
                    }));
                    return Err(e);
                }
            };

            let logs_seen = state.thought_log.len();
            let ui_seen = state.ui_descriptors.len();
            let augmented = update.enhanced_prompt.is_some();
            state.apply(update);

            for entry in &state.thought_log[logs_seen..] {
                sink.emit(entry.into());
            }
            if stage == Stage::Augmenting && augmented {
                if let Some(prompt) = &state.enhanced_prompt {
                    sink.emit(prompt.into());
                }
            }
            for descriptor in &state.ui_descriptors[ui_seen..] {
                sink.emit(descriptor.into());
            }

            match self.workflow.next(stage, &state) {
                Next::Stage(next) => stage = next,
                Next::Terminate(termination) => break termination,
            }
        };

        if termination == Termination::Cancelled {
            return Ok(WorkflowOutcome {
                termination,
                state,
                cycles,
            });
        }

        if termination == Termination::Error {
            if state.error.is_none() {
                let action = state.intent.as_ref().map(|i| i.action);
                state.error = Some(terminal_error(stage, action));
            }
            if let Some(error) = &state.error {
                error!("Workflow {} failed: {} ({})", session_id, error.message, error.code);
                sink.emit(error.into());
            }
        }

        info!(
            "Workflow {} finished: {} after {} cycle(s)",
            session_id,
            termination.as_str(),
            cycles
        );
        sink.emit(Event::StreamEnd(StreamEndData {
            session_id,
            summary: summary(termination, &state, cycles),
        }));

        Ok(WorkflowOutcome {
            termination,
            state,
            cycles,
        })
    }
}

/// Error reported when routing terminated without a stage setting one
fn terminal_error(stage: Stage, action: Option<IntentAction>) -> WorkflowError {
    match stage {
        Stage::Planning if matches!(action, Some(IntentAction::Unknown) | None) => WorkflowError::new(
            INTENT_UNKNOWN,
            "The request could not be understood as an image task",
            stage,
        ),
        Stage::Executing => {
            WorkflowError::new(ARTIFACT_MISSING, "No artifact was produced", stage)
        }
        _ => WorkflowError::new(INTERNAL_ERROR, "The workflow ended unexpectedly", stage),
    }
}

fn summary(termination: Termination, state: &WorkflowState, cycles: u32) -> serde_json::Value {
    let mut summary = json!({
        "outcome": termination.as_str(),
        "retryCount": state.retry_count(),
        "cycles": cycles,
    });
    if let Some(artifact_ref) = &state.artifact_ref {
        summary["artifactRef"] = json!(artifact_ref);
    }
    if let Some(check) = &state.quality_check {
        summary["score"] = json!(check.score);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CriticConfig;
    use crate::core::rag::{InMemoryStyleIndex, NewStyleRecord};
    use crate::core::MaskData;
    use crate::event::EventEnvelope;
    use crate::testing::{CountingArtifacts, FailingIndex, KeywordEmbedder, ScriptedClassifier};

    async fn style_index() -> Arc<InMemoryStyleIndex> {
        let index = InMemoryStyleIndex::new(Arc::new(KeywordEmbedder::new()));
        index
            .bootstrap(vec![
                NewStyleRecord {
                    id: Some("cyberpunk".to_string()),
                    label: "Cyberpunk".to_string(),
                    prompt_fragment: "neon cyberpunk city".to_string(),
                    is_system_protected: true,
                    ..Default::default()
                },
                NewStyleRecord {
                    id: Some("watercolor".to_string()),
                    label: "Watercolor".to_string(),
                    prompt_fragment: "soft watercolor paint".to_string(),
                    is_system_protected: true,
                    ..Default::default()
                },
            ])
            .await
            .unwrap();
        Arc::new(index)
    }

    fn config(max_retry_count: u32) -> AppConfig {
        let mut config = AppConfig::default();
        config.workflow.max_retry_count = max_retry_count;
        config.retrieval.min_similarity = 0.3;
        config.critic = CriticConfig {
            pass_threshold: 0.7,
            use_external_assessment: false,
            jitter: 0.0,
        };
        config
    }

    fn engine(
        max_retry_count: u32,
        classifier: ScriptedClassifier,
        index: Arc<dyn SimilaritySearch>,
        artifacts: Arc<CountingArtifacts>,
    ) -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            &config(max_retry_count),
            Collaborators {
                classifier: Arc::new(classifier),
                index,
                artifacts,
                assessor: None,
            },
        ))
    }

    fn types(events: &[EventEnvelope]) -> Vec<&'static str> {
        events.iter().map(|e| e.event.type_name()).collect()
    }

    fn enhanced(events: &[EventEnvelope]) -> Vec<&crate::event::EnhancedPromptData> {
        events
            .iter()
            .filter_map(|e| match &e.event {
                Event::EnhancedPrompt(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    fn stream_end(events: &[EventEnvelope]) -> &StreamEndData {
        match &events.last().unwrap().event {
            Event::StreamEnd(data) => data,
            other => panic!("last event is {}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn native_style_request_retrieves_the_canonical_style() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", Some("赛博朋克"), 0.9),
            style_index().await,
            artifacts,
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        outcome.unwrap();
        let prompts = enhanced(&events);
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].retrieved[0].style, "Cyberpunk");
        assert_eq!(types(&events)[0], "connection");
    }

    #[tokio::test]
    async fn masked_request_is_planned_as_an_edit() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let classifier = ScriptedClassifier::generate("unused", None, 0.1);
        let engine = engine(3, classifier, style_index().await, artifacts.clone());
        let mut input = UserInput::new("remove the hat");
        input.mask_data = Some(MaskData {
            base64: "AAAA".to_string(),
            reference_image_url: Some("https://example.com/cat.png".to_string()),
        });

        let (events, outcome) = engine.stream(input, CancellationToken::new()).collect().await;
        let outcome = outcome.unwrap();
        let first_log = events
            .iter()
            .find_map(|e| match &e.event {
                Event::ThoughtLog(data) => Some(data),
                _ => None,
            })
            .unwrap();
        assert_eq!(first_log.stage, Stage::Planning);
        assert_eq!(outcome.state.intent.unwrap().action, IntentAction::EditRegion);
        assert_eq!(artifacts.edit_calls(), 1);
    }

    #[tokio::test]
    async fn first_pass_success_runs_one_cycle() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", None, 0.9),
            style_index().await,
            artifacts.clone(),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.termination, Termination::Success);
        assert_eq!(outcome.cycles, 1);
        assert_eq!(outcome.state.retry_count(), 0);
        assert_eq!(artifacts.generate_calls(), 1);
        let end = stream_end(&events);
        assert_eq!(end.summary["outcome"], "success");
        assert_eq!(end.summary["retryCount"], 0);
        assert!(!types(&events).contains(&"error"));
    }

    #[tokio::test]
    async fn failing_critic_exhausts_exactly_the_retry_bound() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", None, 0.2),
            style_index().await,
            artifacts.clone(),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.state.retry_count(), 3);
        assert_eq!(outcome.cycles, 4);
        assert_eq!(artifacts.generate_calls(), 4);
        assert_eq!(enhanced(&events).len(), 4);
        assert_eq!(stream_end(&events).summary["outcome"], "exhausted");
    }

    #[tokio::test]
    async fn zero_retry_bound_allows_a_single_cycle() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            0,
            ScriptedClassifier::generate("a cat", None, 0.2),
            style_index().await,
            artifacts.clone(),
        );
        let (_, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.cycles, 1);
    }

    #[tokio::test]
    async fn unmatched_query_keeps_the_original_prompt() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            3,
            ScriptedClassifier::generate("a pixel dog", None, 0.9),
            style_index().await,
            artifacts.clone(),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a pixel dog"), CancellationToken::new())
            .collect()
            .await;
        outcome.unwrap();
        let prompt = enhanced(&events)[0];
        assert_eq!(prompt.final_prompt, prompt.original);
        assert_eq!(artifacts.prompts(), vec!["a pixel dog".to_string()]);
    }

    #[tokio::test]
    async fn events_follow_stage_order() {
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", None, 0.9),
            Arc::new(FailingIndex),
            Arc::new(CountingArtifacts::new()),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        outcome.unwrap();
        assert_eq!(
            types(&events),
            vec![
                "connection",
                "thought_log",
                "thought_log",
                "enhanced_prompt",
                "thought_log",
                "gen_ui_component",
                "gen_ui_component",
                "gen_ui_component",
                "thought_log",
                "thought_log",
                "stream_end",
            ]
        );
    }

    #[tokio::test]
    async fn classification_failure_emits_one_error_event() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(3, ScriptedClassifier::failing(), style_index().await, artifacts.clone());
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.termination, Termination::Error);
        assert_eq!(artifacts.generate_calls(), 0);
        let errors: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.event {
                Event::Error(data) => Some(data.code.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["INTENT_CLASSIFICATION_FAILED"]);
        assert_eq!(stream_end(&events).summary["outcome"], "error");
    }

    #[tokio::test]
    async fn unknown_intent_is_reported_as_such() {
        let engine = engine(
            3,
            ScriptedClassifier::unknown(),
            style_index().await,
            Arc::new(CountingArtifacts::new()),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("what time is it"), CancellationToken::new())
            .collect()
            .await;
        assert_eq!(outcome.unwrap().state.error.unwrap().code, "INTENT_UNKNOWN");
        assert!(types(&events).contains(&"error"));
    }

    #[tokio::test]
    async fn execution_failure_terminates_with_an_error() {
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", None, 0.9),
            style_index().await,
            Arc::new(CountingArtifacts::failing()),
        );
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.termination, Termination::Error);
        assert_eq!(outcome.cycles, 1);
        assert!(!types(&events).contains(&"gen_ui_component"));
        assert_eq!(stream_end(&events).summary["outcome"], "error");
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_the_first_stage() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let classifier = ScriptedClassifier::generate("a cat", None, 0.9);
        let engine = engine(3, classifier, style_index().await, artifacts.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (events, outcome) = engine.stream(UserInput::new("a cat"), cancel).collect().await;
        let outcome = outcome.unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(types(&events), vec!["connection"]);
        assert_eq!(artifacts.generate_calls(), 0);
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_the_run() {
        let artifacts = Arc::new(CountingArtifacts::new());
        let engine = engine(
            3,
            ScriptedClassifier::generate("a cat", None, 0.9),
            style_index().await,
            artifacts.clone(),
        );
        let stream = engine.stream(UserInput::new("a cat"), CancellationToken::new());
        let EventStream { rx, handle } = stream;
        drop(rx);

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(artifacts.generate_calls(), 0);
    }

    /// Stands in for a stage whose node fails outright
    struct BrokenStage(Stage);

    #[async_trait::async_trait]
    impl StageNode for BrokenStage {
        fn stage(&self) -> Stage {
            self.0
        }

        async fn execute(&self, _state: &WorkflowState) -> Result<crate::core::StateUpdate, Error> {
            Err(Error::Invariant("node crashed".to_string()))
        }
    }

    /// Stands in for a stage that completes without contributing anything
    struct SilentStage(Stage);

    #[async_trait::async_trait]
    impl StageNode for SilentStage {
        fn stage(&self) -> Stage {
            self.0
        }

        async fn execute(&self, _state: &WorkflowState) -> Result<crate::core::StateUpdate, Error> {
            Ok(crate::core::StateUpdate::new())
        }
    }

    fn planner() -> Box<dyn StageNode> {
        Box::new(PlannerAgent::new(Arc::new(ScriptedClassifier::generate(
            "a cat", None, 0.9,
        ))))
    }

    fn error_codes(events: &[EventEnvelope]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match &e.event {
                Event::Error(data) => Some(data.code.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn failing_node_reports_one_internal_error_and_no_stream_end() {
        let engine = Arc::new(WorkflowEngine::with_stages(
            vec![planner(), Box::new(BrokenStage(Stage::Augmenting))],
            Workflow::standard(),
        ));
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;

        assert!(matches!(outcome, Err(Error::Invariant(_))));
        assert_eq!(types(&events), vec!["connection", "thought_log", "error"]);
        assert_eq!(error_codes(&events), vec![INTERNAL_ERROR]);
        match &events.last().unwrap().event {
            Event::Error(data) => assert_eq!(data.details.as_deref(), Some("Invariant violated: node crashed")),
            other => panic!("last event is {}", other.type_name()),
        }
    }

    #[tokio::test]
    async fn execution_without_artifact_or_error_is_artifact_missing() {
        let engine = Arc::new(WorkflowEngine::with_stages(
            vec![
                planner(),
                Box::new(SilentStage(Stage::Augmenting)),
                Box::new(SilentStage(Stage::Executing)),
            ],
            Workflow::standard(),
        ));
        let (events, outcome) = engine
            .stream(UserInput::new("a cat"), CancellationToken::new())
            .collect()
            .await;
        let outcome = outcome.unwrap();

        assert_eq!(outcome.termination, Termination::Error);
        assert_eq!(outcome.cycles, 1);
        let error = outcome.state.error.unwrap();
        assert_eq!(error.code, ARTIFACT_MISSING);
        assert_eq!(error.stage, Some(Stage::Executing));
        assert_eq!(
            types(&events),
            vec!["connection", "thought_log", "error", "stream_end"]
        );
        assert_eq!(error_codes(&events), vec![ARTIFACT_MISSING]);
        assert_eq!(stream_end(&events).summary["outcome"], "error");
    }
}
