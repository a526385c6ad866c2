use super::state::{IntentAction, WorkflowState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing stage of a workflow instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Augmenting,
    Executing,
    Critiquing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planning => "planning",
            Stage::Augmenting => "augmenting",
            Stage::Executing => "executing",
            Stage::Critiquing => "critiquing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a workflow instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Success,
    Error,
    Exhausted,
    /// The event consumer went away before the workflow finished
    Cancelled,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Success => "success",
            Termination::Error => "error",
            Termination::Exhausted => "exhausted",
            Termination::Cancelled => "cancelled",
        }
    }
}

/// Where the engine goes after a stage returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Stage(Stage),
    Terminate(Termination),
}

/// Predicate evaluated against the merged state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Error set, intent missing, or intent action is unknown
    IntentUnusable,
    ErrorSet,
    ArtifactProduced,
    Passed,
    /// The critic granted another cycle
    RetryGranted,
    Always,
}

impl Condition {
    fn holds(&self, state: &WorkflowState) -> bool {
        match self {
            Condition::IntentUnusable => {
                state.error.is_some()
                    || state
                        .intent
                        .as_ref()
                        .map_or(true, |i| i.action == IntentAction::Unknown)
            }
            Condition::ErrorSet => state.error.is_some(),
            Condition::ArtifactProduced => state.artifact_ref.is_some(),
            Condition::Passed => state.quality_check.as_ref().is_some_and(|q| q.passed),
            Condition::RetryGranted => {
                state.quality_check.as_ref().is_some_and(|q| !q.passed) && state.should_retry()
            }
            Condition::Always => true,
        }
    }
}

/// A single row of the transition table
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    pub from: Stage,
    pub condition: Condition,
    pub to: Next,
}

/// Transition table sequencing the four stages; rows are evaluated in order
#[derive(Debug, Clone)]
pub struct Workflow {
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(steps: Vec<WorkflowStep>) -> Self {
        Workflow { steps }
    }

    /// Plan, augment, execute, critique with a bounded retry loop
    pub fn standard() -> Self {
        use Condition::*;
        use Next::{Stage as To, Terminate};
        let row = |from, condition, to| WorkflowStep {
            from,
            condition,
            to,
        };
        Workflow::new(vec![
            row(Stage::Planning, IntentUnusable, Terminate(Termination::Error)),
            row(Stage::Planning, Always, To(Stage::Augmenting)),
            row(Stage::Augmenting, Always, To(Stage::Executing)),
            row(Stage::Executing, ErrorSet, Terminate(Termination::Error)),
            row(Stage::Executing, ArtifactProduced, To(Stage::Critiquing)),
            row(Stage::Executing, Always, Terminate(Termination::Error)),
            row(Stage::Critiquing, ErrorSet, Terminate(Termination::Error)),
            row(Stage::Critiquing, Passed, Terminate(Termination::Success)),
            row(Stage::Critiquing, RetryGranted, To(Stage::Augmenting)),
            row(Stage::Critiquing, Always, Terminate(Termination::Exhausted)),
        ])
    }

    /// Selects the transition out of `from`; no matching row terminates with an error
    pub fn next(&self, from: Stage, state: &WorkflowState) -> Next {
        for step in &self.steps {
            if step.from == from && step.condition.holds(state) {
                return step.to;
            }
        }
        Next::Terminate(Termination::Error)
    }
}
