mod augmenter;
mod critic;
mod executor;
mod planner;

pub use augmenter::*;
pub use critic::*;
pub use executor::*;
pub use planner::*;

use crate::core::{Stage, StateUpdate, WorkflowState};
use crate::errors::Error;

/// One processing stage of the workflow.
///
/// A stage reads the merged state and returns only the fields it owns;
/// the engine merges them. Recoverable failures are reported inside the
/// update, an `Err` is fatal to the workflow instance.
#[async_trait::async_trait]
pub trait StageNode: Send + Sync {
    fn stage(&self) -> Stage;

    async fn execute(&self, state: &WorkflowState) -> Result<StateUpdate, Error>;
}
