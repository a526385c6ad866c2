//! Style-augmented image prompt workflow.
//!
//! A request passes through four stages: the planner classifies intent, the
//! augmenter folds retrieved style fragments into the prompt, the executor asks
//! the artifact backend for an image and the critic scores it, routing back to
//! execution while retries remain. Each run publishes an ordered event stream.

pub mod agents;
pub mod artifacts;
pub mod config;
pub mod constants;
pub mod core;
pub mod errors;
pub mod event;
pub mod llm;
#[cfg(test)]
mod testing;
pub mod utils;
