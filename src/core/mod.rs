//! Core module containing the workflow machinery
//!
//! This module contains:
//! - The shared workflow state and its merge policies
//! - The transition table sequencing the stages
//! - The engine driving one workflow instance and publishing its events
//! - The style index used for retrieval augmentation

mod engine;
pub mod rag;
mod state;
pub mod styles;
mod workflow;

pub use engine::*;
pub use state::*;
pub use workflow::*;
