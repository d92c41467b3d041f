//! Approval pipelines
//!
//! Stage and pipeline types plus the stage editor that turns a single-stage
//! edit into a full replacement pipeline.

pub mod editor;
pub mod types;

pub use editor::{PipelineUpdater, StageEditor};
pub use types::{Pipeline, ReviewSequence, Reviewer, Stage, StageAction, StageId};
