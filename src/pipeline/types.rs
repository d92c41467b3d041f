//! Pipeline and stage types
//!
//! A pipeline is an ordered list of approval stages. Order matters: content is
//! promoted from one stage to the next, and the last stage is terminal.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::error::AppError;

/// Opaque stage identifier, unique within a pipeline.
///
/// Accepts JSON strings or integers on input and always serializes as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => StageId(s),
            RawId::Number(n) => StageId(n.to_string()),
        })
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What happens to content once a stage is approved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    /// Copy content forward to the next stage
    #[default]
    PromoteCopy,
    /// Move content forward to the next stage
    PromoteMove,
    /// Nothing to forward; required on the terminal stage
    Noop,
}

/// Whether reviewers approve one after another or all at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSequence {
    #[default]
    Serial,
    Parallel,
}

/// Reference to a workspace user acting as reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reviewer {
    #[serde(alias = "value")]
    pub email: String,
    #[serde(alias = "label", default)]
    pub display_name: String,
}

impl Reviewer {
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}

/// Drop reviewers whose email already appeared earlier in the list.
pub fn dedup_reviewers(reviewers: Vec<Reviewer>) -> Vec<Reviewer> {
    let mut seen = HashSet::new();
    reviewers
        .into_iter()
        .filter(|r| seen.insert(r.email.clone()))
        .collect()
}

/// One step of an approval pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: StageId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub action: StageAction,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
    #[serde(default)]
    pub minimum_approvals: u32,
    #[serde(default)]
    pub review_sequence: ReviewSequence,
    /// Fields this service does not interpret; carried through edits untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Stage {
    pub fn new(id: impl Into<StageId>, label: impl Into<String>, action: StageAction) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action,
            reviewers: Vec::new(),
            minimum_approvals: 0,
            review_sequence: ReviewSequence::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_reviewers(mut self, reviewers: Vec<Reviewer>, minimum_approvals: u32) -> Self {
        self.reviewers = reviewers;
        self.minimum_approvals = minimum_approvals;
        self
    }

    pub fn reviewer_count(&self) -> u32 {
        u32::try_from(self.reviewers.len()).unwrap_or(u32::MAX)
    }
}

impl From<String> for StageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Reasons a pipeline is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Pipeline must contain at least one stage")]
    Empty,

    #[error("Stage id '{0}' appears more than once")]
    DuplicateStage(StageId),

    #[error("Stage '{0}' is the last stage and must use the noop action")]
    TerminalForwards(StageId),

    #[error("Stage '{stage}' requires {minimum} approvals but has only {reviewers} reviewers")]
    ThresholdExceedsReviewers {
        stage: StageId,
        minimum: u32,
        reviewers: u32,
    },

    #[error("Stage '{stage}' lists reviewer {email} more than once")]
    DuplicateReviewer { stage: StageId, email: String },
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Ordered sequence of stages.
///
/// Stages are shared, so a pipeline derived through [`Pipeline::replace_stage`]
/// points at the very same stage values for everything it did not touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<Arc<Stage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages: stages.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn stages(&self) -> &[Arc<Stage>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, id: &StageId) -> Option<&Arc<Stage>> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn last(&self) -> Option<&Arc<Stage>> {
        self.stages.last()
    }

    /// True when `id` names the last stage in order
    pub fn is_terminal(&self, id: &StageId) -> bool {
        self.last().is_some_and(|s| &s.id == id)
    }

    /// Build a new pipeline with the stage sharing `stage.id` swapped out.
    ///
    /// Returns `None` when no stage has that id. `self` is left as is.
    pub fn replace_stage(&self, stage: Stage) -> Option<Pipeline> {
        let index = self.stages.iter().position(|s| s.id == stage.id)?;
        let mut stages = self.stages.clone();
        stages[index] = Arc::new(stage);
        Some(Pipeline { stages })
    }

    /// Check the structural rules every stored pipeline must satisfy
    pub fn validate(&self) -> Result<(), PipelineError> {
        let last = self.last().ok_or(PipelineError::Empty)?;

        let mut ids = HashSet::new();
        for stage in &self.stages {
            if !ids.insert(&stage.id) {
                return Err(PipelineError::DuplicateStage(stage.id.clone()));
            }

            let mut emails = HashSet::new();
            for reviewer in &stage.reviewers {
                if !emails.insert(reviewer.email.as_str()) {
                    return Err(PipelineError::DuplicateReviewer {
                        stage: stage.id.clone(),
                        email: reviewer.email.clone(),
                    });
                }
            }

            if stage.minimum_approvals > stage.reviewer_count() {
                return Err(PipelineError::ThresholdExceedsReviewers {
                    stage: stage.id.clone(),
                    minimum: stage.minimum_approvals,
                    reviewers: stage.reviewer_count(),
                });
            }
        }

        if last.action != StageAction::Noop {
            return Err(PipelineError::TerminalForwards(last.id.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_stage() -> Pipeline {
        Pipeline::new(vec![
            Stage::new("1", "Draft", StageAction::PromoteCopy),
            Stage::new("2", "Published", StageAction::Noop),
        ])
    }

    #[test]
    fn test_stage_id_accepts_numbers_and_strings() {
        let from_number: StageId = serde_json::from_str("7").unwrap();
        let from_text: StageId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"7\"");
    }

    #[test]
    fn test_stage_wire_format() {
        let json = serde_json::json!({
            "id": "review",
            "label": "Review",
            "action": "promote_move",
            "reviewers": [{ "label": "Ada Lovelace", "value": "ada@example.com" }],
            "minimumApprovals": 1,
            "reviewSequence": "parallel",
            "color": "blue"
        });
        let stage: Stage = serde_json::from_value(json).unwrap();
        assert_eq!(stage.action, StageAction::PromoteMove);
        assert_eq!(stage.review_sequence, ReviewSequence::Parallel);
        assert_eq!(stage.reviewers[0], Reviewer::new("ada@example.com", "Ada Lovelace"));
        assert_eq!(stage.extra.get("color"), Some(&serde_json::json!("blue")));

        let back = serde_json::to_value(&stage).unwrap();
        assert_eq!(back["minimumApprovals"], 1);
        assert_eq!(back["reviewers"][0]["displayName"], "Ada Lovelace");
        assert_eq!(back["color"], "blue");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let stage: Stage = serde_json::from_value(serde_json::json!({ "id": 3 })).unwrap();
        assert_eq!(stage.label, "");
        assert_eq!(stage.action, StageAction::PromoteCopy);
        assert_eq!(stage.review_sequence, ReviewSequence::Serial);
        assert_eq!(stage.minimum_approvals, 0);
    }

    #[test]
    fn test_terminal_detection() {
        let pipeline = two_stage();
        assert!(pipeline.is_terminal(&StageId::from("2")));
        assert!(!pipeline.is_terminal(&StageId::from("1")));
        assert!(!Pipeline::default().is_terminal(&StageId::from("1")));
    }

    #[test]
    fn test_replace_stage_keeps_other_stages_shared() {
        let pipeline = two_stage();
        let mut edited = (*pipeline.stages()[0]).clone();
        edited.action = StageAction::PromoteMove;

        let next = pipeline.replace_stage(edited).unwrap();
        assert_eq!(next.stages()[0].action, StageAction::PromoteMove);
        assert!(Arc::ptr_eq(&pipeline.stages()[1], &next.stages()[1]));
        // original untouched
        assert_eq!(pipeline.stages()[0].action, StageAction::PromoteCopy);
    }

    #[test]
    fn test_replace_unknown_stage() {
        let pipeline = two_stage();
        assert!(pipeline
            .replace_stage(Stage::new("ghost", "Ghost", StageAction::Noop))
            .is_none());
    }

    #[test]
    fn test_validate_rules() {
        assert_eq!(Pipeline::default().validate(), Err(PipelineError::Empty));
        assert_eq!(two_stage().validate(), Ok(()));

        let forwards = Pipeline::new(vec![Stage::new("1", "Only", StageAction::PromoteCopy)]);
        assert_eq!(
            forwards.validate(),
            Err(PipelineError::TerminalForwards(StageId::from("1")))
        );

        let dup = Pipeline::new(vec![
            Stage::new("1", "A", StageAction::PromoteCopy),
            Stage::new("1", "B", StageAction::Noop),
        ]);
        assert_eq!(dup.validate(), Err(PipelineError::DuplicateStage(StageId::from("1"))));

        let greedy = Pipeline::new(vec![Stage::new("1", "A", StageAction::Noop)
            .with_reviewers(vec![Reviewer::new("a@x.io", "A")], 2)]);
        assert!(matches!(
            greedy.validate(),
            Err(PipelineError::ThresholdExceedsReviewers { minimum: 2, reviewers: 1, .. })
        ));
    }

    #[test]
    fn test_dedup_reviewers_keeps_first() {
        let reviewers = dedup_reviewers(vec![
            Reviewer::new("a@x.io", "A"),
            Reviewer::new("b@x.io", "B"),
            Reviewer::new("a@x.io", "A again"),
        ]);
        assert_eq!(
            reviewers,
            vec![Reviewer::new("a@x.io", "A"), Reviewer::new("b@x.io", "B")]
        );
    }
}
