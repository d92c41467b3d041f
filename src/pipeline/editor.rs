//! Stage editor
//!
//! Editing session for a single stage of a workspace pipeline. The editor keeps
//! its own form state; nothing reaches the pipeline until [`StageEditor::submit`]
//! hands a freshly built pipeline to the persistence collaborator.
//!
//! ```text
//! Closed --open/reopen--> Open --submit--> Submitting --ok--> Closed
//!                          ^                    |
//!                          +------- err --------+
//! ```

use crate::auth::Role;
use crate::error::AppError;
use crate::pipeline::types::{
    dedup_reviewers, Pipeline, ReviewSequence, Reviewer, Stage, StageAction, StageId,
};
use crate::users::{ReviewerCandidate, UserDirectory};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Persists a full replacement pipeline for a workspace
#[async_trait]
pub trait PipelineUpdater: Send + Sync {
    async fn update_pipeline(&self, workspace_id: &str, pipeline: &Pipeline)
        -> Result<(), AppError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageEditError {
    /// The edited stage is no longer part of the pipeline
    #[error("Could not find stage '{0}' in the pipeline to save")]
    TargetNotFound(StageId),

    /// The persistence collaborator rejected the update
    #[error("Error while updating pipeline: {0}")]
    PersistenceFailure(String),

    #[error("Stage editor is not open")]
    EditorClosed,
}

impl From<StageEditError> for AppError {
    fn from(err: StageEditError) -> Self {
        match err {
            StageEditError::TargetNotFound(_) => AppError::NotFound(err.to_string()),
            StageEditError::PersistenceFailure(_) => AppError::Unprocessable(err.to_string()),
            StageEditError::EditorClosed => AppError::Conflict(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStatus {
    Closed,
    Open,
    Submitting,
}

/// Local, uncommitted copy of the editable stage fields
#[derive(Debug, Clone, PartialEq)]
pub struct StageForm {
    pub label: String,
    pub action: StageAction,
    pub reviewers: Vec<Reviewer>,
    pub minimum_approvals: u32,
    pub review_sequence: ReviewSequence,
}

impl StageForm {
    fn from_stage(stage: &Stage, terminal: bool) -> Self {
        let reviewers = dedup_reviewers(stage.reviewers.clone());
        let minimum_approvals = stage.minimum_approvals.min(count(&reviewers));
        Self {
            label: stage.label.clone(),
            action: if terminal { StageAction::Noop } else { stage.action },
            reviewers,
            minimum_approvals,
            review_sequence: stage.review_sequence,
        }
    }
}

fn count(reviewers: &[Reviewer]) -> u32 {
    u32::try_from(reviewers.len()).unwrap_or(u32::MAX)
}

pub struct StageEditor {
    workspace_id: String,
    pipeline: Pipeline,
    target: StageId,
    form: StageForm,
    status: EditorStatus,
    last_error: Option<String>,
    candidates: Vec<ReviewerCandidate>,
    loading_candidates: bool,
}

impl StageEditor {
    /// Open an editor on `stage`, working against `pipeline`
    pub fn open(workspace_id: impl Into<String>, pipeline: Pipeline, stage: &Stage) -> Self {
        let terminal = pipeline.is_terminal(&stage.id);
        let workspace_id = workspace_id.into();
        debug!(
            workspace = %workspace_id,
            stage = %stage.id,
            terminal,
            "Opening stage editor"
        );

        Self {
            form: StageForm::from_stage(stage, terminal),
            target: stage.id.clone(),
            workspace_id,
            pipeline,
            status: EditorStatus::Open,
            last_error: None,
            candidates: Vec::new(),
            loading_candidates: false,
        }
    }

    /// Re-read the target stage from the live pipeline and open again
    pub fn reopen(&mut self) -> Result<(), StageEditError> {
        let stage = self
            .pipeline
            .get(&self.target)
            .cloned()
            .ok_or_else(|| StageEditError::TargetNotFound(self.target.clone()))?;
        self.form = StageForm::from_stage(&stage, self.is_terminal());
        self.status = EditorStatus::Open;
        self.last_error = None;
        Ok(())
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn target(&self) -> &StageId {
        &self.target
    }

    pub fn form(&self) -> &StageForm {
        &self.form
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status != EditorStatus::Closed
    }

    /// Submit is only offered while open and idle
    pub fn can_submit(&self) -> bool {
        self.status == EditorStatus::Open
    }

    /// Message for the user after a failed submit
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn candidates(&self) -> &[ReviewerCandidate] {
        &self.candidates
    }

    pub fn candidate(&self, email: &str) -> Option<&ReviewerCandidate> {
        self.candidates.iter().find(|c| c.email == email)
    }

    pub fn is_loading_candidates(&self) -> bool {
        self.loading_candidates
    }

    /// Whether the target is currently the last stage of the live pipeline
    pub fn is_terminal(&self) -> bool {
        self.pipeline.is_terminal(&self.target)
    }

    /// Swap in a newer copy of the pipeline
    pub fn sync_pipeline(&mut self, pipeline: Pipeline) {
        self.pipeline = pipeline;
        if self.is_terminal() {
            self.form.action = StageAction::Noop;
        }
    }

    /// Fetch reviewer candidates, optionally restricted to `role`
    pub async fn load_candidates<D>(
        &mut self,
        directory: &D,
        role: Option<Role>,
    ) -> Result<(), AppError>
    where
        D: UserDirectory + ?Sized,
    {
        self.loading_candidates = true;
        let result = directory.list_users(role).await;
        self.loading_candidates = false;

        self.candidates = result?.iter().map(|u| u.candidate()).collect();
        debug!("Loaded {} reviewer candidates", self.candidates.len());
        Ok(())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.form.label = label.into();
    }

    /// Terminal stages always keep `noop`
    pub fn set_action(&mut self, action: StageAction) {
        self.form.action = if self.is_terminal() {
            StageAction::Noop
        } else {
            action
        };
    }

    /// Replace the reviewer set; the approval threshold follows it down
    pub fn set_reviewers(&mut self, reviewers: Vec<Reviewer>) {
        self.form.reviewers = dedup_reviewers(reviewers);
        self.form.minimum_approvals = self.form.minimum_approvals.min(count(&self.form.reviewers));
    }

    /// Clamped to the number of reviewers
    pub fn set_minimum_approvals(&mut self, minimum: u32) {
        self.form.minimum_approvals = minimum.min(count(&self.form.reviewers));
    }

    pub fn set_review_sequence(&mut self, sequence: ReviewSequence) {
        self.form.review_sequence = sequence;
    }

    /// Build the pipeline that a submit would persist.
    ///
    /// Every stage except the target is shared with the live pipeline.
    pub fn build_pipeline(&self) -> Result<Pipeline, StageEditError> {
        let current = self
            .pipeline
            .get(&self.target)
            .ok_or_else(|| StageEditError::TargetNotFound(self.target.clone()))?;

        let action = if self.is_terminal() {
            StageAction::Noop
        } else {
            self.form.action
        };

        let edited = Stage {
            id: current.id.clone(),
            label: self.form.label.clone(),
            action,
            reviewers: self.form.reviewers.clone(),
            minimum_approvals: self.form.minimum_approvals.min(count(&self.form.reviewers)),
            review_sequence: self.form.review_sequence,
            extra: current.extra.clone(),
        };

        self.pipeline
            .replace_stage(edited)
            .ok_or_else(|| StageEditError::TargetNotFound(self.target.clone()))
    }

    /// Persist the edited stage.
    ///
    /// On success the editor closes and the new pipeline is returned. On any
    /// failure the editor stays open and [`StageEditor::last_error`] holds the
    /// message for the user.
    pub async fn submit<U>(&mut self, updater: &U) -> Result<Pipeline, StageEditError>
    where
        U: PipelineUpdater + ?Sized,
    {
        if !self.can_submit() {
            return Err(StageEditError::EditorClosed);
        }

        let pipeline = match self.build_pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(workspace = %self.workspace_id, stage = %self.target, "{}", e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.status = EditorStatus::Submitting;
        self.last_error = None;

        match updater.update_pipeline(&self.workspace_id, &pipeline).await {
            Ok(()) => {
                info!(workspace = %self.workspace_id, stage = %self.target, "Stage updated");
                self.pipeline = pipeline.clone();
                self.status = EditorStatus::Closed;
                Ok(pipeline)
            }
            Err(e) => {
                let err = StageEditError::PersistenceFailure(e.user_message());
                warn!(workspace = %self.workspace_id, stage = %self.target, "{}", err);
                self.last_error = Some(err.to_string());
                self.status = EditorStatus::Open;
                Err(err)
            }
        }
    }

    /// Drop local edits and close
    pub fn cancel(&mut self) {
        if let Some(stage) = self.pipeline.get(&self.target).cloned() {
            self.form = StageForm::from_stage(&stage, self.is_terminal());
        }
        self.last_error = None;
        self.status = EditorStatus::Closed;
    }
}
