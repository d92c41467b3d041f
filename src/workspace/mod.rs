//! Workspaces
//!
//! A workspace owns exactly one approval pipeline. Stores implement
//! [`WorkspaceRepository`] and, through it, the [`PipelineUpdater`] contract the
//! stage editor persists through.

pub mod memory;
pub mod postgres;

pub use memory::MemoryWorkspaceStore;
pub use postgres::PgWorkspaceStore;

use crate::auth::Role;
use crate::error::AppError;
use crate::pipeline::{Pipeline, PipelineUpdater, Reviewer, Stage, StageAction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    /// Only users with this role are offered as reviewers
    pub admin_role: Option<Role>,
    pub pipeline: Pipeline,
    /// Set once the pipeline was edited instead of taken from the preset
    pub custom_pipeline: bool,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(id: impl Into<String>, name: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            admin_role: None,
            pipeline,
            custom_pipeline: false,
            updated_at: Utc::now(),
        }
    }
}

/// Preset used for freshly seeded workspaces
pub fn default_pipeline() -> Pipeline {
    Pipeline::new(vec![
        Stage::new("dev", "Development", StageAction::PromoteCopy),
        Stage::new("staging", "Staging", StageAction::PromoteCopy),
        Stage::new("prod", "Production", StageAction::Noop),
    ])
}

/// Preset pipeline with a reviewer attached to the staging gate
pub fn default_pipeline_with_reviewer(reviewer: Reviewer) -> Pipeline {
    let stages = default_pipeline()
        .stages()
        .iter()
        .map(|s| {
            let stage = (**s).clone();
            if stage.id.as_str() == "staging" {
                stage.with_reviewers(vec![reviewer.clone()], 1)
            } else {
                stage
            }
        })
        .collect();
    Pipeline::new(stages)
}

#[async_trait]
pub trait WorkspaceRepository: PipelineUpdater {
    async fn get_workspace(&self, id: &str) -> Result<Workspace, AppError>;

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, AppError>;

    /// Insert or overwrite a workspace; its pipeline must be valid
    async fn save_workspace(&self, workspace: Workspace) -> Result<Workspace, AppError>;

    /// Replace the whole pipeline of an existing workspace
    async fn replace_pipeline(
        &self,
        id: &str,
        pipeline: Pipeline,
        update_custom: bool,
    ) -> Result<Workspace, AppError>;
}

/// Create workspace `id` with the preset pipeline when the store has none.
///
/// Returns `true` when the workspace was created. Read errors other than
/// NotFound are returned so an existing workspace is never overwritten.
pub async fn ensure_workspace(
    repo: &dyn WorkspaceRepository,
    id: &str,
    name: &str,
    reviewer: Reviewer,
) -> Result<bool, AppError> {
    match repo.get_workspace(id).await {
        Ok(_) => Ok(false),
        Err(AppError::NotFound(_)) => {
            let mut workspace = Workspace::new(id, name, default_pipeline_with_reviewer(reviewer));
            workspace.admin_role = Some(Role::Admin);
            repo.save_workspace(workspace).await?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

fn workspace_not_found(id: &str) -> AppError {
    crate::error::not_found_error(format!("Workspace {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose reads always fail; counts writes
    #[derive(Default)]
    struct UnreadableStore {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl PipelineUpdater for UnreadableStore {
        async fn update_pipeline(&self, _: &str, _: &Pipeline) -> Result<(), AppError> {
            Ok(())
        }
    }

    #[async_trait]
    impl WorkspaceRepository for UnreadableStore {
        async fn get_workspace(&self, _: &str) -> Result<Workspace, AppError> {
            Err(AppError::Internal("connection reset".to_string()))
        }

        async fn list_workspaces(&self) -> Result<Vec<Workspace>, AppError> {
            Ok(Vec::new())
        }

        async fn save_workspace(&self, workspace: Workspace) -> Result<Workspace, AppError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(workspace)
        }

        async fn replace_pipeline(
            &self,
            id: &str,
            _: Pipeline,
            _: bool,
        ) -> Result<Workspace, AppError> {
            Err(workspace_not_found(id))
        }
    }

    #[tokio::test]
    async fn test_read_error_does_not_seed() {
        let store = UnreadableStore::default();
        let result = ensure_workspace(&store, "default", "Default", Reviewer::new("a@x.io", "A")).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_seeds_only_when_missing() {
        let store = MemoryWorkspaceStore::new();
        let reviewer = Reviewer::new("a@x.io", "A");

        assert!(ensure_workspace(&store, "default", "Default", reviewer.clone()).await.unwrap());
        let custom = Pipeline::new(vec![Stage::new("only", "Only", StageAction::Noop)]);
        store.replace_pipeline("default", custom.clone(), true).await.unwrap();

        assert!(!ensure_workspace(&store, "default", "Default", reviewer).await.unwrap());
        let stored = store.get_workspace("default").await.unwrap();
        assert_eq!(stored.pipeline, custom);
        assert_eq!(stored.admin_role, Some(Role::Admin));
    }

    #[test]
    fn test_default_pipeline_is_valid() {
        let pipeline = default_pipeline();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.validate(), Ok(()));
        assert!(pipeline.is_terminal(&"prod".into()));
    }

    #[test]
    fn test_seeded_reviewer_sits_on_staging() {
        let pipeline = default_pipeline_with_reviewer(Reviewer::new("a@x.io", "A"));
        let staging = pipeline.get(&"staging".into()).unwrap();
        assert_eq!(staging.minimum_approvals, 1);
        assert_eq!(pipeline.validate(), Ok(()));
    }
}
