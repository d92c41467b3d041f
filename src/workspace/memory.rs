//! In-memory workspace store

use super::{workspace_not_found, Workspace, WorkspaceRepository};
use crate::error::AppError;
use crate::pipeline::{Pipeline, PipelineUpdater};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Thread-safe workspace store
pub struct MemoryWorkspaceStore {
    workspaces: Arc<RwLock<HashMap<String, Workspace>>>,
}

impl MemoryWorkspaceStore {
    pub fn new() -> Self {
        Self {
            workspaces: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryWorkspaceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkspaceRepository for MemoryWorkspaceStore {
    async fn get_workspace(&self, id: &str) -> Result<Workspace, AppError> {
        let workspaces = self.workspaces.read().await;
        workspaces
            .get(id)
            .cloned()
            .ok_or_else(|| workspace_not_found(id))
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, AppError> {
        let workspaces = self.workspaces.read().await;
        let mut listed: Vec<Workspace> = workspaces.values().cloned().collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }

    async fn save_workspace(&self, workspace: Workspace) -> Result<Workspace, AppError> {
        workspace.pipeline.validate()?;
        let mut workspaces = self.workspaces.write().await;
        workspaces.insert(workspace.id.clone(), workspace.clone());
        Ok(workspace)
    }

    async fn replace_pipeline(
        &self,
        id: &str,
        pipeline: Pipeline,
        update_custom: bool,
    ) -> Result<Workspace, AppError> {
        pipeline.validate()?;

        let mut workspaces = self.workspaces.write().await;
        let workspace = workspaces
            .get_mut(id)
            .ok_or_else(|| workspace_not_found(id))?;

        workspace.pipeline = pipeline;
        workspace.custom_pipeline |= update_custom;
        workspace.updated_at = Utc::now();

        debug!("Replaced pipeline of workspace {} ({} stages)", id, workspace.pipeline.len());
        Ok(workspace.clone())
    }
}

#[async_trait]
impl PipelineUpdater for MemoryWorkspaceStore {
    async fn update_pipeline(&self, workspace_id: &str, pipeline: &Pipeline) -> Result<(), AppError> {
        self.replace_pipeline(workspace_id, pipeline.clone(), true)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Stage, StageAction, StageEditor};
    use crate::workspace::default_pipeline;
    use pretty_assertions::assert_eq;

    async fn seeded() -> MemoryWorkspaceStore {
        let store = MemoryWorkspaceStore::new();
        store
            .save_workspace(Workspace::new("default", "Default", default_pipeline()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_unknown_workspace() {
        let store = seeded().await;
        let err = store.get_workspace("nope").await.unwrap_err();
        assert_eq!(err.user_message(), "Workspace nope not found");
    }

    #[tokio::test]
    async fn test_replace_pipeline_marks_custom() {
        let store = seeded().await;
        let pipeline = Pipeline::new(vec![Stage::new("only", "Only", StageAction::Noop)]);

        let updated = store.replace_pipeline("default", pipeline.clone(), true).await.unwrap();
        assert!(updated.custom_pipeline);
        assert_eq!(updated.pipeline, pipeline);
        assert_eq!(store.get_workspace("default").await.unwrap().pipeline, pipeline);
    }

    #[tokio::test]
    async fn test_invalid_pipeline_is_rejected_and_not_stored() {
        let store = seeded().await;
        let forwards = Pipeline::new(vec![Stage::new("only", "Only", StageAction::PromoteMove)]);

        let err = store.replace_pipeline("default", forwards, true).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.get_workspace("default").await.unwrap().pipeline, default_pipeline());
    }

    #[tokio::test]
    async fn test_editor_submits_through_store() {
        let store = seeded().await;
        let workspace = store.get_workspace("default").await.unwrap();
        let stage = workspace.pipeline.get(&"dev".into()).unwrap().clone();

        let mut editor = StageEditor::open(workspace.id.clone(), workspace.pipeline.clone(), &stage);
        editor.set_action(StageAction::PromoteMove);
        editor.submit(&store).await.unwrap();

        let stored = store.get_workspace("default").await.unwrap();
        assert_eq!(stored.pipeline.stages()[0].action, StageAction::PromoteMove);
        assert!(stored.custom_pipeline);
    }

    #[tokio::test]
    async fn test_editor_surfaces_store_rejection() {
        let store = MemoryWorkspaceStore::new();
        let pipeline = default_pipeline();
        let stage = pipeline.stages()[0].clone();

        // workspace was never saved
        let mut editor = StageEditor::open("ghost", pipeline, &stage);
        let err = editor.submit(&store).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error while updating pipeline: Workspace ghost not found"
        );
        assert!(editor.can_submit());
    }
}
