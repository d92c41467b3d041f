//! PostgreSQL workspace store
//!
//! Pipelines are stored as JSONB next to the workspace row, so a pipeline
//! update is a single-row replacement.

use super::{workspace_not_found, Workspace, WorkspaceRepository};
use crate::auth::Role;
use crate::error::AppError;
use crate::pipeline::{Pipeline, PipelineUpdater};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::types::Json;
use tokio_postgres::Row;
use tracing::{debug, info};

const SELECT_WORKSPACE: &str =
    "SELECT id, name, admin_role, pipeline, custom_pipeline, updated_at FROM workspaces";

pub struct PgWorkspaceStore {
    pool: Pool,
}

impl PgWorkspaceStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the workspaces table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        client
            .execute(
                "CREATE TABLE IF NOT EXISTS workspaces (
                    id VARCHAR(128) PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    admin_role VARCHAR(32),
                    pipeline JSONB NOT NULL,
                    custom_pipeline BOOLEAN NOT NULL DEFAULT false,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
                &[],
            )
            .await?;

        info!("✅ Workspace table initialized");
        Ok(())
    }

    /// Map a row, turning undecodable columns into errors instead of panics
    fn from_row(row: &Row) -> Result<Workspace, AppError> {
        let admin_role = decode_admin_role(row.try_get(2)?)?;
        let Json(pipeline): Json<Pipeline> = row.try_get(3)?;
        let updated_at: DateTime<Utc> = row.try_get(5)?;

        Ok(Workspace {
            id: row.try_get(0)?,
            name: row.try_get(1)?,
            admin_role,
            pipeline,
            custom_pipeline: row.try_get(4)?,
            updated_at,
        })
    }
}

fn decode_admin_role(raw: Option<String>) -> Result<Option<Role>, AppError> {
    raw.map(|r| r.parse::<Role>())
        .transpose()
        .map_err(|e| AppError::Internal(format!("Stored workspace has a bad admin_role: {}", e)))
}

#[async_trait]
impl WorkspaceRepository for PgWorkspaceStore {
    async fn get_workspace(&self, id: &str) -> Result<Workspace, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(&format!("{} WHERE id = $1", SELECT_WORKSPACE), &[&id])
            .await?
            .ok_or_else(|| workspace_not_found(id))?;
        Self::from_row(&row)
    }

    async fn list_workspaces(&self) -> Result<Vec<Workspace>, AppError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(&format!("{} ORDER BY id", SELECT_WORKSPACE), &[])
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn save_workspace(&self, workspace: Workspace) -> Result<Workspace, AppError> {
        workspace.pipeline.validate()?;

        let client = self.pool.get().await?;
        let admin_role = workspace.admin_role.map(|r| r.to_string());
        client
            .execute(
                "INSERT INTO workspaces (id, name, admin_role, pipeline, custom_pipeline, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    admin_role = EXCLUDED.admin_role,
                    pipeline = EXCLUDED.pipeline,
                    custom_pipeline = EXCLUDED.custom_pipeline,
                    updated_at = EXCLUDED.updated_at",
                &[
                    &workspace.id,
                    &workspace.name,
                    &admin_role,
                    &Json(&workspace.pipeline),
                    &workspace.custom_pipeline,
                    &workspace.updated_at,
                ],
            )
            .await?;

        debug!("Saved workspace {}", workspace.id);
        Ok(workspace)
    }

    async fn replace_pipeline(
        &self,
        id: &str,
        pipeline: Pipeline,
        update_custom: bool,
    ) -> Result<Workspace, AppError> {
        pipeline.validate()?;

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "UPDATE workspaces
                 SET pipeline = $2,
                     custom_pipeline = custom_pipeline OR $3,
                     updated_at = $4
                 WHERE id = $1
                 RETURNING id, name, admin_role, pipeline, custom_pipeline, updated_at",
                &[&id, &Json(&pipeline), &update_custom, &Utc::now()],
            )
            .await?
            .ok_or_else(|| workspace_not_found(id))?;

        debug!("Replaced pipeline of workspace {} ({} stages)", id, pipeline.len());
        Self::from_row(&row)
    }
}

#[async_trait]
impl PipelineUpdater for PgWorkspaceStore {
    async fn update_pipeline(&self, workspace_id: &str, pipeline: &Pipeline) -> Result<(), AppError> {
        self.replace_pipeline(workspace_id, pipeline.clone(), true)
            .await
            .map(|_| ())
    }
}
