//! Workspace and pipeline admin routes
//!
//! Stage edits run through a [`StageEditor`] session so they obey the same
//! rules as any other editing client.

use crate::auth::{require_role, Claims, Role};
use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::SuccessResponse;
use crate::pipeline::{Pipeline, ReviewSequence, Reviewer, Stage, StageAction, StageEditor, StageId};
use crate::state::SharedState;
use crate::workspace::Workspace;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceListResponse {
    pub workspaces: Vec<Workspace>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceResponse {
    pub workspace: Workspace,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    pub stage: Arc<Stage>,
    pub pipeline: Pipeline,
}

/// Full pipeline replacement
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePipelineRequest {
    #[serde(default)]
    pub update_custom: bool,
    pub pipeline: Pipeline,
}

/// Partial stage edit; absent fields keep their current value
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditStageRequest {
    #[validate(length(max = 100, message = "Label must be at most 100 characters"))]
    pub label: Option<String>,
    pub action: Option<StageAction>,
    /// Reviewer emails, resolved against the user directory
    pub reviewers: Option<Vec<String>>,
    pub minimum_approvals: Option<u32>,
    pub review_sequence: Option<ReviewSequence>,
}

/// GET /api/admin/workspaces
pub async fn list_workspaces(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse<WorkspaceListResponse>>> {
    require_role(&claims, Role::Admin)?;

    let workspaces = state.workspaces.list_workspaces().await?;
    Ok(Json(SuccessResponse::with_data(
        format!("{} workspaces", workspaces.len()),
        WorkspaceListResponse { workspaces },
    )))
}

/// GET /api/admin/workspaces/{id}
pub async fn get_workspace(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse<WorkspaceResponse>>> {
    require_role(&claims, Role::Admin)?;

    let workspace = state.workspaces.get_workspace(&id).await?;
    Ok(Json(SuccessResponse::with_data(
        "Workspace loaded",
        WorkspaceResponse { workspace },
    )))
}

/// POST /api/admin/workspaces/{id}/pipeline
pub async fn update_pipeline(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePipelineRequest>,
) -> ApiResult<Json<SuccessResponse<WorkspaceResponse>>> {
    require_role(&claims, Role::Admin)?;

    let workspace = state
        .workspaces
        .replace_pipeline(&id, req.pipeline, req.update_custom)
        .await?;

    info!("{} replaced the pipeline of workspace {}", claims.email, id);
    Ok(Json(SuccessResponse::with_data(
        "Pipeline updated",
        WorkspaceResponse { workspace },
    )))
}

/// PUT /api/admin/workspaces/{id}/stages/{stage_id}
pub async fn edit_stage(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((id, stage_id)): Path<(String, String)>,
    Json(req): Json<EditStageRequest>,
) -> ApiResult<Json<SuccessResponse<StageResponse>>> {
    require_role(&claims, Role::Admin)?;
    req.validate()?;

    let workspace = state.workspaces.get_workspace(&id).await?;
    let stage_id = StageId::new(stage_id);
    let stage = workspace.pipeline.get(&stage_id).cloned().ok_or_else(|| {
        not_found_error(format!("Stage {} not found in workspace {}", stage_id, id))
    })?;

    let mut editor = StageEditor::open(workspace.id.clone(), workspace.pipeline.clone(), &stage);

    if let Some(label) = req.label {
        editor.set_label(label);
    }
    if let Some(action) = req.action {
        editor.set_action(action);
    }
    if let Some(emails) = req.reviewers {
        editor.load_candidates(&state.users, workspace.admin_role).await?;
        let reviewers = emails
            .iter()
            .map(|email| {
                editor
                    .candidate(email)
                    .map(|c| c.to_reviewer())
                    .ok_or_else(|| validation_error(format!("{} cannot review this workspace", email)))
            })
            .collect::<ApiResult<Vec<Reviewer>>>()?;
        editor.set_reviewers(reviewers);
    }
    if let Some(minimum) = req.minimum_approvals {
        editor.set_minimum_approvals(minimum);
    }
    if let Some(sequence) = req.review_sequence {
        editor.set_review_sequence(sequence);
    }

    let pipeline = editor.submit(&*state.workspaces).await?;
    let stage = pipeline
        .get(&stage_id)
        .cloned()
        .ok_or_else(|| not_found_error(format!("Stage {} not found in workspace {}", stage_id, id)))?;

    info!("{} edited stage {} of workspace {}", claims.email, stage_id, id);
    Ok(Json(SuccessResponse::with_data(
        "Stage updated",
        StageResponse { stage, pipeline },
    )))
}
