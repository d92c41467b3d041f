//! Route definitions and router setup
//!
//! Configures all API routes and middleware.

mod auth;
mod telegram;
mod users;
mod workspace;

use crate::auth::auth_middleware;
use crate::config::Settings;
use crate::state::SharedState;
use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::MakeRequestUuid,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
    ServiceBuilderExt,
};
use tracing::Level;

/// Create the application router with all routes and middleware
pub fn create_router(state: SharedState, settings: &Settings) -> Router {
    let cors = build_cors_layer(settings);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let middleware_stack = ServiceBuilder::new()
        .set_x_request_id(MakeRequestUuid)
        .layer(trace_layer)
        .layer(CompressionLayer::new())
        .layer(cors)
        .propagate_x_request_id();

    // Everything below requires a valid bearer token
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/admin/workspaces", get(workspace::list_workspaces))
        .route("/api/admin/workspaces/{id}", get(workspace::get_workspace))
        .route(
            "/api/admin/workspaces/{id}/pipeline",
            post(workspace::update_pipeline),
        )
        .route(
            "/api/admin/workspaces/{id}/stages/{stage_id}",
            put(workspace::edit_stage),
        )
        .route("/api/admin/users", get(users::list_users))
        .route(
            "/api/integrations/telegram/payload/validate",
            post(telegram::validate_payload),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .merge(protected)
        .layer(middleware_stack)
        .with_state(state)
}

/// Build CORS layer from settings
fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<_> = settings
        .cors
        .allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = if origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(origins)
    };

    layer
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Health check endpoint
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "success": true,
        "message": "Server is running fine.",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{create_tokens, Role};
    use crate::pipeline::{Pipeline, Stage, StageAction};
    use crate::state::AppState;
    use crate::users::{UserStore, WorkspaceUser};
    use crate::workspace::{default_pipeline, MemoryWorkspaceStore, Workspace, WorkspaceRepository};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const SECRET: &str = "router-test-secret";

    struct Harness {
        server: TestServer,
        store: Arc<MemoryWorkspaceStore>,
        admin_token: String,
        viewer_token: String,
    }

    async fn harness() -> Harness {
        let store = Arc::new(MemoryWorkspaceStore::new());
        let mut ws = Workspace::new(
            "ws-1",
            "Marketing",
            Pipeline::new(vec![
                Stage::new("1", "Draft", StageAction::PromoteCopy),
                Stage::new("2", "Live", StageAction::Noop),
            ]),
        );
        ws.admin_role = Some(Role::Reviewer);
        store.save_workspace(ws).await.unwrap();

        let users = UserStore::new();
        let admin = users
            .create(WorkspaceUser::new("admin@x.io", None, None, Role::Admin, String::new()))
            .await
            .unwrap();
        let viewer = users
            .create(WorkspaceUser::new("viewer@x.io", None, None, Role::Viewer, String::new()))
            .await
            .unwrap();
        users
            .create(WorkspaceUser::new(
                "rev@x.io",
                Some("Rae"),
                Some("View"),
                Role::Reviewer,
                String::new(),
            ))
            .await
            .unwrap();

        let admin_token = create_tokens(admin.id, &admin.email, admin.role, SECRET)
            .unwrap()
            .access_token;
        let viewer_token = create_tokens(viewer.id, &viewer.email, viewer.role, SECRET)
            .unwrap()
            .access_token;

        let state = Arc::new(AppState::new(store.clone(), users, SECRET.to_string()));
        Harness {
            server: TestServer::new(create_router(state, &Settings::default())).unwrap(),
            store,
            admin_token,
            viewer_token,
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let h = harness().await;
        h.server.get("/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let h = harness().await;
        h.server
            .get("/api/admin/workspaces")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_viewer_is_forbidden() {
        let h = harness().await;
        h.server
            .get("/api/admin/workspaces")
            .authorization_bearer(&h.viewer_token)
            .await
            .assert_status_forbidden();
    }

    #[tokio::test]
    async fn test_workspace_listing() {
        let h = harness().await;
        let response = h
            .server
            .get("/api/admin/workspaces")
            .authorization_bearer(&h.admin_token)
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["workspaces"][0]["id"], "ws-1");
        assert_eq!(body["workspaces"][0]["adminRole"], "reviewer");
    }

    #[tokio::test]
    async fn test_edit_stage_persists_through_store() {
        let h = harness().await;
        let response = h
            .server
            .put("/api/admin/workspaces/ws-1/stages/1")
            .authorization_bearer(&h.admin_token)
            .json(&json!({
                "action": "promote_move",
                "reviewers": ["rev@x.io", "rev@x.io"],
                "minimumApprovals": 5
            }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["stage"]["action"], "promote_move");
        assert_eq!(body["stage"]["minimumApprovals"], 1);
        assert_eq!(body["stage"]["reviewers"][0]["displayName"], "Rae View");

        let stored = h.store.get_workspace("ws-1").await.unwrap();
        assert!(stored.custom_pipeline);
        assert_eq!(stored.pipeline.stages()[1].action, StageAction::Noop);
    }

    #[tokio::test]
    async fn test_edit_terminal_stage_keeps_noop() {
        let h = harness().await;
        let response = h
            .server
            .put("/api/admin/workspaces/ws-1/stages/2")
            .authorization_bearer(&h.admin_token)
            .json(&json!({ "action": "promote_copy", "label": "Published" }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["stage"]["action"], "noop");
        assert_eq!(body["stage"]["label"], "Published");
    }

    #[tokio::test]
    async fn test_stage_label_may_be_cleared() {
        let h = harness().await;
        let response = h
            .server
            .put("/api/admin/workspaces/ws-1/stages/1")
            .authorization_bearer(&h.admin_token)
            .json(&json!({ "label": "" }))
            .await;
        response.assert_status_ok();

        let stored = h.store.get_workspace("ws-1").await.unwrap();
        assert_eq!(stored.pipeline.stages()[0].label, "");
    }

    #[tokio::test]
    async fn test_ineligible_reviewer_is_rejected() {
        let h = harness().await;
        h.server
            .put("/api/admin/workspaces/ws-1/stages/1")
            .authorization_bearer(&h.admin_token)
            .json(&json!({ "reviewers": ["viewer@x.io"] }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_unknown_stage_is_not_found() {
        let h = harness().await;
        h.server
            .put("/api/admin/workspaces/ws-1/stages/99")
            .authorization_bearer(&h.admin_token)
            .json(&json!({ "label": "x" }))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_invalid_pipeline_replacement_is_rejected() {
        let h = harness().await;
        h.server
            .post("/api/admin/workspaces/ws-1/pipeline")
            .authorization_bearer(&h.admin_token)
            .json(&json!({
                "updateCustom": true,
                "pipeline": [
                    { "id": 1, "label": "A", "action": "noop" },
                    { "id": 1, "label": "B", "action": "noop" }
                ]
            }))
            .await
            .assert_status_bad_request();

        let stored = h.store.get_workspace("ws-1").await.unwrap();
        assert_eq!(stored.pipeline.len(), 2);
        assert!(!stored.custom_pipeline);
    }

    #[tokio::test]
    async fn test_pipeline_replacement() {
        let h = harness().await;
        let response = h
            .server
            .post("/api/admin/workspaces/ws-1/pipeline")
            .authorization_bearer(&h.admin_token)
            .json(&json!({ "updateCustom": false, "pipeline": default_pipeline() }))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["workspace"]["pipeline"].as_array().unwrap().len(), 3);
        assert_eq!(body["workspace"]["customPipeline"], false);
    }

    #[tokio::test]
    async fn test_user_listing_by_role() {
        let h = harness().await;
        let response = h
            .server
            .get("/api/admin/users")
            .add_query_param("role", "reviewer")
            .authorization_bearer(&h.admin_token)
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["candidates"][0]["label"], "Rae View · rev@x.io");
        assert_eq!(body["users"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_telegram_payload_validation() {
        let h = harness().await;
        let bad = h
            .server
            .post("/api/integrations/telegram/payload/validate")
            .authorization_bearer(&h.viewer_token)
            .json(&json!([{ "function_name": "sendLocation", "latitude": 95.0, "longitude": 0.0 }]))
            .await;
        bad.assert_status_bad_request();
        let body: Value = bad.json();
        assert!(body["message"].as_str().unwrap().contains("[0]"));

        h.server
            .post("/api/integrations/telegram/payload/validate")
            .authorization_bearer(&h.viewer_token)
            .json(&json!([{ "function_name": "sendMessage", "text": "hi" }]))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_login_and_me() {
        let users = UserStore::new();
        users
            .init_default_admin("root@x.io", "secret-pw", 4)
            .await
            .unwrap();
        let state = Arc::new(AppState::new(
            Arc::new(MemoryWorkspaceStore::new()),
            users,
            SECRET.to_string(),
        ));
        let server = TestServer::new(create_router(state, &Settings::default())).unwrap();

        server
            .post("/api/auth/login")
            .json(&json!({ "email": "root@x.io", "password": "nope" }))
            .await
            .assert_status_unauthorized();

        let ok = server
            .post("/api/auth/login")
            .json(&json!({ "email": "root@x.io", "password": "secret-pw" }))
            .await;
        ok.assert_status_ok();
        let body: Value = ok.json();
        let token = body["tokens"]["accessToken"].as_str().unwrap().to_string();

        let me = server.get("/api/auth/me").authorization_bearer(&token).await;
        me.assert_status_ok();
        let body: Value = me.json();
        assert_eq!(body["user"]["email"], "root@x.io");
        assert_eq!(body["user"]["role"], "admin");
    }
}
