//! Pipeline Admin API
//!
//! Workspace administration service: approval pipelines, single-stage edits
//! through a stage editor session, a reviewer directory, and validation of
//! Telegram bot payloads.
//!
//! Workspaces live in PostgreSQL when DATABASE_URL is set and in memory
//! otherwise.

mod auth;
mod config;
mod db;
mod error;
mod models;
mod pipeline;
mod routes;
mod state;
mod telegram;
mod users;
mod workspace;

use crate::auth::PASSWORD_COST;
use crate::config::Settings;
use crate::pipeline::Reviewer;
use crate::routes::create_router;
use crate::state::AppState;
use crate::users::UserStore;
use crate::workspace::{ensure_workspace, MemoryWorkspaceStore, PgWorkspaceStore, WorkspaceRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting Pipeline Admin API...");

    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    if std::env::var("JWT_SECRET").is_err() {
        warn!("⚠️  JWT_SECRET not set, using default (INSECURE - set in production!)");
    }

    let workspaces: Arc<dyn WorkspaceRepository> = match &settings.database {
        Some(db_config) => {
            let pool = db::create_pool(db_config).await?;
            let store = PgWorkspaceStore::new(pool);
            store.ensure_schema().await?;
            info!("✅ Using PostgreSQL workspace store");
            Arc::new(store)
        }
        None => {
            warn!("⚠️  DATABASE_URL not set, workspaces are kept in memory");
            Arc::new(MemoryWorkspaceStore::new())
        }
    };

    let users = UserStore::new();
    users
        .init_default_admin(
            &settings.auth.admin_email,
            &settings.auth.admin_password,
            PASSWORD_COST,
        )
        .await?;

    seed_default_workspace(workspaces.as_ref(), &users, &settings).await?;

    let state = Arc::new(AppState::new(
        workspaces,
        users,
        settings.auth.jwt_secret.clone(),
    ));

    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("📚 API Endpoints:");
    info!("   POST /api/auth/login                              - Login with email/password");
    info!("   POST /api/auth/refresh                            - Refresh access token");
    info!("   GET  /api/auth/me                                 - Get current user");
    info!("   GET  /api/admin/workspaces                        - List workspaces");
    info!("   GET  /api/admin/workspaces/{{id}}                   - Get workspace");
    info!("   POST /api/admin/workspaces/{{id}}/pipeline          - Replace pipeline");
    info!("   PUT  /api/admin/workspaces/{{id}}/stages/{{stageId}}  - Edit one stage");
    info!("   GET  /api/admin/users?role=                       - Reviewer directory");
    info!("   POST /api/integrations/telegram/payload/validate  - Validate bot payload");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pipeline_admin=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Create the configured default workspace unless it already exists
async fn seed_default_workspace(
    workspaces: &dyn WorkspaceRepository,
    users: &UserStore,
    settings: &Settings,
) -> anyhow::Result<()> {
    let admin = users
        .find_by_email(&settings.auth.admin_email)
        .await
        .ok_or_else(|| anyhow::anyhow!("Seeded administrator account is missing"))?;
    let reviewer = Reviewer::new(admin.email.clone(), admin.display_name());

    let id = &settings.workspace.default_workspace;
    if ensure_workspace(workspaces, id, "Default workspace", reviewer).await? {
        info!("🌱 Seeded workspace {}", id);
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
