//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::users::UserStore;
use crate::workspace::WorkspaceRepository;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Workspace store, in memory or PostgreSQL backed
    pub workspaces: Arc<dyn WorkspaceRepository>,

    /// User directory (has internal locking)
    pub users: UserStore,

    /// JWT secret key for token signing
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(workspaces: Arc<dyn WorkspaceRepository>, users: UserStore, jwt_secret: String) -> Self {
        Self {
            workspaces,
            users,
            jwt_secret,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
