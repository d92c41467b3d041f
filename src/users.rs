//! User directory
//!
//! Workspace users, the reviewer candidates derived from them, and the
//! in-memory store that backs the directory.

use crate::auth::{hash_password, Role};
use crate::error::AppError;
use crate::pipeline::Reviewer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceUser {
    pub id: Uuid,
    pub email: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl WorkspaceUser {
    pub fn new(
        email: impl Into<String>,
        firstname: Option<&str>,
        lastname: Option<&str>,
        role: Role,
        password_hash: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            firstname: firstname.map(str::to_string),
            lastname: lastname.map(str::to_string),
            role,
            password_hash,
            created_at: Utc::now(),
        }
    }

    /// Full name, or the email when neither name part is set
    pub fn display_name(&self) -> String {
        let first = self.firstname.as_deref().unwrap_or("").trim();
        let last = self.lastname.as_deref().unwrap_or("").trim();
        let full = format!("{} {}", first, last).trim().to_string();
        if full.is_empty() {
            self.email.clone()
        } else {
            full
        }
    }

    fn has_name(&self) -> bool {
        [&self.firstname, &self.lastname]
            .iter()
            .any(|n| n.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }

    /// Option shown in the reviewer picker
    pub fn candidate(&self) -> ReviewerCandidate {
        let label = if self.has_name() {
            format!("{} · {}", self.display_name(), self.email)
        } else {
            self.email.clone()
        };

        ReviewerCandidate {
            email: self.email.clone(),
            label,
            display_name: self.display_name(),
        }
    }
}

/// A user that may be picked as a stage reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerCandidate {
    pub email: String,
    pub label: String,
    pub display_name: String,
}

impl ReviewerCandidate {
    pub fn to_reviewer(&self) -> Reviewer {
        Reviewer::new(self.email.clone(), self.display_name.clone())
    }
}

/// User response (without sensitive data)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&WorkspaceUser> for UserResponse {
    fn from(user: &WorkspaceUser) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Source of reviewer candidates
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// All users, or only those holding `role`
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<WorkspaceUser>, AppError>;
}

/// In-memory user store
pub struct UserStore {
    users: Arc<RwLock<HashMap<Uuid, WorkspaceUser>>>,
    email_index: Arc<RwLock<HashMap<String, Uuid>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            email_index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a new user
    ///
    /// Locks are always taken `users` first, then `email_index`.
    pub async fn create(&self, user: WorkspaceUser) -> Result<WorkspaceUser, AppError> {
        let mut users = self.users.write().await;
        let mut email_index = self.email_index.write().await;

        if email_index.contains_key(&user.email) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        email_index.insert(user.email.clone(), user.id);
        users.insert(user.id, user.clone());

        debug!("Registered user {} as {}", user.email, user.role);
        Ok(user)
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> Option<WorkspaceUser> {
        let users = self.users.read().await;
        let email_index = self.email_index.read().await;

        email_index.get(email).and_then(|id| users.get(id).cloned())
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Option<WorkspaceUser> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }

    /// Seed the administrator account
    pub async fn init_default_admin(
        &self,
        email: &str,
        password: &str,
        cost: u32,
    ) -> Result<(), AppError> {
        if self.find_by_email(email).await.is_some() {
            return Ok(());
        }

        let admin = WorkspaceUser::new(
            email,
            Some("Workspace"),
            Some("Admin"),
            Role::Admin,
            hash_password(password, cost)?,
        );
        self.create(admin).await?;

        info!("Seeded administrator account {}", email);
        Ok(())
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn list_users(&self, role: Option<Role>) -> Result<Vec<WorkspaceUser>, AppError> {
        let users = self.users.read().await;
        let mut listed: Vec<WorkspaceUser> = users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(listed)
    }
}
