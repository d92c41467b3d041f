//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
        }
    }
}

/// Database configuration for the PostgreSQL workspace store
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    pub require_tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            max_pool_size: 10,
            require_tls: false,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Authentication and seed account configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "pipeline-admin-dev-secret-change-in-production".to_string(),
            admin_email: "admin@pipeline.local".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

/// Workspace seeding configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    pub default_workspace: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            default_workspace: "default".to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    /// `None` keeps workspaces in memory
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub workspace: WorkspaceConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: match lookup("HOST") {
                Some(h) => h
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(format!("HOST is not an IPv4 address: {}", h)))?,
                None => ServerConfig::default().host,
            },
            port: match lookup("PORT") {
                Some(p) => p
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(format!("PORT is not a valid port: {}", p)))?,
                None => ServerConfig::default().port,
            },
        };

        let max_pool_size = match lookup("DB_MAX_CONNECTIONS") {
            Some(n) => n.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("DB_MAX_CONNECTIONS is not a valid pool size: {}", n))
            })?,
            None => DatabaseConfig::default().max_pool_size,
        };

        let database = match lookup("DATABASE_URL") {
            Some(url) if !url.trim().is_empty() => {
                Some(Self::parse_database_url(&url, max_pool_size)?)
            }
            _ => None,
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            admin_email: lookup("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: lookup("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
        };

        let workspace = WorkspaceConfig {
            default_workspace: lookup("DEFAULT_WORKSPACE")
                .unwrap_or_else(|| WorkspaceConfig::default().default_workspace),
        };

        Ok(Self {
            server,
            database,
            cors,
            auth,
            workspace,
        })
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    ///
    /// Credentials in the URL may be percent-encoded.
    fn parse_database_url(url: &str, max_pool_size: usize) -> Result<DatabaseConfig, ConfigError> {
        use tokio_postgres::config::{Host, SslMode};

        let config = url.parse::<tokio_postgres::Config>().map_err(|e| {
            ConfigError::InvalidValue(format!("Invalid DATABASE_URL: {}", e))
        })?;

        let host = match config.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            Some(_) => {
                return Err(ConfigError::InvalidValue(
                    "Unix socket connections are not supported".to_string(),
                ))
            }
            None => {
                return Err(ConfigError::InvalidValue(
                    "Missing host in DATABASE_URL".to_string(),
                ))
            }
        };

        let database = config
            .get_dbname()
            .filter(|db| !db.is_empty())
            .ok_or_else(|| {
                ConfigError::InvalidValue("Missing database name in DATABASE_URL".to_string())
            })?
            .to_string();

        let password = match config.get_password() {
            Some(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| {
                ConfigError::InvalidValue("DATABASE_URL password is not valid UTF-8".to_string())
            })?,
            None => String::new(),
        };

        Ok(DatabaseConfig {
            host,
            port: config.get_ports().first().copied().unwrap_or(5432),
            user: config.get_user().unwrap_or_default().to_string(),
            password,
            database,
            max_pool_size,
            require_tls: matches!(config.get_ssl_mode(), SslMode::Require),
        })
    }
}
