//! agora-web: HTTP server for agora reviews
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    agora-web Server (:8080)                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  GET    /api/health                         - Health check      │
//! │  GET    /api/agents/:agent_id/reviews       - Sorted listing    │
//! │  GET    /api/agents/:agent_id/reviews/mine  - Caller's review   │
//! │  GET    /api/agents/:agent_id/rating        - Aggregate stats   │
//! │  POST   /api/reviews                        - Create            │
//! │  PUT    /api/reviews/:id                    - Edit              │
//! │  DELETE /api/reviews/:id                    - Delete            │
//! │  POST   /api/reviews/:id/helpful            - Helpful vote      │
//! │  PUT    /api/reviews/:id/status             - Moderate          │
//! │  GET    /metrics                            - Prometheus        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod sessions;
pub mod state;

pub use routes::create_router;
pub use sessions::SessionRegistry;
pub use state::AppState;

use agora_core::config::{get_config, get_config_bool, get_config_int, get_config_opt};
use middleware::MiddlewareConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://agora.db?mode=rwc";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub database_url: String,
    pub sessions_file: Option<PathBuf>,
    pub auto_publish: bool,
    pub enable_cors: bool,
    /// None allows any origin
    pub cors_origins: Option<Vec<String>>,
    pub compression: bool,
    pub request_timeout: Duration,
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            sessions_file: None,
            auto_publish: true,
            enable_cors: true,
            cors_origins: None,
            compression: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Reads `AGORA_BIND`, `AGORA_DATABASE_URL`, `AGORA_SESSIONS_FILE`,
    /// `AGORA_AUTO_PUBLISH`, `AGORA_CORS_ORIGINS` (comma separated),
    /// `AGORA_COMPRESSION`, `AGORA_REQUEST_TIMEOUT_SECS` and
    /// `AGORA_REQUEST_LOGGING`.
    pub fn from_env() -> Self {
        let timeout_secs = get_config_int(
            "AGORA_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS as i64,
        );
        Self {
            bind: get_config("AGORA_BIND", DEFAULT_BIND),
            database_url: get_config("AGORA_DATABASE_URL", DEFAULT_DATABASE_URL),
            sessions_file: get_config_opt("AGORA_SESSIONS_FILE").map(PathBuf::from),
            auto_publish: get_config_bool("AGORA_AUTO_PUBLISH", true),
            enable_cors: true,
            cors_origins: get_config_opt("AGORA_CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .filter(|origins| !origins.is_empty()),
            compression: get_config_bool("AGORA_COMPRESSION", true),
            request_timeout: Duration::from_secs(
                u64::try_from(timeout_secs)
                    .ok()
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            request_logging: get_config_bool("AGORA_REQUEST_LOGGING", true),
        }
    }

    pub fn middleware(&self) -> MiddlewareConfig {
        let config = MiddlewareConfig::new()
            .cors(self.enable_cors)
            .compression(self.compression)
            .timeout(self.request_timeout)
            .request_logging(self.request_logging);
        match &self.cors_origins {
            Some(origins) => config.cors_origins(origins.clone()),
            None => config,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
