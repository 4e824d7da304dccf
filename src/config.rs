use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::AppError;

/// How an enrollment reaches `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionPolicy {
    /// Only an explicit `mark_completed` call moves `ongoing` to `completed`.
    #[default]
    External,
    /// Completing the last outstanding lesson of a course completes the enrollment.
    Derived,
}

impl FromStr for CompletionPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "external" => Ok(CompletionPolicy::External),
            "derived" => Ok(CompletionPolicy::Derived),
            other => Err(AppError::Config(format!(
                "COURSE_COMPLETION must be 'external' or 'derived', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub completion_policy: CompletionPolicy,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://learnpath.db?mode=rwc".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is invalid: {}", e)))?;

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| AppError::Config(format!("DB_MAX_CONNECTIONS is invalid: {}", e)))?,
            Err(_) => 5,
        };

        let completion_policy = match env::var("COURSE_COMPLETION") {
            Ok(raw) => raw.parse()?,
            Err(_) => CompletionPolicy::default(),
        };

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            completion_policy,
        })
    }
}
