use thiserror::Error;

use crate::types::{BusinessUnit, StateKey};

#[derive(Debug, Error)]
pub enum PmoError {
    #[error("API key not found: set {names} or add it to {file}")]
    CredentialMissing { names: String, file: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote call timed out after {0}s")]
    Timeout(u64),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("mutation rejected: {0}")]
    MutationRejected(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error("no team configured for business unit '{0}'")]
    TeamNotConfigured(BusinessUnit),

    #[error("no state id configured for '{0}'")]
    StateNotConfigured(StateKey),

    #[error("no label id configured for '{0}'")]
    LabelNotConfigured(String),

    #[error("unknown business unit '{0}' (expected product, content, investment or pmo)")]
    UnknownBusinessUnit(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("agent launch failed: {0}")]
    AgentLaunch(#[from] pmo_agent::AgentError),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PmoError {
    /// Errors that abort the invocation instead of being folded into an
    /// `error` outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PmoError::CredentialMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, PmoError>;
