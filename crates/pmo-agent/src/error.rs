use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("failed to spawn agent: {0}")]
    Spawn(String),
}
