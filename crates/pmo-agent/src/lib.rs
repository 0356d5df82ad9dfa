//! `pmo-agent`: fire-and-forget launcher for the reasoning-agent CLI.
//!
//! The tracking pipeline sometimes hands a classified event to an external
//! agent (the `claude` CLI) instead of mutating the tracker itself. The agent
//! is an opaque worker: it receives a natural-language prompt on stdin, does
//! its own remote mutations, and is never waited on.
//!
//! ```text
//! LaunchOptions
//!     │
//!     ▼
//! build_command   ← `claude --print --dangerously-skip-permissions --model … --max-turns …`
//!     │
//!     ▼
//! launch_detached ← prompt written to stdin, stdout/stderr discarded,
//!                   own process group, child handle dropped unreaped
//! ```

pub mod error;
pub mod launcher;
pub mod options;

pub use error::AgentError;
pub use launcher::{build_command, launch_detached, Launched};
pub use options::LaunchOptions;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
