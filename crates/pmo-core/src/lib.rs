//! Event classification and tracking-record upsert for agent-runtime hooks.
//!
//! ```text
//! hook payload ─► adapters::detect ─► Event ─► IssueSink
//!                                              ├─ DirectSink ─► router ─► upsert ─► IssueStore
//!                                              └─ AgentSink  ─► prompt ─► detached agent
//! ```

pub mod adapters;
pub mod config;
pub mod credentials;
pub mod error;
pub mod event;
pub mod graphql;
pub mod hook;
pub mod io;
pub mod lifecycle;
pub mod outcome;
pub mod paths;
pub mod prompt;
pub mod router;
pub mod sink;
pub mod store;
pub mod templates;
pub mod transcript;
pub mod types;
pub mod upsert;

pub use error::{PmoError, Result};
