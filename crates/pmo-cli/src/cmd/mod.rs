pub mod config;
pub mod event;
pub mod hook;
pub mod search;

use anyhow::Context;
use pmo_core::config::{Config, SinkKind, WarnLevel};
use pmo_core::event::Event;
use pmo_core::graphql::build_transport;
use pmo_core::outcome::Outcome;
use pmo_core::sink::{AgentSink, DirectSink, IssueSink};
use pmo_core::store::{GraphqlStore, MemoryStore};
use std::path::Path;

/// Resolve the config and log its warnings once.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::resolve(path).context("failed to load config")?;
    for warning in config.validate() {
        match warning.level {
            WarnLevel::Warning => tracing::warn!("config: {}", warning.message),
            WarnLevel::Error => tracing::error!("config: {}", warning.message),
        }
    }
    Ok(config)
}

/// Hand `event` to the sink. A dry run never leaves the process: the direct
/// sink writes to a throwaway in-memory store and the agent sink only renders
/// its prompt.
pub fn record(config: &Config, event: &Event, sink: SinkKind, dry_run: bool) -> anyhow::Result<Outcome> {
    let outcome = match sink {
        SinkKind::Agent => AgentSink::new(config).dry_run(dry_run).record_event(event)?,
        SinkKind::Direct if dry_run => {
            let store = MemoryStore::with_prefix("DRY");
            DirectSink::new(config, &store).record_event(event)?
        }
        SinkKind::Direct => {
            let store = GraphqlStore::new(build_transport(config)?);
            DirectSink::new(config, &store).record_event(event)?
        }
    };

    if outcome.is_failure() {
        tracing::warn!(result = outcome.tag(), event_type = %event.event_type, "event not recorded");
    } else {
        tracing::info!(result = outcome.tag(), event_type = %event.event_type, sink = sink.as_str(), "event handled");
    }
    Ok(outcome)
}
