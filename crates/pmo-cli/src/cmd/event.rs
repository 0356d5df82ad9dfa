use crate::output::print_line;
use anyhow::Context;
use pmo_core::config::SinkKind;
use pmo_core::event::Event;
use pmo_core::outcome::Outcome;
use std::path::Path;

/// Route one already-classified event through the in-process handlers.
pub fn run(config_path: Option<&Path>, dry_run: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let raw = pmo_core::io::read_all(std::io::stdin().lock())
        .context("failed to read event from stdin")?;

    let event: Event = match serde_json::from_str(&raw) {
        Ok(event) => event,
        Err(e) => return print_line(&Outcome::error(format!("invalid event: {e}"))),
    };
    let outcome = super::record(&config, &event, SinkKind::Direct, dry_run)?;
    print_line(&outcome)
}
