use crate::output::print_line;
use anyhow::Context;
use pmo_core::adapters;
use pmo_core::hook::HookInput;
use std::path::Path;

/// Read one hook payload, classify it and record it. Anything no adapter
/// recognises exits quietly with empty stdout.
pub fn run(config_path: Option<&Path>, adapter: Option<&str>, dry_run: bool) -> anyhow::Result<()> {
    if let Some(name) = adapter {
        if adapters::find(name).is_none() {
            anyhow::bail!(
                "unknown adapter '{name}' (known: {})",
                adapters::names().join(", ")
            );
        }
    }

    let config = super::load_config(config_path)?;
    let raw = pmo_core::io::read_all(std::io::stdin().lock())
        .context("failed to read hook payload from stdin")?;

    let Some(input) = HookInput::parse(&raw) else {
        return Ok(());
    };
    let Some(detection) = adapters::detect(&input, &config, adapter) else {
        tracing::debug!(trigger = ?input.trigger(), "no adapter matched");
        return Ok(());
    };

    tracing::info!(
        adapter = detection.adapter,
        session = %detection.event.session_id,
        "hook payload classified"
    );
    let outcome = super::record(&config, &detection.event, detection.sink, dry_run)?;
    print_line(&outcome)
}
