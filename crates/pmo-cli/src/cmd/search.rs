use crate::output::{print_json, print_table};
use anyhow::Context;
use pmo_core::graphql::build_transport;
use pmo_core::store::{GraphqlStore, IssueStore};
use pmo_core::templates::correlation_marker;
use pmo_core::types::BusinessUnit;
use std::path::Path;

/// Print the records the upsert logic would consider for `session`.
pub fn run(
    config_path: Option<&Path>,
    session: &str,
    unit: &str,
    limit: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let unit: BusinessUnit = unit.parse()?;
    let team_id = config.team_id(unit)?;
    let limit = limit.unwrap_or(config.remote.search_limit);

    let store = GraphqlStore::new(build_transport(&config)?);
    let records = store
        .search_by_description(team_id, &correlation_marker(session), limit)
        .with_context(|| format!("search for session '{session}' failed"))?;

    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No records for session '{session}'.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.identifier.clone(),
                r.state.clone().unwrap_or_default(),
                r.title.clone(),
                r.url.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["ID", "STATE", "TITLE", "URL"], rows);
    Ok(())
}
