use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use triggerd_core::config::Config;
use triggerd_core::seed::default_triggers;
use triggerd_core::store::TriggerStore;
use triggerd_core::trigger::TriggerRecord;

use crate::output::{print_json, print_table};

// ---------------------------------------------------------------------------
// Subcommand definition
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum TriggersSubcommand {
    /// List stored triggers in evaluation order
    List,
    /// Add or replace triggers from a JSON file (object or array)
    Add {
        /// JSON file; reads stdin when omitted or '-'
        file: Option<PathBuf>,
    },
    /// Remove a trigger by id
    Remove { id: String },
    /// Remove every stored trigger
    Clear,
    /// Store the default climate-control triggers
    Seed,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcommand: TriggersSubcommand, json: bool) -> Result<()> {
    let (config, store) = super::open_store(root)?;
    match subcommand {
        TriggersSubcommand::List => list(&store, json),
        TriggersSubcommand::Add { file } => add(&store, file.as_deref(), json),
        TriggersSubcommand::Remove { id } => remove(&store, &id, json),
        TriggersSubcommand::Clear => clear(&store, json),
        TriggersSubcommand::Seed => {
            let n = seed(&store, &config)?;
            if json {
                print_json(&serde_json::json!({ "seeded": n }))
            } else {
                println!("Seeded {n} default trigger(s)");
                Ok(())
            }
        }
    }
}

/// Save the default catalog built from the configured thresholds. Existing
/// ids are overwritten in place.
pub fn seed(store: &dyn TriggerStore, config: &Config) -> Result<usize> {
    let records = default_triggers(&config.thresholds);
    for record in &records {
        store.save_trigger(record)?;
    }
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn strategy_type(raw: &serde_json::Value) -> String {
    raw.get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("?")
        .to_string()
}

fn list(store: &dyn TriggerStore, json: bool) -> Result<()> {
    let records = store.list_triggers()?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No triggers stored.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            let status = match r.compile() {
                Err(e) => format!("invalid: {e}"),
                Ok(_) if !r.active => "inactive".to_string(),
                Ok(_) => "active".to_string(),
            };
            vec![
                r.id.clone(),
                r.sensor_id.clone(),
                strategy_type(&r.condition),
                strategy_type(&r.action),
                status,
            ]
        })
        .collect();
    print_table(&["ID", "SENSOR", "CONDITION", "ACTION", "STATUS"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// add
// ---------------------------------------------------------------------------

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("cannot read {}", p.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn parse_records(text: &str) -> Result<Vec<TriggerRecord>> {
    let value: serde_json::Value = serde_json::from_str(text).context("invalid JSON")?;
    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        _ => vec![serde_json::from_value(value)?],
    };
    Ok(records)
}

fn add(store: &dyn TriggerStore, file: Option<&Path>, json: bool) -> Result<()> {
    let records = parse_records(&read_input(file)?)?;
    if records.is_empty() {
        bail!("no triggers in input");
    }
    // Reject the whole batch before anything is written.
    for record in &records {
        if let Err(e) = record.compile() {
            let id = if record.id.is_empty() { "<no id>" } else { &record.id };
            bail!("trigger '{id}' rejected: {e}");
        }
    }
    for record in &records {
        store.save_trigger(record)?;
    }

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    if json {
        return print_json(&serde_json::json!({ "saved": ids }));
    }
    for id in ids {
        println!("Saved trigger '{id}'");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// remove / clear
// ---------------------------------------------------------------------------

fn remove(store: &dyn TriggerStore, id: &str, json: bool) -> Result<()> {
    if !store.remove_trigger(id)? {
        bail!("trigger not found: {id}");
    }
    if json {
        return print_json(&serde_json::json!({ "removed": id }));
    }
    println!("Removed trigger '{id}'");
    Ok(())
}

fn clear(store: &dyn TriggerStore, json: bool) -> Result<()> {
    let removed = store.remove_all_triggers()?;
    if json {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!("Removed {removed} trigger(s)");
    Ok(())
}
