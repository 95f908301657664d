use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use triggerd_core::store::TriggerStore;

use crate::output::{print_json, print_table};

#[derive(Subcommand, Debug)]
pub enum FaultsSubcommand {
    /// List recorded faults, newest first
    List {
        /// Show at most this many
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

pub fn run(root: &Path, subcommand: FaultsSubcommand, json: bool) -> Result<()> {
    match subcommand {
        FaultsSubcommand::List { limit } => list(root, limit, json),
    }
}

fn list(root: &Path, limit: usize, json: bool) -> Result<()> {
    let (_, store) = super::open_store(root)?;
    let mut faults = store.list_faults()?;
    faults.truncate(limit);

    if json {
        return print_json(&faults);
    }
    if faults.is_empty() {
        println!("No faults recorded.");
        return Ok(());
    }
    let rows = faults
        .iter()
        .map(|f| {
            vec![
                f.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                f.fault_type.clone(),
                f.trigger_id.clone().unwrap_or_else(|| "-".into()),
                f.message.clone(),
            ]
        })
        .collect();
    print_table(&["TIME", "TYPE", "TRIGGER", "MESSAGE"], rows);
    Ok(())
}
