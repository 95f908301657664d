use std::path::Path;

use anyhow::Result;
use triggerd_core::config::Config;
use triggerd_core::{io, paths};

use crate::output::print_json;

pub fn run(root: &Path, seed: bool, json: bool) -> Result<()> {
    io::ensure_dir(&paths::triggerd_dir(root))?;

    let yaml = serde_yaml::to_string(&Config::default())?;
    let created = io::write_if_missing(&paths::config_path(root), yaml.as_bytes())?;

    let (config, store) = super::open_store(root)?;
    let seeded = if seed {
        super::triggers::seed(&store, &config)?
    } else {
        0
    };

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "config_created": created,
            "store": config.store_path(root),
            "seeded": seeded,
        }));
    }

    if created {
        println!("Created {}", paths::config_path(root).display());
    } else {
        println!("Config already exists: {}", paths::config_path(root).display());
    }
    println!("Store: {}", config.store_path(root).display());
    if seed {
        println!("Seeded {seeded} default trigger(s)");
    }
    Ok(())
}
