pub mod config;
pub mod faults;
pub mod init;
pub mod replay;
pub mod serve;
pub mod triggers;

use std::path::Path;

use anyhow::Context;
use triggerd_core::config::Config;
use triggerd_core::store::RedbStore;

/// Load the config and open the store it points at.
pub(crate) fn open_store(root: &Path) -> anyhow::Result<(Config, RedbStore)> {
    let config = Config::load(root)?;
    let path = config.store_path(root);
    let store = RedbStore::open(&path)
        .with_context(|| format!("cannot open store at {}", path.display()))?;
    Ok((config, store))
}
