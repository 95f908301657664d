use std::path::{Path, PathBuf};

use triggerd_core::paths;

/// Resolve the triggerd root directory.
///
/// Priority:
/// 1. `--root` flag / `TRIGGERD_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.triggerd/`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    paths::find_root(&cwd).unwrap_or(cwd)
}
