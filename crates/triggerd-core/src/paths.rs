use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const TRIGGERD_DIR: &str = ".triggerd";
pub const CONFIG_FILE: &str = ".triggerd/config.yaml";
pub const DEFAULT_STORE_FILE: &str = ".triggerd/triggerd.db";

/// Environment variable that overrides root discovery.
pub const ROOT_ENV: &str = "TRIGGERD_ROOT";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn triggerd_dir(root: &Path) -> PathBuf {
    root.join(TRIGGERD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured store path; relative paths are taken from `root`.
pub fn store_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

/// Walk up from `start` looking for a directory that contains `.triggerd/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| triggerd_dir(dir).is_dir())
        .map(Path::to_path_buf)
}
