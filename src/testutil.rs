//! Helpers shared by the unit tests of several modules.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes tests that read or change the process current directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write an executable `/bin/sh` script named `name` into `dir`.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Locate a system utility the tests rely on (`true`, `cat`, `sleep`, ...).
pub(crate) fn system(name: &str) -> PathBuf {
    ["/bin", "/usr/bin"]
        .iter()
        .find_map(|dir| crate::resolve::resolve_path(Path::new(dir), name))
        .unwrap_or_else(|| panic!("{name} not found in /bin or /usr/bin"))
}

/// A search path covering the usual system locations.
pub(crate) fn system_search_path() -> Vec<String> {
    vec!["/bin".to_string(), "/usr/bin".to_string()]
}
