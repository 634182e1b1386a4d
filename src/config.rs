//! Start-up configuration gathered from the process environment.

use log::LevelFilter;
use std::ffi::OsStr;

/// Upper bound on the number of contexts a session holds, `default` included.
pub const MAX_CONTEXTS: usize = 16;

/// Environment variable selecting the log level (`error`, `warn`, `info`,
/// `debug`, `trace` or `off`).
pub const LOG_ENV: &str = "VASH_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directories searched for programs, in order, as found in `PATH`.
    pub search_path: Vec<String>,
    /// Target of a bare `cd`. `/` is used when unset.
    pub home: Option<String>,
    pub log_level: LevelFilter,
    pub max_contexts: usize,
}

impl Config {
    /// Read `PATH`, `HOME` and `VASH_LOG` from the environment.
    pub fn from_env() -> Self {
        let path = std::env::var_os("PATH");
        let home = std::env::var("HOME").ok();
        let log = std::env::var(LOG_ENV).ok();
        Self::from_vars(path.as_deref(), home, log.as_deref())
    }

    /// Build a configuration from explicit variable values.
    pub fn from_vars(path: Option<&OsStr>, home: Option<String>, log: Option<&str>) -> Self {
        let search_path = path
            .map(|raw| {
                std::env::split_paths(raw)
                    .filter(|dir| !dir.as_os_str().is_empty())
                    .map(|dir| dir.to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            search_path,
            home: home.filter(|h| !h.is_empty()),
            log_level: log.and_then(parse_level).unwrap_or(LevelFilter::Off),
            max_contexts: MAX_CONTEXTS,
        }
    }

    /// Directory a bare `cd` or `cd ~` moves to.
    pub fn home_dir(&self) -> &str {
        self.home.as_deref().unwrap_or("/")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(None, None, None)
    }
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse().ok()
}
