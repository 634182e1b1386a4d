use crate::command::{CommandSpec, ExitCode};
use crate::error::ShellError;
use crate::pipeline::PipelineExecutor;
use crate::resolve::{self, is_searchable_dir};
use log::{debug, warn};
use std::collections::VecDeque;
use std::path::Path;

/// A named environment commands are issued "in".
///
/// A context remembers its own working directory, the directory it was in
/// before the last explicit change, and a private snapshot of the search path
/// taken when it was created. Mutating one context's search path never affects
/// another context or the session it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    cwd: String,
    old_cwd: String,
    search_path: Vec<String>,
}

impl ExecutionContext {
    /// Create a context rooted at `initial_dir`.
    ///
    /// Returns `None` when `initial_dir` is not a directory the user can enter.
    pub fn create(parent_search_path: &[String], initial_dir: &str) -> Option<Self> {
        if !is_searchable_dir(Path::new(initial_dir)) {
            debug!("refusing context at {initial_dir}: not an accessible directory");
            return None;
        }

        Some(Self {
            cwd: initial_dir.to_string(),
            old_cwd: initial_dir.to_string(),
            search_path: parent_search_path.to_vec(),
        })
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn old_cwd(&self) -> &str {
        &self.old_cwd
    }

    pub fn search_path(&self) -> &[String] {
        &self.search_path
    }

    pub fn search_path_mut(&mut self) -> &mut Vec<String> {
        &mut self.search_path
    }

    /// Move the context to `new_dir`.
    ///
    /// The empty string re-synchronizes `cwd` with the real process directory and
    /// leaves `old_cwd` alone. Any other value is stored verbatim after saving the
    /// current `cwd` into `old_cwd`; it is not checked here.
    pub fn set_directory(&mut self, new_dir: &str) {
        if new_dir.is_empty() {
            match std::env::current_dir() {
                Ok(dir) => self.cwd = dir.to_string_lossy().into_owned(),
                Err(e) => warn!("cannot read current directory: {e}"),
            }
            return;
        }

        self.old_cwd = std::mem::replace(&mut self.cwd, new_dir.to_string());
    }

    /// Resolve `name` in this context and run it with `args`.
    ///
    /// Unresolvable names are reported and yield status 1 without spawning
    /// anything. Only unrecoverable process-creation failures come back as `Err`.
    pub fn dispatch(&self, name: &str, args: VecDeque<String>) -> Result<ExitCode, ShellError> {
        let Some(executable) = resolve::resolve(self, name) else {
            eprintln!("{}", ShellError::CommandNotFound(name.to_string()));
            return Ok(1);
        };

        let spec = CommandSpec::build(self, name, executable, args);
        let completion = PipelineExecutor::new(spec).execute()?;
        Ok(completion.exit_code())
    }
}
