//! Vash, a small context-aware command shell.
//!
//! A session keeps a registry of named execution contexts. Each context has
//! its own working directory, directory history and search path, and any
//! instruction can be addressed to one with a `context:command` prefix.
//! Instructions support pipelines (`|`), input and output redirection
//! (`<`, `>`), background execution (`&`) and sequencing (`;`).
//!
//! The main entry point is [`Session`]. Lower layers are public as well:
//! [`ExecutionContext`] resolves and dispatches a single instruction,
//! [`CommandSpec`] is its parsed form and [`PipelineExecutor`] runs it.

mod builtin;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod lexer;
pub mod logging;
pub mod pipeline;
pub mod resolve;
mod session;

#[cfg(test)]
mod testutil;

pub use command::{CommandSpec, ExitCode, Stage};
pub use config::Config;
pub use context::ExecutionContext;
pub use error::ShellError;
pub use pipeline::{Completion, PipelineExecutor};
pub use session::{DEFAULT_CONTEXT, Session, ignore_interrupts};
