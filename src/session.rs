use crate::builtin;
use crate::command::ExitCode;
use crate::config::Config;
use crate::context::ExecutionContext;
use crate::error::ShellError;
use crate::lexer;
use anyhow::{Result, bail};
use log::{debug, info, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io;

/// Name of the context every session starts with.
pub const DEFAULT_CONTEXT: &str = "default";

/// An interactive shell session.
///
/// The session owns the registry of named contexts in creation order. The
/// first entry is always [`DEFAULT_CONTEXT`], which instructions without a
/// `context:` prefix run in. Builtins act on whichever context is current
/// while they run.
///
/// Example
/// ```no_run
/// use vash::{Config, Session};
/// let mut sh = Session::new(Config::from_env()).unwrap();
/// let status = sh.interpret_line("mk tmp /tmp ; tmp:ls").unwrap();
/// assert_eq!(status, 0);
/// ```
pub struct Session {
    config: Config,
    contexts: Vec<(String, ExecutionContext)>,
    current: usize,
    should_exit: bool,
    last_status: ExitCode,
}

impl Session {
    /// Start a session whose default context sits in the process directory.
    pub fn new(config: Config) -> Result<Self, ShellError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ShellError::Config(format!("cannot read current directory: {e}")))?;
        Self::with_default_dir(config, &cwd.to_string_lossy())
    }

    /// Start a session whose default context sits in `dir`.
    pub fn with_default_dir(config: Config, dir: &str) -> Result<Self, ShellError> {
        let default = ExecutionContext::create(&config.search_path, dir)
            .ok_or_else(|| ShellError::Config(format!("{dir}: not an accessible directory")))?;

        Ok(Self {
            config,
            contexts: vec![(DEFAULT_CONTEXT.to_string(), default)],
            current: 0,
            should_exit: false,
            last_status: 0,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Context names in creation order, `default` first.
    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.iter().map(|(name, _)| name.as_str())
    }

    pub fn context(&self, name: &str) -> Option<&ExecutionContext> {
        self.position(name).map(|index| &self.contexts[index].1)
    }

    /// The context builtins currently act on.
    pub fn current_context(&self) -> &ExecutionContext {
        &self.contexts[self.current].1
    }

    pub fn current_context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.contexts[self.current].1
    }

    /// Register a context named `name` rooted at `dir`.
    ///
    /// A relative `dir` is taken from the process directory. The new context
    /// copies the session's search path. If `name` is taken, the existing
    /// context keeps answering to it.
    pub fn make_context(&mut self, name: &str, dir: &str) -> Result<()> {
        if self.contexts.len() >= self.config.max_contexts {
            bail!("failed to create context: too many contexts");
        }
        let dir = match std::path::absolute(dir) {
            Ok(path) => path.to_string_lossy().into_owned(),
            Err(_) => bail!("failed to create context: directory bad access"),
        };
        let Some(context) = ExecutionContext::create(&self.config.search_path, &dir) else {
            bail!("failed to create context: directory bad access");
        };

        info!("context {name} created at {dir}");
        self.contexts.push((name.to_string(), context));
        Ok(())
    }

    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Status of the most recent instruction.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Run one instruction.
    ///
    /// `context` names the context to run in; unknown names fall back to
    /// `default`. While a named context is in use the process directory is
    /// that context's directory, so relative program names and paths are
    /// taken from there. Afterwards the default context is current again.
    pub fn dispatch(
        &mut self,
        context: Option<&str>,
        command: &str,
        args: VecDeque<String>,
    ) -> Result<ExitCode, ShellError> {
        let index = match context {
            Some(name) => self.position(name).unwrap_or_else(|| {
                debug!("no context named {name:?}, using {DEFAULT_CONTEXT}");
                0
            }),
            None => 0,
        };

        self.current = index;
        if context.is_some() {
            self.enter_current_dir();
        }

        let result = if builtin::is_builtin(command) {
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            Ok(builtin::run(self, command, &args, &mut io::stderr()).unwrap_or(1))
        } else {
            self.contexts[index].1.dispatch(command, args)
        };

        self.current = 0;
        if context.is_some() {
            self.enter_current_dir();
        }

        let status = result?;
        self.last_status = status;
        Ok(status)
    }

    /// Split `line` into instructions and run them in order.
    ///
    /// Stops early once `exit` has run. Returns the status of the last
    /// instruction, or the previous status when the line held none.
    pub fn interpret_line(&mut self, line: &str) -> Result<ExitCode, ShellError> {
        let mut status = self.last_status;

        for mut tokens in lexer::split_instructions(line) {
            let Some(first) = tokens.pop_front() else {
                continue;
            };
            let (context, command) = lexer::split_context_prefix(&first);

            status = if command.is_empty() {
                debug!("instruction {first:?} names no command");
                1
            } else {
                self.dispatch(context, command, tokens)?
            };
            self.last_status = status;

            if self.should_exit {
                break;
            }
        }

        Ok(status)
    }

    /// Read and run lines until `exit` or end of input.
    pub fn repl(&mut self) -> Result<ExitCode> {
        ignore_interrupts();
        let mut rl = DefaultEditor::new()?;

        while !self.should_exit {
            println!("\n{}", self.context_banner());

            self.current = 0;
            self.enter_current_dir();
            self.current_context_mut().set_directory("");

            match rl.readline(&self.prompt()) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.interpret_line(&line)?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => self.request_exit(),
                Err(err) => return Err(err.into()),
            }
        }

        Ok(self.last_status)
    }

    fn context_banner(&self) -> String {
        let names: String = self.context_names().map(|name| format!("{name}; ")).collect();
        format!("Active Contexts: {names}")
    }

    fn prompt(&self) -> String {
        format!("(Vash) {} $$ ", self.current_context().cwd())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.contexts.iter().position(|(n, _)| n == name)
    }

    fn enter_current_dir(&self) {
        let cwd = self.current_context().cwd();
        if let Err(e) = std::env::set_current_dir(cwd) {
            warn!("cannot enter {cwd}: {e}");
            eprintln!("vash: {cwd}: {e}");
        }
    }
}

/// Keep Ctrl-C from killing the shell itself.
///
/// Children get the default disposition back before they exec.
pub fn ignore_interrupts() {
    // SAFETY: SIG_IGN installs no handler code.
    let previous = unsafe { libc::signal(libc::SIGINT, libc::SIG_IGN) };
    if previous == libc::SIG_ERR {
        warn!("cannot ignore SIGINT: {}", io::Error::last_os_error());
    }
}
