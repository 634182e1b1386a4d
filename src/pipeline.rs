use crate::command::{CommandSpec, ExitCode, Stage};
use crate::error::ShellError;
use log::debug;
use os_pipe::{PipeReader, PipeWriter};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

/// How a pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Every started stage ran to completion; statuses are in stage order.
    Foreground { statuses: Vec<ExitCode> },
    /// The pipeline was detached; `pid` is its last spawned process.
    Background { pid: u32 },
}

impl Completion {
    /// Status of the last spawned stage. Background pipelines have none.
    pub fn status(&self) -> Option<ExitCode> {
        match self {
            Completion::Foreground { statuses } => Some(statuses.last().copied().unwrap_or(1)),
            Completion::Background { .. } => None,
        }
    }

    /// The value the shell reports for this pipeline.
    pub fn exit_code(&self) -> ExitCode {
        self.status().unwrap_or(0)
    }
}

/// A stage right after the attempt to start it.
enum Launched {
    Running(Child),
    /// Redirection or program-image failure, already reported. Counts as status 1.
    Failed,
}

/// Runs a [`CommandSpec`]: one child per runnable stage, chained by pipes.
///
/// Stages are spawned one after the other without waiting in between, so a
/// pipeline's children run concurrently. In the foreground the executor then
/// waits on each of them in stage order; in the background it returns as soon
/// as the last one is started.
pub struct PipelineExecutor {
    spec: CommandSpec,
}

impl PipelineExecutor {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    /// Start every runnable stage and, unless backgrounded, wait for all of them.
    ///
    /// Only failures to create a process or a pipe are returned as errors; they
    /// mean the OS is out of resources and the session should not go on.
    pub fn execute(self) -> Result<Completion, ShellError> {
        let spec = self.spec;
        let stages = spec.runnable_stages();
        let last = stages.len() - 1;

        let mut upstream: Option<PipeReader> = None;
        let mut launched: Vec<(&Path, Launched)> = Vec::with_capacity(stages.len());

        for (index, stage) in stages.iter().enumerate() {
            let Some(executable) = stage.executable() else {
                break;
            };

            // the last runnable stage writes to stdout or the output redirect,
            // even when a truncated or trailing `|` marked it piped
            let (downstream, channel) = if stage.is_piped() && index != last {
                let (reader, writer) = os_pipe::pipe().map_err(ShellError::Pipe)?;
                (Some(reader), Some(writer))
            } else {
                (None, None)
            };

            let outcome = match connect(&spec, index, last, upstream.take(), channel) {
                Ok((stdin, stdout)) => {
                    spawn_stage(executable, stage, stdin, stdout, spec.is_background())?
                }
                Err(e) => {
                    eprintln!("{e}");
                    Launched::Failed
                }
            };
            launched.push((executable, outcome));
            upstream = downstream;
        }

        if spec.is_background() {
            return Ok(detach(launched));
        }

        let statuses = launched
            .into_iter()
            .map(|(program, outcome)| wait_stage(program, outcome))
            .collect();
        Ok(Completion::Foreground { statuses })
    }
}

/// Pick the standard streams of stage `index`.
///
/// Stage 0 reads the input redirect when there is one; later stages read the
/// previous stage's pipe. A piped stage writes to its pipe; the last stage
/// writes to the output redirect when there is one. Everything else inherits
/// the controller's streams.
fn connect(
    spec: &CommandSpec,
    index: usize,
    last: usize,
    upstream: Option<PipeReader>,
    channel: Option<PipeWriter>,
) -> Result<(Stdio, Stdio), ShellError> {
    let stdin = match (index, spec.input_redirect()) {
        (0, Some(path)) => Stdio::from(open_input(path)?),
        (0, None) => Stdio::inherit(),
        _ => upstream.map(Stdio::from).unwrap_or_else(Stdio::null),
    };

    let stdout = match (channel, spec.output_redirect()) {
        (Some(writer), _) => Stdio::from(writer),
        (None, Some(path)) if index == last => Stdio::from(open_output(path)?),
        (None, _) => Stdio::inherit(),
    };

    Ok((stdin, stdout))
}

fn open_input(path: &str) -> Result<File, ShellError> {
    File::open(path).map_err(|source| ShellError::Redirect {
        path: path.to_string(),
        source,
    })
}

fn open_output(path: &str) -> Result<File, ShellError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|source| ShellError::Redirect {
            path: path.to_string(),
            source,
        })
}

fn spawn_stage(
    executable: &Path,
    stage: &Stage,
    stdin: Stdio,
    stdout: Stdio,
    background: bool,
) -> Result<Launched, ShellError> {
    let mut command = Command::new(executable);
    command.args(stage.args()).stdin(stdin).stdout(stdout);

    // SAFETY: the hook runs between fork and exec and only makes
    // async-signal-safe calls.
    unsafe {
        command.pre_exec(move || {
            // the controller ignores SIGINT; children must stay interruptible
            if libc::signal(libc::SIGINT, libc::SIG_DFL) == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
            if background && libc::setpgid(0, 0) == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    // `command` owns the parent's copy of the pipe ends and closes them on return.
    match command.spawn() {
        Ok(child) => {
            debug!("spawned {} as pid {}", executable.display(), child.id());
            Ok(Launched::Running(child))
        }
        Err(source) if is_fork_failure(&source) => Err(ShellError::Spawn {
            program: executable.to_path_buf(),
            source,
        }),
        Err(source) => {
            eprintln!("vash: {}: {source}", executable.display());
            Ok(Launched::Failed)
        }
    }
}

/// `fork` itself failed, as opposed to the child failing to `exec`.
fn is_fork_failure(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EAGAIN) | Some(libc::ENOMEM))
}

fn detach(launched: Vec<(&Path, Launched)>) -> Completion {
    let pid = launched.iter().rev().find_map(|(_, outcome)| match outcome {
        Launched::Running(child) => Some(child.id()),
        Launched::Failed => None,
    });

    match pid {
        Some(pid) => {
            eprintln!("[] {pid}");
            Completion::Background { pid }
        }
        None => Completion::Foreground {
            statuses: vec![1; launched.len()],
        },
    }
}

fn wait_stage(program: &Path, outcome: Launched) -> ExitCode {
    let Launched::Running(mut child) = outcome else {
        return 1;
    };

    match child.wait() {
        Ok(status) => {
            let code = exit_code(status);
            debug!("{} (pid {}) finished with {code}", program.display(), child.id());
            code
        }
        Err(source) => {
            let err = ShellError::Wait {
                program: program.to_path_buf(),
                source,
            };
            eprintln!("{err}");
            1
        }
    }
}

/// The child's exit code, or the number of the signal that killed it.
fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .or_else(|| status.signal())
        .unwrap_or(1)
}
