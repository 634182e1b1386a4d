use std::io;
use std::path::PathBuf;

/// Errors raised by the session, its contexts and the pipeline executor.
///
/// Process creation, channel creation and start-up failures are fatal to a
/// session; everything else is reported and absorbed at the instruction or stage
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// A program name did not match any searched location.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// A redirection target could not be opened.
    #[error("vash: {path}: {source}")]
    Redirect {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The OS refused to create a process. The session cannot continue.
    #[error("vash: fork: {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Waiting on a spawned stage failed.
    #[error("vash: {program}: {source}")]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A pipeline channel could not be created.
    #[error("vash: pipe: {0}")]
    Pipe(#[source] io::Error),

    /// Start-up configuration could not be established.
    #[error("vash: {0}")]
    Config(String),
}

impl ShellError {
    /// Whether the session must terminate after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShellError::Spawn { .. } | ShellError::Pipe(_) | ShellError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_follow_shell_conventions() {
        let err = ShellError::CommandNotFound("nosuchcmd".to_string());
        assert_eq!(err.to_string(), "nosuchcmd: command not found");

        let err = ShellError::Redirect {
            path: "missing.txt".to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("vash: missing.txt: "));
    }

    #[test]
    fn only_resource_and_config_failures_are_fatal() {
        let spawn = ShellError::Spawn {
            program: PathBuf::from("/bin/true"),
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        assert!(spawn.is_fatal());
        assert!(ShellError::Config("no cwd".into()).is_fatal());
        assert!(!ShellError::CommandNotFound("x".into()).is_fatal());
    }
}
