use crate::command::ExitCode;
use crate::resolve::is_searchable_dir;
use crate::session::Session;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::path::Path;

/// Commands the session handles itself instead of resolving a program.
///
/// Builtins are parsed with [`argh`] and always act on the context the
/// instruction is addressed to.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Name the command is invoked by.
    fn name() -> &'static str;

    /// Run the command. Messages for the user go to `out`.
    fn execute(self, session: &mut Session, out: &mut dyn Write) -> Result<ExitCode>;
}

/// Whether `name` is handled by the session rather than looked up on disk.
pub fn is_builtin(name: &str) -> bool {
    [Cd::name(), Mk::name(), Exit::name()].contains(&name)
}

/// Run builtin `name`, or return `None` when there is no such builtin.
pub(crate) fn run(
    session: &mut Session,
    name: &str,
    args: &[&str],
    out: &mut dyn Write,
) -> Option<ExitCode> {
    let code = match name {
        n if n == Cd::name() => invoke::<Cd>(session, args, out),
        n if n == Mk::name() => invoke::<Mk>(session, args, out),
        n if n == Exit::name() => invoke::<Exit>(session, args, out),
        _ => return None,
    };
    Some(code)
}

fn invoke<T: BuiltinCommand>(session: &mut Session, args: &[&str], out: &mut dyn Write) -> ExitCode {
    let args = shield_dash(args);
    match T::from_args(&[T::name()], &args) {
        Ok(cmd) => match cmd.execute(session, out) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(out, "vash: {}: {e:#}", T::name());
                1
            }
        },
        Err(EarlyExit { output, status }) => {
            let _ = write!(out, "{output}");
            if status.is_err() { 1 } else { 0 }
        }
    }
}

/// argh reads a lone `-` as an unknown option; end option parsing before it.
fn shield_dash<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut shielded = Vec::with_capacity(args.len() + 1);
    let mut ended = false;
    for &arg in args {
        if arg == "--" {
            ended = true;
        } else if arg == "-" && !ended {
            shielded.push("--");
            ended = true;
        }
        shielded.push(arg);
    }
    shielded
}

#[derive(FromArgs)]
/// Change the working directory of the addressed context.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to, relative to the context directory. "-" returns to the previous
    /// directory, "~" or nothing goes to $HOME. Extra arguments are ignored.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, session: &mut Session, out: &mut dyn Write) -> Result<ExitCode> {
        let home = session.config().home_dir().to_string();
        let context = session.current_context_mut();

        match self.targets.first().map(String::as_str) {
            None | Some("~") => context.set_directory(&home),
            Some("") => context.set_directory(""),
            Some("-") => {
                let previous = context.old_cwd().to_string();
                context.set_directory(&previous);
            }
            Some(target) => {
                let candidate = Path::new(context.cwd()).join(target);
                if is_searchable_dir(&candidate) {
                    context.set_directory(&candidate.to_string_lossy());
                } else {
                    writeln!(out, "vash: cd: {target}: No such file or directory")?;
                }
            }
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Create a new context that commands can be addressed to as NAME:command.
pub struct Mk {
    #[argh(positional)]
    /// name of the new context.
    pub name: String,

    #[argh(positional)]
    /// directory the new context starts in.
    pub dir: String,

    #[argh(positional, greedy)]
    /// ignored.
    pub _rest: Vec<String>,
}

impl BuiltinCommand for Mk {
    fn name() -> &'static str {
        "mk"
    }

    fn execute(self, session: &mut Session, _out: &mut dyn Write) -> Result<ExitCode> {
        session.make_context(&self.name, &self.dir)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// End the session.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, session: &mut Session, _out: &mut dyn Write) -> Result<ExitCode> {
        session.request_exit();
        Ok(0)
    }
}
