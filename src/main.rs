use anyhow::Result;
use argh::FromArgs;
use log::LevelFilter;
use vash::{Config, Session};

#[derive(FromArgs)]
/// Vash, a shell with named execution contexts.
struct Args {
    #[argh(option, short = 'c')]
    /// run LINE and exit instead of starting the interactive loop.
    command: Option<String>,

    #[argh(switch, short = 'v')]
    /// log at debug level to stderr. Overrides VASH_LOG.
    verbose: bool,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();

    let mut config = Config::from_env();
    if args.verbose {
        config.log_level = LevelFilter::Debug;
    }
    vash::logging::init(config.log_level);

    let mut session = Session::new(config)?;
    let code = match args.command {
        Some(line) => {
            vash::ignore_interrupts();
            session.interpret_line(&line)?
        }
        None => session.repl()?,
    };

    std::process::exit(code);
}
