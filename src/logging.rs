use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Install a stderr logger at `level`.
///
/// `Off` installs nothing so the prompt and command output stay clean. Calling
/// this more than once is harmless; only the first logger sticks.
pub fn init(level: LevelFilter) {
    if level == LevelFilter::Off {
        return;
    }

    let config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();

    if TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        log::debug!("logger already installed");
    }
}
