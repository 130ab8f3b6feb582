use std::path::PathBuf;

use color_eyre::Result;
use color_eyre::eyre::Context;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

const CRATE_TARGET: &str = "spotirip";

/// Route `log` records to a coloured console and, optionally, a plain log file.
///
/// Dependencies only get through at `warn` and above.
pub fn setup_logging(
    level: LevelFilter,
    log_file: Option<PathBuf>,
    log_file_level: LevelFilter,
) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::BrightBlack);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {}",
                chrono::Local::now().format("%H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .level_for(CRATE_TARGET, LevelFilter::Trace)
        .chain(console);

    if let Some(path) = log_file {
        let file = fern::log_file(&path)
            .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;

        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} {:<5} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        message
                    ))
                })
                .level(log_file_level)
                .chain(file),
        );
    }

    dispatch
        .apply()
        .wrap_err("Failed to install logger")?;

    Ok(())
}
