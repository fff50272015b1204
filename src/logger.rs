use crate::prelude::*;
use core::fmt::Write;

/// The output of the logger. It is set once by [`setup`] and is never replaced.
static SINK: Once<Spinlock<Box<dyn Write + Send>>> = Once::new();

struct Logger;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let level = match record.level() {
                log::Level::Error => "\x1b[1m\x1b[31m[!]\x1b[0m",
                log::Level::Warn => "\x1b[1m\x1b[33m[-]\x1b[0m",
                log::Level::Info => "\x1b[1m\x1b[32m[*]\x1b[0m",
                log::Level::Debug => "\x1b[1m\x1b[34m[#]\x1b[0m",
                log::Level::Trace => "\x1b[1m[~]\x1b[0m",
            };

            // Write the log message to the sink, ignoring any error
            if let Some(sink) = SINK.get() {
                _ = sink
                    .lock()
                    .write_fmt(format_args!("{} {}\n", level, record.args()));
            }
        }
    }

    fn flush(&self) {}
}

/// Initialize the logger. Every record with a level lower or equal to `level` is written
/// to `sink`, prefixed by a colored tag describing its level.
///
/// # Errors
/// Returns an error if a logger is already set. In this case, `sink` is dropped and the
/// existing logger is left untouched.
pub fn setup(
    sink: Box<dyn Write + Send>,
    level: log::LevelFilter,
) -> Result<(), log::SetLoggerError> {
    log::set_logger(&Logger)?;
    SINK.call_once(|| Spinlock::new(sink));
    log::set_max_level(level);
    Ok(())
}
