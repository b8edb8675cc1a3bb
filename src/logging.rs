//! 全局日志：按级别着色，写到 stderr，不干扰 shell 的 stdout 输出

use chrono::Local;
use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

struct ShellLogger;

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!(
            "{} {} [{}] {}",
            Local::now().format("%H:%M:%S%.3f").to_string().bright_black(),
            level_tag(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_tag(level: Level) -> ColoredString {
    let tag = format!("{:>5}", level);
    match level {
        Level::Error => tag.red().bold(),
        Level::Warn => tag.bright_yellow(),
        Level::Info => tag.blue(),
        Level::Debug => tag.green(),
        Level::Trace => tag.bright_black(),
    }
}

static LOGGER: ShellLogger = ShellLogger;

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
