use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::disk::types::{DEFAULT_BLOCK_COUNT, DEFAULT_IMAGE_PATH};

/// MiniFS: a two-level 8.3 filesystem inside a single disk image
#[derive(Debug, Parser)]
#[command(name = "minifs", version)]
pub struct Args {
    /// Disk image to open (created if missing)
    #[arg(default_value = DEFAULT_IMAGE_PATH)]
    pub image: PathBuf,

    /// Number of 512-byte blocks when creating a new image
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_COUNT)]
    pub blocks: u64,

    /// Format the image on startup even if it already exists
    #[arg(short, long)]
    pub format: bool,

    /// Log verbosity (written to stderr)
    #[arg(short, long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
