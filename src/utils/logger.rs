// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::OnceLock;

static PREFIX: OnceLock<String> = OnceLock::new();
static LOGGER: StderrLogger = StderrLogger;

struct StderrLogger;

/// Installs the stderr logger. Call once per process.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

/// Same as [`init`], but every line starts with `[prefix]`. Used by worker
/// processes so that their output stays attributable on the shared stderr.
pub fn init_with_prefix(level: LevelFilter, prefix: impl Into<String>) -> Result<(), SetLoggerError> {
  let _ = PREFIX.set(prefix.into());
  init(level)
}

fn tag(level: Level) -> &'static str {
  match level {
    Level::Error => "\x1b[1;31mERROR\x1b[0m", // Red & Bold
    Level::Warn => "\x1b[33mWARN \x1b[0m",    // Orange
    Level::Info => "\x1b[36mINFO \x1b[0m",    // Blue
    Level::Debug => "\x1b[90mDEBUG\x1b[0m",   // Gray
    Level::Trace => "\x1b[90mTRACE\x1b[0m",
  }
}

impl log::Log for StderrLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let line = match PREFIX.get() {
      Some(prefix) => format!("{} [{}] {}\n", tag(record.level()), prefix, record.args()),
      None => format!("{} {}\n", tag(record.level()), record.args()),
    };

    // a single write keeps lines from different processes whole
    let _ = std::io::stderr().lock().write_all(line.as_bytes());
  }

  fn flush(&self) {
    let _ = std::io::stderr().flush();
  }
}
