//! Process-wide logging behind the `log` facade.
//!
//! Components log with the `log` macros; the last segment of the record
//! target (the module path) is printed as the component name. On a terminal,
//! lines are routed through the progress bars so they do not tear them; off a
//! terminal each line carries a timestamp for log files.

use std::io::Write;

use indicatif::MultiProgress;
use log::{Level, LevelFilter, Log, Metadata, Record};

const RESET: &str = "\x1b[0m";

fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn ansi(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[32m",
        Level::Debug => "\x1b[36m",
        Level::Trace => "\x1b[35m",
    }
}

/// `paddock_pipeline::consumer` → `consumer`
fn component(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// Terminal line: `[LEVEL] component: message`
fn tty_line(record: &Record) -> String {
    let level = record.level();
    format!(
        "[{}{:<5}{RESET}] {}: {}",
        ansi(level),
        label(level),
        component(record.target()),
        record.args()
    )
}

/// Default verbosity for the CLI flags; `RUST_LOG` still wins.
pub fn level_for(debug: bool, quiet: bool) -> LevelFilter {
    match (debug, quiet) {
        (true, _) => LevelFilter::Debug,
        (false, true) => LevelFilter::Warn,
        (false, false) => LevelFilter::Info,
    }
}

/// Writes records above the live progress bars.
pub struct BarLogger {
    filter: env_logger::Logger,
    bars: MultiProgress,
}

impl Log for BarLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = tty_line(record);
        self.bars.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger. Later calls are ignored.
pub fn init_logging(level: LevelFilter, bars: Option<&MultiProgress>) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    let mut builder = env_logger::Builder::from_env(env);

    match bars {
        Some(bars) => {
            let filter = builder.build();
            let max = filter.filter();
            let logger = BarLogger {
                filter,
                bars: bars.clone(),
            };
            if log::set_boxed_logger(Box::new(logger)).is_ok() {
                log::set_max_level(max);
            }
        }
        None => {
            let _ = builder
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "[{}] {} {}: {}",
                        buf.timestamp_millis(),
                        label(record.level()),
                        component(record.target()),
                        record.args()
                    )
                })
                .try_init();
        }
    }
}
