use chrono::Local;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl Level {
    pub fn parse(s: &str) -> Option<Level> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Level::Error),
            "warn" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" => Some(Level::Debug),
            "trace" => Some(Level::Trace),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

pub fn set_level(level: Level) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Reads `SENSORLINK_LOG` (error|warn|info|debug|trace), keeps the current level otherwise.
pub fn init_from_env() {
    if let Some(level) = std::env::var("SENSORLINK_LOG").ok().as_deref().and_then(Level::parse) {
        set_level(level);
    }
}

pub fn enabled(level: Level) -> bool {
    level as u8 <= MAX_LEVEL.load(Ordering::Relaxed)
}

pub fn log(level: Level, args: fmt::Arguments) {
    if !enabled(level) {
        return;
    }
    let now = Local::now();
    println!("[{}] {} {}", now.format("%Y-%m-%d %H:%M:%S"), level.label(), args);
}

pub fn info(args: fmt::Arguments) {
    log(Level::Info, args)
}

pub fn warn(args: fmt::Arguments) {
    log(Level::Warn, args)
}

pub fn error(args: fmt::Arguments) {
    log(Level::Error, args)
}

pub fn debug(args: fmt::Arguments) {
    log(Level::Debug, args)
}

pub fn trace(args: fmt::Arguments) {
    log(Level::Trace, args)
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logger::info(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logger::warn(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logger::error(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::logger::debug(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::logger::trace(format_args!($($arg)*))
    };
}
