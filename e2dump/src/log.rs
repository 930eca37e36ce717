// SPDX-License-Identifier: MIT

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

use std::sync::atomic::{AtomicU8, Ordering};

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Normal as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Quiet,
        1 => LogLevel::Normal,
        _ => LogLevel::Verbose,
    }
}

#[macro_export]
macro_rules! log_normal {
    ($($arg:tt)*) => {
        if $crate::log::log_level() != $crate::log::LogLevel::Quiet {
            println!("{}", format_args!($($arg)*));
        }
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($($arg:tt)*) => {
        if $crate::log::log_level() == $crate::log::LogLevel::Verbose {
            println!("{}", format_args!($($arg)*));
        }
    };
}
