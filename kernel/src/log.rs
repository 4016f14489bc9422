// Kernel Logging Subsystem
//
// Leveled diagnostic logging for the console kernel. Log lines never go to
// the VGA screen, which belongs to the shell; they go to whatever sink the
// entry point registers (COM1 on real hardware). With no sink registered,
// logging is a no-op, which is what host tests rely on.
//
// Line format:
//   [#seq] [LEVEL] [origin] message            (Info and above)
//   [#seq] [DEBUG] [origin] message (file:line)
//
// There is no timer in a polled kernel, so entries carry a monotonic
// sequence number instead of a timestamp.
//
// Developer ergonomics:
// - `log_debug!`, `log_info!`, `log_warn!`, `log_error!`, `log_panic!`
//   wrap `_log` and capture `file!()` / `line!()`

use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Panic = 4,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "WARN ",
            LogLevel::Error => "ERROR",
            LogLevel::Panic => "PANIC",
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Panic,
        }
    }
}

/// Receives one fully formatted log line, newline included.
pub type LogSink = fn(fmt::Arguments);

static CURRENT_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static SEQUENCE: AtomicU64 = AtomicU64::new(0);
static SINK: Mutex<Option<LogSink>> = Mutex::new(None);

pub fn init(sink: LogSink, level: LogLevel) {
    *SINK.lock() = Some(sink);
    set_level(level);
}

pub fn set_level(level: LogLevel) {
    CURRENT_LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_level() -> LogLevel {
    LogLevel::from_u8(CURRENT_LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn _log(level: LogLevel, origin: &str, args: fmt::Arguments, file: &str, line: u32) {
    if level < get_level() {
        return;
    }

    let sink = match *SINK.lock() {
        Some(sink) => sink,
        None => return,
    };

    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);

    if level == LogLevel::Debug {
        sink(format_args!(
            "[#{}] [{}] [{}] {} ({}:{})\n",
            seq,
            level.as_str(),
            origin,
            args,
            file,
            line
        ));
    } else {
        sink(format_args!(
            "[#{}] [{}] [{}] {}\n",
            seq,
            level.as_str(),
            origin,
            args
        ));
    }
}

#[macro_export]
macro_rules! log_debug {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Debug,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_info {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Info,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_warn {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Warn,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_error {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Error,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[macro_export]
macro_rules! log_panic {
    ($origin:expr, $($arg:tt)*) => {
        $crate::log::_log(
            $crate::log::LogLevel::Panic,
            $origin,
            format_args!($($arg)*),
            file!(),
            line!()
        )
    };
}
