#![deny(missing_docs)]
//! Shared logging utilities for the Revolve session workspace.
//!
//! This crate provides the `session_*` logging macros used across the
//! codebase and a minimal test initializer for the global logger. Every
//! line logged through the macros carries the number of the turn that the
//! current thread is driving, so interleaved output from the decoder, the
//! classifier and the controller can be attributed to one request.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// Thread-local storage for the turn currently driven by this thread.
    static CURRENT_TURN: Cell<u64> = const { Cell::new(0) };
}

/// Sets the turn number for the current thread.
/// The session controller calls this when a new turn is submitted.
pub fn set_turn(turn: u64) {
    CURRENT_TURN.with(|v| v.set(turn));
}

/// Retrieves the turn number for the current thread.
/// Returns 0 outside of any turn.
pub fn current_turn() -> u64 {
    CURRENT_TURN.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current turn.
#[macro_export]
macro_rules! session_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current turn.
#[macro_export]
macro_rules! session_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current turn.
#[macro_export]
macro_rules! session_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current turn.
#[macro_export]
macro_rules! session_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current turn.
#[macro_export]
macro_rules! session_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("[turn {}] {}", $crate::current_turn(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_is_thread_local() {
        set_turn(7);
        assert_eq!(current_turn(), 7);

        let other = std::thread::spawn(current_turn).join().unwrap();
        assert_eq!(other, 0);

        session_info!("logging with turn {}", current_turn());
        set_turn(0);
    }
}
