//! Debug utilities for the hardmax plugin
//!
//! Provides centralized debug logging controlled by the HARDMAX_DEBUG environment variable.
//! Set HARDMAX_DEBUG=1 or HARDMAX_DEBUG=true to enable debug output.

use std::env;
use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if debug mode is enabled via HARDMAX_DEBUG environment variable
#[inline]
pub fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| {
        env::var("HARDMAX_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Debug print macro that only outputs when HARDMAX_DEBUG is enabled
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        if $crate::debug::debug_enabled() {
            eprintln!($($arg)*);
        }
    };
}
