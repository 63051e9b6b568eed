//! Failure recovery - missing-dependency detection
//!
//! A bot that dies on import leaves a recognizable loader message in its
//! log. The scan extracts the module name; the supervisor's `remediate`
//! installs it once and restarts the bot. Single best-effort attempt per
//! invocation - there is no retry loop here, the caller decides whether
//! to try again.

use regex::Regex;
use std::sync::OnceLock;

/// Matches the Python loader's complaint, e.g.
/// `ModuleNotFoundError: No module named 'requests'` or the older
/// `ImportError: No module named foo.bar`.
fn missing_module_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"No module named '?([A-Za-z0-9_][A-Za-z0-9_.]*)'?")
            .expect("missing-module pattern is a valid literal")
    })
}

/// Scan log text for an unresolved import and extract the module name.
///
/// The most recent occurrence wins: earlier failures may already have
/// been remediated, only the last one describes the current state.
pub fn scan_missing_module(log_text: &str) -> Option<String> {
    missing_module_pattern()
        .captures_iter(log_text)
        .last()
        .map(|caps| caps[1].to_string())
}
