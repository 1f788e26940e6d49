// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::{atomic::AtomicBool, atomic::Ordering};

#[doc(hidden)]
pub use log as _log;

#[macro_export]
macro_rules! info {
    ($msg:literal, $($arg:tt)+) => {
        cc_log::_log::info!(target: concat!("cc.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        cc_log::_log::info!(target: concat!("cc.rust::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! warn {
    ($msg:literal, $($arg:tt)+) => {
        cc_log::_log::warn!(target: concat!("cc.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        cc_log::_log::warn!(target: concat!("cc.rust::", module_path!()), $msg);
    };
}

#[macro_export]
macro_rules! debug {
    ($msg:literal, $($arg:tt)+) => {
        cc_log::_log::debug!(target: concat!("cc.rust::", module_path!()), $msg, $($arg)+);
    };
    ($msg:literal) => {
        cc_log::_log::debug!(target: concat!("cc.rust::", module_path!()), $msg);
    };
}

/// Log a diagnostic message at info level if diagnostics logging is enabled.
///
/// Diagnostics carry per-bundle detail (output words, allocated codewords) that is
/// too noisy for regular info logging but useful when chasing a timing or mapping issue.
#[macro_export]
macro_rules! diagnostic {
    ($msg:literal, $($arg:tt)+) => {
        if cc_log::is_diagnostics_enabled() {
            cc_log::_log::info!(target: concat!("cc.rust::", module_path!()), $msg, $($arg)+);
        }
    };
    ($msg:literal) => {
        if cc_log::is_diagnostics_enabled() {
            cc_log::_log::info!(target: concat!("cc.rust::", module_path!()), $msg);
        }
    };
}

static DIAGNOSTICS_ENABLED: AtomicBool = AtomicBool::new(false);

#[inline]
pub fn is_diagnostics_enabled() -> bool {
    DIAGNOSTICS_ENABLED.load(Ordering::Acquire)
}

/// Initialize the logging.
///
/// This function is meant to be called once at the start of the program to
/// set up the logging configuration.
/// It does not install a concrete logger; the embedding binary picks one for the `log` facade.
pub fn init_logging(with_diagnostics: bool) {
    DIAGNOSTICS_ENABLED.store(with_diagnostics, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_switch() {
        init_logging(true);
        assert!(is_diagnostics_enabled());
        init_logging(false);
        assert!(!is_diagnostics_enabled());
    }
}
