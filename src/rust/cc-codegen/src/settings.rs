// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::Cycles;

/// Smallest delay accepted by `seq_bar`.
pub const MIN_SEQ_BAR_DELAY: Cycles = 1;

#[derive(Debug)]
pub struct SanitizationChange {
    pub field: &'static str,
    pub original: String,
    pub sanitized: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct CodeGeneratorSettings {
    /// Emit explanatory comments alongside the generated instructions.
    pub emit_comments: bool,
    /// Delay every slot waits at program start on top of its latency compensation.
    pub min_delay: Cycles,
}

impl Default for CodeGeneratorSettings {
    fn default() -> Self {
        Self {
            emit_comments: true,
            min_delay: MIN_SEQ_BAR_DELAY,
        }
    }
}

impl CodeGeneratorSettings {
    pub fn new(emit_comments: bool, min_delay: Cycles) -> Self {
        CodeGeneratorSettings {
            emit_comments,
            min_delay,
        }
    }

    pub fn sanitize(&mut self) -> Vec<SanitizationChange> {
        let mut changes = vec![];
        if self.min_delay < MIN_SEQ_BAR_DELAY {
            changes.push(SanitizationChange {
                field: "min_delay",
                original: self.min_delay.to_string(),
                sanitized: MIN_SEQ_BAR_DELAY.to_string(),
                reason: format!("seq_bar requires a delay of at least {MIN_SEQ_BAR_DELAY}."),
            });
            self.min_delay = MIN_SEQ_BAR_DELAY;
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_sane() {
        let mut settings = CodeGeneratorSettings::default();
        assert!(settings.sanitize().is_empty());
        assert_eq!(settings.min_delay, 1);
        assert!(settings.emit_comments);
    }

    #[test]
    fn test_sanitization_change() {
        let mut settings = CodeGeneratorSettings::new(false, 0);
        let changes = settings.sanitize();
        assert_eq!(settings.min_delay, MIN_SEQ_BAR_DELAY);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "min_delay");
        assert_eq!(changes[0].original, "0");
        assert_eq!(changes[0].sanitized, "1");
    }
}
