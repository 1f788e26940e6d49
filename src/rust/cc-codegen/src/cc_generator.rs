// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::cc_statements::{CcStatement, Register};
use crate::{Cycles, DigitalWord};

const LABEL_WIDTH: usize = 8;
const INSTRUCTION_WIDTH: usize = 8;
const OPERANDS_WIDTH: usize = 24;

fn slot_selector(slot: u32) -> String {
    format!("[{slot}]")
}

fn label_definition(label: &str) -> String {
    format!("{label}:")
}

/// Collects the statements of a CC program and renders them as assembly text.
#[derive(Clone, Debug, PartialEq)]
pub struct CcGenerator {
    emit_comments: bool,
    statements: Vec<CcStatement>,
}

impl Default for CcGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CcGenerator {
    pub fn new(emit_comments: bool) -> Self {
        Self {
            emit_comments,
            statements: Vec::new(),
        }
    }

    pub fn statements(&self) -> &Vec<CcStatement> {
        &self.statements
    }

    pub fn num_statements(&self) -> usize {
        self.statements.len()
    }

    pub fn num_noncomment_statements(&self) -> usize {
        self.statements.iter().filter(|s| !s.is_comment()).count()
    }

    pub fn add_comment<S: Into<String>>(&mut self, comment: S) {
        self.statements.push(CcStatement::Comment {
            text: comment.into(),
        });
    }

    pub fn add_separator(&mut self) {
        self.statements.push(CcStatement::Separator);
    }

    pub fn add_seq_out<S: Into<String>>(
        &mut self,
        slot: u32,
        word: DigitalWord,
        duration: Cycles,
        comment: Option<S>,
    ) {
        self.statements.push(CcStatement::SeqOut {
            slot,
            word,
            duration,
            comment: comment.map(Into::into),
        });
    }

    pub fn add_seq_bar<S: Into<String>>(&mut self, slot: u32, delay: Cycles, comment: Option<S>) {
        self.statements.push(CcStatement::SeqBar {
            slot,
            delay,
            comment: comment.map(Into::into),
        });
    }

    pub fn add_label<S1: Into<String>, S2: Into<String>>(
        &mut self,
        label: S1,
        comment: Option<S2>,
    ) {
        self.statements.push(CcStatement::Label {
            label: label.into(),
            comment: comment.map(Into::into),
        });
    }

    pub fn add_move<S1: Into<String>, S2: Into<String>>(
        &mut self,
        label: Option<S1>,
        value: u64,
        register: Register,
        comment: Option<S2>,
    ) {
        self.statements.push(CcStatement::Move {
            label: label.map(Into::into),
            value,
            register,
            comment: comment.map(Into::into),
        });
    }

    pub fn add_loop<S1: Into<String>, S2: Into<String>>(
        &mut self,
        register: Register,
        label: S1,
        comment: Option<S2>,
    ) {
        self.statements.push(CcStatement::Loop {
            register,
            label: label.into(),
            comment: comment.map(Into::into),
        });
    }

    pub fn add_jump<S1: Into<String>, S2: Into<String>>(&mut self, label: S1, comment: Option<S2>) {
        self.statements.push(CcStatement::Jump {
            label: label.into(),
            comment: comment.map(Into::into),
        });
    }

    pub fn add_stop(&mut self) {
        self.statements.push(CcStatement::Stop);
    }

    pub fn generate_cc_code(&self) -> String {
        self.statements
            .iter()
            .filter_map(|statement| self.emit_statement(statement))
            .collect::<String>()
    }

    fn format_instruction(
        &self,
        label: &str,
        instruction: &str,
        operands: &str,
        comment: &Option<String>,
    ) -> String {
        let comment = match comment {
            Some(comment) if self.emit_comments => comment.as_str(),
            _ => "",
        };
        let line = format!(
            "{label:<LABEL_WIDTH$}{instruction:<INSTRUCTION_WIDTH$}{operands:<OPERANDS_WIDTH$}{comment}"
        );
        format!("{}\n", line.trim_end())
    }

    fn emit_statement(&self, statement: &CcStatement) -> Option<String> {
        let text = match statement {
            CcStatement::Comment { text } => {
                if !self.emit_comments {
                    return None;
                }
                format!("{}\n", text.trim_end())
            }
            CcStatement::Separator => {
                if !self.emit_comments {
                    return None;
                }
                "\n".to_string()
            }
            CcStatement::SeqOut {
                slot,
                word,
                duration,
                comment,
            } => self.format_instruction(
                &slot_selector(*slot),
                "seq_out",
                &format!("0x{word:08x},{duration}"),
                comment,
            ),
            CcStatement::SeqBar {
                slot,
                delay,
                comment,
            } => self.format_instruction(
                &slot_selector(*slot),
                "seq_bar",
                &delay.to_string(),
                comment,
            ),
            CcStatement::Label { label, comment } => {
                self.format_instruction(&label_definition(label), "", "", comment)
            }
            CcStatement::Move {
                label,
                value,
                register,
                comment,
            } => self.format_instruction(
                &label.as_deref().map(label_definition).unwrap_or_default(),
                "move",
                &format!("{value},{register}"),
                comment,
            ),
            CcStatement::Loop {
                register,
                label,
                comment,
            } => self.format_instruction("", "loop", &format!("{register},@{label}"), comment),
            CcStatement::Jump { label, comment } => {
                self.format_instruction("", "jmp", &format!("@{label}"), comment)
            }
            CcStatement::Stop => self.format_instruction("", "stop", "", &None),
        };
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_columns() {
        let mut generator = CcGenerator::new(true);
        generator.add_seq_out(3, 0x14, 20, Some("# cycle 10-30"));
        generator.add_seq_bar(0, 16, None::<&str>);
        generator.add_stop();
        assert_eq!(
            generator.generate_cc_code(),
            "[3]     seq_out 0x00000014,20           # cycle 10-30\n\
             [0]     seq_bar 16\n        stop\n"
        );
    }

    #[test]
    fn test_control_flow() {
        let mut generator = CcGenerator::new(true);
        generator.add_move(Some("sp1"), 5, Register(63), Some("# loop counter"));
        generator.add_loop(Register(63), "sp1", None::<&str>);
        generator.add_label("rus", None::<&str>);
        generator.add_jump("rus", None::<&str>);
        assert_eq!(
            generator.generate_cc_code(),
            "sp1:    move    5,R63                   # loop counter\n        loop    R63,@sp1\nrus:\n        jmp     @rus\n"
        );
    }

    #[test]
    fn test_comment_suppression() {
        let mut generator = CcGenerator::new(false);
        generator.add_comment("# header");
        generator.add_separator();
        generator.add_seq_out(0, 0, 4, Some("# padding"));
        assert_eq!(generator.num_statements(), 3);
        assert_eq!(generator.num_noncomment_statements(), 1);
        assert_eq!(generator.generate_cc_code(), "[0]     seq_out 0x00000000,4\n");
    }

    #[test]
    fn test_long_label_is_not_truncated() {
        let mut generator = CcGenerator::new(true);
        generator.add_label("a_long_label", None::<&str>);
        assert_eq!(generator.generate_cc_code(), "a_long_label:\n");
    }
}
