// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::{Cycles, DigitalWord};

/// Controller register, e.g. `R63`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub u8);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CcStatement {
    Comment {
        text: String,
    },
    /// Empty line separating blocks of code.
    Separator,
    /// Drive `word` onto the digital outputs of `slot` for `duration` cycles.
    SeqOut {
        slot: u32,
        word: DigitalWord,
        duration: Cycles,
        comment: Option<String>,
    },
    /// Synchronization barrier followed by a delay of `delay` cycles on `slot`.
    SeqBar {
        slot: u32,
        delay: Cycles,
        comment: Option<String>,
    },
    Label {
        label: String,
        comment: Option<String>,
    },
    /// Load an immediate into a register, optionally labelled.
    Move {
        label: Option<String>,
        value: u64,
        register: Register,
        comment: Option<String>,
    },
    /// Decrement `register` and branch to `label` while nonzero.
    Loop {
        register: Register,
        label: String,
        comment: Option<String>,
    },
    Jump {
        label: String,
        comment: Option<String>,
    },
    Stop,
}

impl CcStatement {
    pub fn is_comment(&self) -> bool {
        matches!(self, CcStatement::Comment { .. } | CcStatement::Separator)
    }
}
