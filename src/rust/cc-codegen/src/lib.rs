// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Code generator for the Central Controller (CC).
//!
//! Translates scheduled bundles of quantum gates into the per-slot `seq_out`
//! instruction stream executed by the controller, while keeping the codeword
//! assignment of every instrument group consistent over the whole program.

pub mod backend;
pub mod cc_generator;
pub mod cc_statements;
pub mod code_generator;
pub mod codeword_table;
pub mod config;
pub mod ir;
pub mod latency;
pub mod settings;
pub mod slot_tracker;

pub use backend::{Backend, CompilationResult, Scheduler};
pub use code_generator::CodeGenerator;
pub use codeword_table::{CodewordMap, CodewordMode, CodewordTable};
pub use config::HardwareConfig;
pub use settings::CodeGeneratorSettings;

/// Version tag written into generated code and exported codeword maps.
pub const CC_BACKEND_VERSION: &str = "0.3.0";

/// Controller cycles.
pub type Cycles = u64;

/// Hardware controller word driven onto (or read from) a slot's digital interface.
pub type DigitalWord = u32;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Signal conflict on instrument '{instrument}', group {group}, between '{existing}' and '{requested}'"
    )]
    SignalConflict {
        instrument: String,
        group: usize,
        existing: String,
        requested: String,
    },

    #[error(
        "Mismatch between preloaded codeword map and program requirements: signal value '{value}' \
        on instrument '{instrument}', group {group}: {detail}"
    )]
    CodewordMismatch {
        instrument: String,
        group: usize,
        value: String,
        detail: String,
    },

    #[error(
        "Codeword {codeword} on instrument '{instrument}', group {group} does not fit into {bits} control bits"
    )]
    CodewordOverflow {
        instrument: String,
        group: usize,
        codeword: usize,
        bits: usize,
    },

    #[error(
        "Inconsistency detected in bundle contents: time travel not possible on instrument \
        '{instrument}' (slot {slot}): target cycle {target} precedes already emitted cycle {ledger}"
    )]
    TimeTravel {
        instrument: String,
        slot: u32,
        ledger: Cycles,
        target: Cycles,
    },

    #[error("Not implemented: {0}")]
    Unimplemented(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new(msg: &str) -> Self {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }

    pub(crate) fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
