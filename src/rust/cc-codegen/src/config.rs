// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Structured hardware configuration as consumed by the code generator.
//!
//! The layout mirrors the platform configuration document: a global `cycle_time`,
//! the instruction set, and the `eqasm_backend_cc` section describing the
//! instruments attached to the controller.

use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareConfig {
    /// Duration of one controller cycle in ns.
    pub cycle_time: u64,
    #[serde(default)]
    pub instructions: IndexMap<String, InstructionConfig>,
    pub eqasm_backend_cc: BackendConfig,
}

impl HardwareConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config = serde_json::from_str(json).context("Failed to parse hardware configuration")?;
        Ok(config)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let config =
            serde_json::from_value(value).context("Failed to parse hardware configuration")?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub instrument_definitions: IndexMap<String, InstrumentDefinitionConfig>,
    pub control_modes: IndexMap<String, ControlModeConfig>,
    #[serde(default)]
    pub signals: IndexMap<String, Vec<SignalConfig>>,
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentDefinitionConfig {
    /// Physical latency in ns.
    pub latency: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlModeConfig {
    #[serde(default)]
    pub control_bits: Vec<Vec<u32>>,
    #[serde(default)]
    pub trigger_bits: Vec<u32>,
    pub result_bits: Option<Vec<Vec<u32>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerConfig {
    pub slot: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    pub name: String,
    pub ref_signals_type: String,
    pub ref_instrument_definition: String,
    pub ref_control_mode: String,
    pub controller: ControllerConfig,
    /// Qubits connected to every group of the instrument.
    pub qubits: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(rename = "type")]
    pub signal_type: String,
    pub operand_idx: usize,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstructionConfig {
    #[serde(rename = "type")]
    pub instruction_type: String,
    #[serde(default)]
    pub cc: Option<CcInstructionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CcInstructionConfig {
    pub signal_ref: Option<String>,
    pub signal: Option<Vec<SignalConfig>>,
}
