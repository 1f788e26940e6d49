// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Read-only model of the instruments attached to the controller.

use std::collections::HashSet;
use std::sync::Arc;

use cc_log::debug;
use indexmap::IndexMap;
use serde_json::Value;

use crate::config::{
    CcInstructionConfig, ControlModeConfig, HardwareConfig, InstrumentConfig, SignalConfig,
};
use crate::ir::{GroupIndex, QubitIndex};
use crate::{Cycles, Error, Result};

/// Bit layout contract between the controller and one kind of instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMode {
    pub name: String,
    /// Per group, output bits from MSB to LSB. A single bit denotes a mask.
    pub control_bits: Vec<Vec<u32>>,
    pub trigger_bits: Vec<u32>,
    /// Per group, the input bit asserted when the group measures.
    pub result_bits: Option<Vec<u32>>,
}

impl ControlMode {
    /// Number of groups with an own control bit layout.
    pub fn num_groups(&self) -> usize {
        self.control_bits.len()
    }

    /// A control mode with a single layout drives all groups of the instrument
    /// with that same layout (vector mode).
    pub fn is_vector_mode(&self) -> bool {
        self.control_bits.len() == 1
    }
}

#[derive(Debug, Clone)]
pub struct Instrument {
    pub name: String,
    pub slot: u32,
    pub signal_type: String,
    pub control_mode: Arc<ControlMode>,
    /// Qubits served per group.
    pub qubits: Vec<Vec<QubitIndex>>,
    /// Physical latency in ns.
    pub latency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionType {
    Readout,
    Other(String),
}

impl From<&str> for InstructionType {
    fn from(s: &str) -> Self {
        match s {
            "readout" => InstructionType::Readout,
            other => InstructionType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalTemplate {
    pub signal_type: String,
    pub operand_idx: usize,
    pub value: String,
}

impl SignalTemplate {
    fn from_config(config: &SignalConfig) -> Self {
        let value = match &config.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        SignalTemplate {
            signal_type: config.signal_type.clone(),
            operand_idx: config.operand_idx,
            value,
        }
    }

    /// Expand the template placeholders into a literal signal value.
    pub fn expand(
        &self,
        gate_name: &str,
        instrument_name: &str,
        group: GroupIndex,
        qubit: QubitIndex,
    ) -> String {
        self.value
            .replace("{gateName}", gate_name)
            .replace("{instrumentName}", instrument_name)
            .replace("{instrumentGroup}", &group.to_string())
            .replace("{qubit}", &qubit.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDefinition {
    pub name: String,
    pub instruction_type: InstructionType,
    pub signals: Vec<SignalTemplate>,
}

impl InstructionDefinition {
    pub fn is_readout(&self) -> bool {
        self.instruction_type == InstructionType::Readout
    }
}

/// Instrument and group that produce a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalInfo {
    /// Position of the instrument in [`Topology::instruments`].
    pub instrument_index: usize,
    pub group: GroupIndex,
}

#[derive(Debug, Clone)]
pub struct Topology {
    cycle_time: u64,
    instruments: Vec<Instrument>,
    instructions: IndexMap<String, InstructionDefinition>,
}

fn validate_control_mode(name: &str, mode: &ControlMode) -> Result<()> {
    if mode.control_bits.is_empty() {
        return Err(Error::configuration(format!(
            "Control mode '{name}' does not define any 'control_bits'"
        )));
    }
    if let Some(group) = mode.control_bits.iter().position(|bits| bits.is_empty()) {
        return Err(Error::configuration(format!(
            "Control mode '{name}' defines no control bits for group {group}"
        )));
    }
    let all_bits = mode
        .control_bits
        .iter()
        .flatten()
        .chain(mode.trigger_bits.iter());
    for bit in all_bits {
        if *bit >= 32 {
            return Err(Error::configuration(format!(
                "Control mode '{name}' uses bit {bit}, which exceeds the 32 bit digital interface"
            )));
        }
    }
    Ok(())
}

fn build_control_mode(name: &str, config: &ControlModeConfig) -> Result<ControlMode> {
    let result_bits = match &config.result_bits {
        Some(groups) => {
            let mut bits = Vec::with_capacity(groups.len());
            for group_bits in groups {
                match group_bits.as_slice() {
                    [bit] if *bit < 32 => bits.push(*bit),
                    _ => {
                        return Err(Error::configuration(format!(
                            "JSON key '{name}/result_bits' must have 1 bit per group"
                        )));
                    }
                }
            }
            Some(bits)
        }
        None => None,
    };
    let mode = ControlMode {
        name: name.to_string(),
        control_bits: config.control_bits.clone(),
        trigger_bits: config.trigger_bits.clone(),
        result_bits,
    };
    validate_control_mode(name, &mode)?;
    Ok(mode)
}

impl Topology {
    pub fn from_config(config: &HardwareConfig) -> Result<Self> {
        if config.cycle_time == 0 {
            return Err(Error::configuration("'cycle_time' must be positive"));
        }
        let backend = &config.eqasm_backend_cc;

        let mut control_modes: IndexMap<&str, Arc<ControlMode>> = IndexMap::new();
        for (name, mode) in &backend.control_modes {
            control_modes.insert(name, Arc::new(build_control_mode(name, mode)?));
        }

        let mut names = HashSet::new();
        let mut slots = HashSet::new();
        let mut instruments = Vec::with_capacity(backend.instruments.len());
        for instrument in &backend.instruments {
            if !names.insert(instrument.name.as_str()) {
                return Err(Error::configuration(format!(
                    "Instrument '{}' is defined more than once",
                    instrument.name
                )));
            }
            if !slots.insert(instrument.controller.slot) {
                return Err(Error::configuration(format!(
                    "Instrument '{}' uses controller slot {}, which is already occupied",
                    instrument.name, instrument.controller.slot
                )));
            }
            instruments.push(Self::build_instrument(config, &control_modes, instrument)?);
        }
        instruments.sort_by_key(|instrument| instrument.slot);

        let mut instructions = IndexMap::new();
        for (name, instruction) in &config.instructions {
            let signals: &[SignalConfig] = match instruction.cc.as_ref() {
                Some(CcInstructionConfig {
                    signal_ref: Some(signal_ref),
                    ..
                }) => backend.signals.get(signal_ref).ok_or_else(|| {
                    Error::configuration(format!(
                        "Error in JSON definition of instruction '{name}': signal_ref '{signal_ref}' does not resolve"
                    ))
                })?,
                Some(CcInstructionConfig {
                    signal: Some(signal),
                    ..
                }) => signal,
                _ => &[],
            };
            instructions.insert(
                name.clone(),
                InstructionDefinition {
                    name: name.clone(),
                    instruction_type: instruction.instruction_type.as_str().into(),
                    signals: signals.iter().map(SignalTemplate::from_config).collect(),
                },
            );
        }

        Ok(Topology {
            cycle_time: config.cycle_time,
            instruments,
            instructions,
        })
    }

    fn build_instrument(
        config: &HardwareConfig,
        control_modes: &IndexMap<&str, Arc<ControlMode>>,
        instrument: &InstrumentConfig,
    ) -> Result<Instrument> {
        let backend = &config.eqasm_backend_cc;
        let definition = backend
            .instrument_definitions
            .get(&instrument.ref_instrument_definition)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Could not find instrument definition '{}' of instrument '{}' in 'instrument_definitions'",
                    instrument.ref_instrument_definition, instrument.name
                ))
            })?;
        let control_mode = control_modes
            .get(instrument.ref_control_mode.as_str())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Could not find control mode '{}' of instrument '{}' in 'control_modes'",
                    instrument.ref_control_mode, instrument.name
                ))
            })?;
        debug!(
            "Latency of '{}' in slot {} is {} ns",
            instrument.ref_instrument_definition,
            instrument.controller.slot,
            definition.latency
        );
        Ok(Instrument {
            name: instrument.name.clone(),
            slot: instrument.controller.slot,
            signal_type: instrument.ref_signals_type.clone(),
            control_mode: Arc::clone(control_mode),
            qubits: instrument.qubits.clone(),
            latency: definition.latency,
        })
    }

    pub fn cycle_time(&self) -> u64 {
        self.cycle_time
    }

    /// Convert a duration in ns into controller cycles, rounding up.
    pub fn time_to_cycles(&self, time_ns: u64) -> Cycles {
        time_ns.div_ceil(self.cycle_time)
    }

    /// Instruments in ascending slot order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, index: usize) -> &Instrument {
        &self.instruments[index]
    }

    pub fn control_mode_for<'i>(&self, instrument: &'i Instrument) -> &'i ControlMode {
        &instrument.control_mode
    }

    pub fn instruction(&self, name: &str) -> Result<&InstructionDefinition> {
        self.instructions.get(name).ok_or_else(|| {
            Error::configuration(format!("JSON file: instruction not found: '{name}'"))
        })
    }

    /// Find the instrument and group providing `signal_type` for `qubit`.
    pub fn resolve_driver(&self, signal_type: &str, qubit: QubitIndex) -> Result<SignalInfo> {
        let mut signal_type_found = false;
        for (instrument_index, instrument) in self.instruments.iter().enumerate() {
            if instrument.signal_type != signal_type {
                continue;
            }
            signal_type_found = true;
            if let Some(group) = instrument
                .qubits
                .iter()
                .position(|qubits| qubits.contains(&qubit))
            {
                debug!(
                    "Qubit {} signal type '{}' driven by instrument '{}' group {}",
                    qubit,
                    signal_type,
                    instrument.name,
                    group
                );
                return Ok(SignalInfo {
                    instrument_index,
                    group,
                });
            }
        }
        if !signal_type_found {
            return Err(Error::configuration(format!(
                "No instruments found providing signal type '{signal_type}'"
            )));
        }
        Err(Error::configuration(format!(
            "No instruments found driving qubit {qubit} for signal type '{signal_type}'"
        )))
    }
}
