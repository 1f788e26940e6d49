// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Translation of scheduled bundles into CC instructions.
//!
//! Gates of a bundle only record which signal they request on which instrument
//! group. The actual output words are computed once the bundle is complete, in
//! [`CodeGenerator::bundle_finish`], because several gates may contribute to the
//! word of the same slot.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use cc_log::{debug, diagnostic, warn};

use crate::cc_generator::CcGenerator;
use crate::cc_statements::Register;
use crate::codeword_table::{CodewordMap, CodewordTable};
use crate::ir::{
    BranchCondition, CregIndex, GroupIndex, Instrument, QubitIndex, SignalInfo, Topology,
};
use crate::latency::{LatencyCompensation, calculate_latency_compensation};
use crate::settings::CodeGeneratorSettings;
use crate::slot_tracker::SlotTracker;
use crate::{CC_BACKEND_VERSION, Cycles, DigitalWord, Error, Result};

const CLASSICAL_INSTRUCTIONS: [&str; 15] = [
    "add", "sub", "and", "or", "xor", "not", "nop", "ldi", "mov", "eq", "ne", "lt", "gt", "le",
    "ge",
];

/// Register used as counter by the outermost loop. Nested loops count downwards.
const LOOP_COUNTER_REGISTER: u8 = 63;

/// Signal requested on one instrument group within a bundle.
#[derive(Debug, Clone, PartialEq)]
struct GroupSignal {
    value: String,
    /// Duration in ns.
    duration: u64,
    readout_creg: Option<CregIndex>,
}

/// Signals requested by the gates of the current bundle, per instrument.
#[derive(Debug)]
struct BundleSignals {
    groups: Vec<BTreeMap<GroupIndex, GroupSignal>>,
}

impl BundleSignals {
    fn new(num_instruments: usize) -> Self {
        Self {
            groups: vec![BTreeMap::new(); num_instruments],
        }
    }

    fn assign(
        &mut self,
        instrument: &Instrument,
        info: SignalInfo,
        value: String,
        duration: u64,
        readout_creg: Option<CregIndex>,
    ) -> Result<()> {
        match self.groups[info.instrument_index].entry(info.group) {
            Entry::Vacant(entry) => {
                entry.insert(GroupSignal {
                    value,
                    duration,
                    readout_creg,
                });
            }
            Entry::Occupied(mut entry) => {
                let signal = entry.get_mut();
                if signal.value != value {
                    return Err(Error::SignalConflict {
                        instrument: instrument.name.clone(),
                        group: info.group,
                        existing: signal.value.clone(),
                        requested: value,
                    });
                }
                signal.duration = signal.duration.max(duration);
                if readout_creg.is_some() {
                    signal.readout_creg = readout_creg;
                }
            }
        }
        Ok(())
    }
}

/// Words and duration of one slot for the current bundle.
#[derive(Debug, Default, PartialEq, Eq)]
struct SlotOutput {
    output: DigitalWord,
    input: DigitalWord,
    duration: Cycles,
}

pub struct CodeGenerator<'a> {
    topology: &'a Topology,
    settings: CodeGeneratorSettings,
    codewords: CodewordTable,
    generator: CcGenerator,
    tracker: SlotTracker,
    bundle: Option<BundleSignals>,
    open_loops: Vec<(String, Register)>,
}

impl<'a> CodeGenerator<'a> {
    /// Create a code generator.
    ///
    /// If `preloaded_map` is given, codewords are taken from it and any signal
    /// not present in the map is an error. Otherwise codewords are assigned
    /// on demand.
    pub fn new(
        topology: &'a Topology,
        settings: &CodeGeneratorSettings,
        preloaded_map: Option<CodewordMap>,
    ) -> Self {
        let mut settings = settings.clone();
        for change in settings.sanitize() {
            warn!(
                "Setting '{}' changed from {} to {}: {}",
                change.field,
                change.original,
                change.sanitized,
                change.reason
            );
        }
        let codewords = match preloaded_map {
            Some(map) => CodewordTable::preloaded(map),
            None => CodewordTable::new(),
        };
        Self {
            topology,
            generator: CcGenerator::new(settings.emit_comments),
            settings,
            codewords,
            tracker: SlotTracker::new(topology.instruments().len()),
            bundle: None,
            open_loops: Vec::new(),
        }
    }

    /// The generated program text.
    pub fn code(&self) -> String {
        self.generator.generate_cc_code()
    }

    pub fn generator(&self) -> &CcGenerator {
        &self.generator
    }

    pub fn codeword_map(&self) -> CodewordMap {
        self.codewords.export()
    }

    /// Ledger of the instrument at `instrument_index` in slot order.
    pub fn current_cycle(&self, instrument_index: usize) -> Cycles {
        self.tracker.current_cycle(instrument_index)
    }

    pub fn comment<S: Into<String>>(&mut self, comment: S) {
        self.generator.add_comment(comment);
    }

    pub fn program_start(&mut self, program_name: &str) -> LatencyCompensation {
        self.comment(format!("# CC_BACKEND_VERSION {CC_BACKEND_VERSION}"));
        self.comment(format!("# Program: '{program_name}'"));
        self.comment("# Note:    generated by CC backend");
        self.comment("#");
        self.latency_compensation()
    }

    pub fn program_finish(&mut self) {
        self.generator.add_stop();
    }

    fn latency_compensation(&mut self) -> LatencyCompensation {
        let compensation = calculate_latency_compensation(self.topology, self.settings.min_delay);
        self.comment("# synchronous start and latency compensation");
        for (slot, delay) in compensation.iter() {
            self.generator
                .add_seq_bar(slot, delay, Some("# latency compensation"));
        }
        compensation
    }

    /// Start the time base of a kernel: all slot ledgers restart at cycle 0.
    pub fn kernel_start(&mut self) {
        self.tracker.reset();
    }

    pub fn kernel_finish(&mut self) {}

    /// Begin a bundle with no requested signals.
    pub fn bundle_start<S: Into<String>>(&mut self, comment: S) {
        self.bundle = Some(BundleSignals::new(self.topology.instruments().len()));
        self.comment(comment);
    }

    fn bundle_signals(&mut self) -> Result<&mut BundleSignals> {
        self.bundle
            .as_mut()
            .ok_or_else(|| Error::new("Internal error: gate outside of bundle"))
    }

    /// Record the signals of a gate defined by the platform instruction set.
    pub fn custom_gate(
        &mut self,
        name: &str,
        qubits: &[QubitIndex],
        cregs: &[CregIndex],
        duration: u64,
        angle: f64,
    ) -> Result<()> {
        if angle != 0.0 {
            debug!("Gate '{}' has angle {}, which is ignored", name, angle);
        }
        let topology = self.topology;
        let instruction = topology.instruction(name)?;

        let readout_creg = if instruction.is_readout() {
            let (creg, qubit) = match (cregs, qubits) {
                ([creg], [qubit]) => (*creg, *qubit),
                ([_], _) => {
                    return Err(Error::configuration(format!(
                        "Readout instruction requires exactly 1 qubit operand, not {}",
                        qubits.len()
                    )));
                }
                _ => {
                    return Err(Error::configuration(format!(
                        "Readout instruction requires exactly 1 classical operand, not {}",
                        cregs.len()
                    )));
                }
            };
            self.comment(format!(" # READOUT: {name}(c{creg},q{qubit})"));
            Some(creg)
        } else {
            let operands = qubits
                .iter()
                .map(|q| q.to_string())
                .collect::<Vec<_>>()
                .join(",");
            self.comment(format!(" # gate '{name} {operands}'"));
            None
        };

        for template in &instruction.signals {
            let qubit = *qubits.get(template.operand_idx).ok_or_else(|| {
                Error::configuration(format!(
                    "Error in JSON definition of instruction '{name}': illegal operand number {}, \
                    gate has {} qubit operands",
                    template.operand_idx,
                    qubits.len()
                ))
            })?;
            let info = topology.resolve_driver(&template.signal_type, qubit)?;
            let instrument = topology.instrument(info.instrument_index);
            let value = template.expand(name, &instrument.name, info.group, qubit);
            self.comment(format!(
                "  # slot={}, group={}, instrument='{}', signal='{}'",
                instrument.slot, info.group, instrument.name, value
            ));
            self.bundle_signals()?
                .assign(instrument, info, value, duration, readout_creg)?;
        }
        Ok(())
    }

    pub fn nop_gate(&mut self) -> Result<()> {
        self.comment("# NOP gate");
        Err(Error::Unimplemented("NOP gate".to_string()))
    }

    pub fn classical_instruction(&mut self, name: &str, cregs: &[CregIndex]) -> Result<()> {
        if CLASSICAL_INSTRUCTIONS.contains(&name) {
            return Err(Error::Unimplemented(format!(
                "Classical instruction '{name}'"
            )));
        }
        Err(Error::configuration(format!(
            "Unknown classical operation '{name}' with {} operands",
            cregs.len()
        )))
    }

    /// Emit the code of the current bundle.
    ///
    /// Slots without requested signals emit nothing; their idle time is padded once
    /// they are used again or, for `is_last_bundle`, at the end of the bundle, where
    /// all slots are aligned to `start_cycle + duration_in_cycles`.
    ///
    /// Timing and encoding of all slots are checked before anything is emitted, so
    /// a failing bundle leaves the generated code untouched.
    pub fn bundle_finish(
        &mut self,
        start_cycle: Cycles,
        duration_in_cycles: Cycles,
        is_last_bundle: bool,
    ) -> Result<()> {
        let signals = self.bundle.take().ok_or_else(|| {
            Error::new("Internal error: bundle_finish() without matching bundle_start()")
        })?;
        let topology = self.topology;
        let end_cycle = start_cycle + duration_in_cycles;

        for (index, instrument) in topology.instruments().iter().enumerate() {
            let groups = &signals.groups[index];
            if !groups.is_empty() {
                self.tracker
                    .check_reachable(index, instrument, start_cycle)?;
            }
            if is_last_bundle {
                self.tracker.check_reachable(index, instrument, end_cycle)?;
                let output_end = start_cycle + self.slot_duration(groups);
                if output_end > end_cycle {
                    return Err(Error::TimeTravel {
                        instrument: instrument.name.clone(),
                        slot: instrument.slot,
                        ledger: output_end,
                        target: end_cycle,
                    });
                }
            }
        }

        let mut outputs = Vec::with_capacity(signals.groups.len());
        for (instrument, groups) in topology.instruments().iter().zip(&signals.groups) {
            let output = if groups.is_empty() {
                None
            } else {
                Some(self.encode_slot(instrument, groups)?)
            };
            outputs.push(output);
        }

        if is_last_bundle {
            self.comment(" # last bundle, will pad outputs to match durations");
        }
        for (index, instrument) in topology.instruments().iter().enumerate() {
            if let Some(output) = &outputs[index] {
                debug!(
                    "bundle_finish(): slot={}, ledger={}, start_cycle={}, duration={}, instrument='{}'",
                    instrument.slot,
                    self.tracker.current_cycle(index),
                    start_cycle,
                    output.duration,
                    instrument.name
                );
                self.tracker.add_output(
                    &mut self.generator,
                    index,
                    instrument,
                    start_cycle,
                    output.output,
                    output.duration,
                )?;
                if output.input != 0 {
                    let cregs = signals.groups[index]
                        .values()
                        .filter_map(|signal| signal.readout_creg)
                        .map(|creg| format!("c{creg}"))
                        .collect::<Vec<_>>()
                        .join(",");
                    self.comment(format!(
                        "# digIn=0x{:08x}, readout into [{cregs}]",
                        output.input
                    ));
                }
            }
            if is_last_bundle {
                self.tracker
                    .pad_to_cycle(&mut self.generator, index, instrument, end_cycle)?;
            }
        }
        self.generator.add_separator();
        Ok(())
    }

    /// Longest signal of the slot in cycles.
    fn slot_duration(&self, groups: &BTreeMap<GroupIndex, GroupSignal>) -> Cycles {
        groups
            .values()
            .map(|signal| self.topology.time_to_cycles(signal.duration))
            .max()
            .unwrap_or(0)
    }

    fn encode_slot(
        &mut self,
        instrument: &Instrument,
        groups: &BTreeMap<GroupIndex, GroupSignal>,
    ) -> Result<SlotOutput> {
        let mut slot = SlotOutput {
            duration: self.slot_duration(groups),
            ..Default::default()
        };
        for (group, signal) in groups {
            let (output, input) = self.encode_group(instrument, *group, signal)?;
            slot.output |= output;
            slot.input |= input;
        }
        diagnostic!(
            "Instrument '{}' in slot {}: output 0x{:08x}, input 0x{:08x}, {} cycles",
            instrument.name,
            instrument.slot,
            slot.output,
            slot.input,
            slot.duration
        );
        Ok(slot)
    }

    /// Compute the output and input word fragments of one group.
    fn encode_group(
        &mut self,
        instrument: &Instrument,
        group: GroupIndex,
        signal: &GroupSignal,
    ) -> Result<(DigitalWord, DigitalWord)> {
        let mode = self.topology.control_mode_for(instrument);
        let mode_group = if mode.is_vector_mode() {
            0
        } else if group < mode.num_groups() {
            group
        } else {
            return Err(Error::configuration(format!(
                "Instrument '{}' uses group {}, but control mode '{}' only defines {} groups",
                instrument.name,
                group,
                mode.name,
                mode.num_groups()
            )));
        };
        let control_bits = &mode.control_bits[mode_group];

        let mut output: DigitalWord = 0;
        if let [bit] = control_bits.as_slice() {
            // Masks are active high.
            output |= 1 << *bit;
        } else {
            if group != mode_group {
                return Err(Error::Unimplemented(format!(
                    "Vector mode with codewords on instrument '{}' (control mode '{}')",
                    instrument.name, mode.name
                )));
            }
            let codeword =
                self.codewords
                    .lookup_or_allocate(&instrument.name, group, &signal.value)?;
            let num_bits = control_bits.len();
            if codeword.checked_shr(num_bits as u32).unwrap_or(0) != 0 {
                return Err(Error::CodewordOverflow {
                    instrument: instrument.name.clone(),
                    group,
                    codeword,
                    bits: num_bits,
                });
            }
            // Control bits are listed from MSB to LSB.
            for (idx, bit) in control_bits.iter().enumerate() {
                let codeword_bit = (num_bits - 1 - idx) as u32;
                if codeword.checked_shr(codeword_bit).unwrap_or(0) & 1 == 1 {
                    output |= 1 << *bit;
                }
            }
        }

        match mode.trigger_bits.as_slice() {
            [] => {}
            [shared] => output |= 1 << *shared,
            per_group => match per_group.get(group) {
                Some(bit) => output |= 1 << *bit,
                None => {
                    return Err(Error::configuration(format!(
                        "Control mode '{}' defines {} trigger bits, but instrument '{}' uses group {}",
                        mode.name,
                        per_group.len(),
                        instrument.name,
                        group
                    )));
                }
            },
        }

        let mut input: DigitalWord = 0;
        if let Some(result_bits) = &mode.result_bits {
            match result_bits.get(group) {
                Some(bit) => input |= 1 << *bit,
                None => {
                    return Err(Error::configuration(format!(
                        "JSON key '{}/result_bits' must have 1 bit per group, group {} is missing",
                        mode.name, group
                    )));
                }
            }
        }
        Ok((output, input))
    }

    pub fn if_start(&mut self, condition: &BranchCondition) -> Result<()> {
        self.comment(format!("# IF_START({condition})"));
        Err(Error::Unimplemented("Conditional kernel (if)".to_string()))
    }

    pub fn else_start(&mut self, condition: &BranchCondition) -> Result<()> {
        self.comment(format!("# ELSE_START({condition})"));
        Err(Error::Unimplemented("Conditional kernel (else)".to_string()))
    }

    pub fn for_start(&mut self, label: &str, iterations: u64) -> Result<()> {
        let depth = self.open_loops.len();
        if depth > LOOP_COUNTER_REGISTER as usize {
            return Err(Error::new(&format!(
                "Loop '{label}' is nested too deeply: no loop counter register left"
            )));
        }
        let register = Register(LOOP_COUNTER_REGISTER - depth as u8);
        self.comment(format!("# FOR_START({iterations})"));
        self.generator.add_move(
            Some(label),
            iterations,
            register,
            Some(format!("# {register} is the 'for loop counter'")),
        );
        self.open_loops.push((label.to_string(), register));
        Ok(())
    }

    pub fn for_end(&mut self, label: &str) -> Result<()> {
        let (open_label, register) = self.open_loops.pop().ok_or_else(|| {
            Error::new(&format!("Internal error: end of loop '{label}' without start"))
        })?;
        if open_label != label {
            return Err(Error::new(&format!(
                "Internal error: end of loop '{label}' does not match open loop '{open_label}'"
            )));
        }
        self.comment("# FOR_END");
        self.generator.add_loop(
            register,
            label,
            Some(format!("# {register} is the 'for loop counter'")),
        );
        Ok(())
    }

    pub fn do_while_start(&mut self, label: &str) {
        self.comment("# DO_WHILE_START");
        self.generator.add_label(label, None::<&str>);
    }

    /// Close a do-while loop.
    ///
    /// The loop condition is not evaluated: the body repeats indefinitely.
    pub fn do_while_end(&mut self, label: &str, condition: Option<&BranchCondition>) {
        match condition {
            Some(condition) => self.comment(format!("# DO_WHILE_END({condition})")),
            None => self.comment("# DO_WHILE_END"),
        }
        self.generator.add_jump(label, Some("# endless loop"));
    }
}
