// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Per-slot cycle accounting.
//!
//! Every slot executes its own instruction stream, so each one keeps a ledger
//! of the cycle up to which its stream has been emitted. Idle time is filled
//! with zero output words to keep the slots mutually aligned.

use crate::cc_generator::CcGenerator;
use crate::ir::Instrument;
use crate::{Cycles, DigitalWord, Error, Result};

#[derive(Debug, Clone)]
pub struct SlotTracker {
    ledger: Vec<Cycles>,
}

impl SlotTracker {
    /// Tracker for `num_slots` slots, indexed like [`crate::ir::Topology::instruments`].
    pub fn new(num_slots: usize) -> Self {
        Self {
            ledger: vec![0; num_slots],
        }
    }

    /// Restart the time base of all slots at cycle 0.
    pub fn reset(&mut self) {
        self.ledger.iter_mut().for_each(|cycle| *cycle = 0);
    }

    pub fn current_cycle(&self, index: usize) -> Cycles {
        self.ledger[index]
    }

    /// Check that the slot can still act at `target` without emitting anything.
    pub fn check_reachable(
        &self,
        index: usize,
        instrument: &Instrument,
        target: Cycles,
    ) -> Result<()> {
        let current = self.ledger[index];
        if target < current {
            return Err(Error::TimeTravel {
                instrument: instrument.name.clone(),
                slot: instrument.slot,
                ledger: current,
                target,
            });
        }
        Ok(())
    }

    /// Emit zero output on the slot from its ledger up to `target`.
    ///
    /// Emits nothing if the slot is already at `target`. A `target` before
    /// the ledger cannot be honoured and is an error.
    pub fn pad_to_cycle(
        &mut self,
        generator: &mut CcGenerator,
        index: usize,
        instrument: &Instrument,
        target: Cycles,
    ) -> Result<()> {
        self.check_reachable(index, instrument, target)?;
        let current = self.ledger[index];
        if target > current {
            generator.add_seq_out(
                instrument.slot,
                0,
                target - current,
                Some(format!(
                    "# cycle {current}-{target}: padding on '{}'",
                    instrument.name
                )),
            );
            self.ledger[index] = target;
        }
        Ok(())
    }

    /// Emit `word` on the slot for `duration` cycles starting at `start`,
    /// padding any idle time before.
    pub fn add_output(
        &mut self,
        generator: &mut CcGenerator,
        index: usize,
        instrument: &Instrument,
        start: Cycles,
        word: DigitalWord,
        duration: Cycles,
    ) -> Result<()> {
        self.pad_to_cycle(generator, index, instrument, start)?;
        let end = start + duration;
        generator.add_seq_out(
            instrument.slot,
            word,
            duration,
            Some(format!(
                "# cycle {start}-{end}: code word/mask on '{}'",
                instrument.name
            )),
        );
        self.ledger[index] = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cc_statements::CcStatement;
    use crate::ir::ControlMode;
    use std::sync::Arc;

    fn instrument(slot: u32) -> Instrument {
        Instrument {
            name: format!("instr{slot}"),
            slot,
            signal_type: "mw".to_string(),
            control_mode: Arc::new(ControlMode {
                name: "mode".to_string(),
                control_bits: vec![vec![0]],
                trigger_bits: vec![],
                result_bits: None,
            }),
            qubits: vec![vec![0]],
            latency: 0,
        }
    }

    #[test]
    fn test_padding_emits_single_zero_word() {
        let mut generator = CcGenerator::new(true);
        let mut tracker = SlotTracker::new(1);
        let instrument = instrument(2);
        tracker.pad_to_cycle(&mut generator, 0, &instrument, 0).unwrap();
        assert_eq!(generator.num_statements(), 0);
        tracker.pad_to_cycle(&mut generator, 0, &instrument, 7).unwrap();
        assert_eq!(
            generator.statements(),
            &vec![CcStatement::SeqOut {
                slot: 2,
                word: 0,
                duration: 7,
                comment: Some("# cycle 0-7: padding on 'instr2'".to_string()),
            }]
        );
        assert_eq!(tracker.current_cycle(0), 7);
    }

    #[test]
    fn test_output_advances_ledger() {
        let mut generator = CcGenerator::new(true);
        let mut tracker = SlotTracker::new(2);
        let instrument = instrument(0);
        tracker
            .add_output(&mut generator, 1, &instrument, 10, 0x14, 20)
            .unwrap();
        assert_eq!(tracker.current_cycle(0), 0);
        assert_eq!(tracker.current_cycle(1), 30);
        assert_eq!(generator.num_statements(), 2);
        tracker
            .add_output(&mut generator, 1, &instrument, 30, 0x1, 1)
            .unwrap();
        assert_eq!(generator.num_statements(), 3);
    }

    #[test]
    fn test_time_travel_is_rejected() {
        let mut generator = CcGenerator::new(true);
        let mut tracker = SlotTracker::new(1);
        let instrument = instrument(0);
        tracker
            .add_output(&mut generator, 0, &instrument, 0, 0x1, 10)
            .unwrap();
        let statements_before = generator.num_statements();
        let err = tracker
            .add_output(&mut generator, 0, &instrument, 5, 0x1, 10)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::TimeTravel {
                ledger: 10,
                target: 5,
                ..
            }
        ));
        assert_eq!(generator.num_statements(), statements_before);
        assert_eq!(tracker.current_cycle(0), 10);
    }

    #[test]
    fn test_check_reachable() {
        let mut generator = CcGenerator::new(true);
        let mut tracker = SlotTracker::new(1);
        let instrument = instrument(3);
        tracker
            .pad_to_cycle(&mut generator, 0, &instrument, 4)
            .unwrap();
        assert!(tracker.check_reachable(0, &instrument, 4).is_ok());
        assert!(tracker.check_reachable(0, &instrument, 9).is_ok());
        assert!(matches!(
            tracker.check_reachable(0, &instrument, 3),
            Err(Error::TimeTravel { slot: 3, ledger: 4, target: 3, .. })
        ));
        assert_eq!(generator.num_statements(), 1);
    }

    #[test]
    fn test_reset() {
        let mut generator = CcGenerator::new(true);
        let mut tracker = SlotTracker::new(1);
        tracker
            .pad_to_cycle(&mut generator, 0, &instrument(0), 12)
            .unwrap();
        tracker.reset();
        assert_eq!(tracker.current_cycle(0), 0);
    }
}
