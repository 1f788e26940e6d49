// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use cc_log::debug;

use crate::Cycles;
use crate::ir::Topology;

/// Startup delays that align the first action of all slots in physical time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyCompensation {
    max_latency: u64,
    slot_delays: BTreeMap<u32, Cycles>,
}

impl LatencyCompensation {
    /// Largest instrument latency in ns.
    pub fn max_latency(&self) -> u64 {
        self.max_latency
    }

    /// Startup delay of a slot, if the slot is in use.
    pub fn delay(&self, slot: u32) -> Option<Cycles> {
        self.slot_delays.get(&slot).cloned()
    }

    /// Slot delays in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Cycles)> + '_ {
        self.slot_delays.iter().map(|(slot, delay)| (*slot, *delay))
    }
}

/// Calculate per-slot startup delays from per-slot latencies.
///
/// Every slot waits `min_delay` plus the difference between the largest latency
/// and its own, converted to cycles. Slots reported more than once keep the last latency.
///
/// # Arguments
///
/// * `slot_latencies`: Pairs of controller slot and latency in ns.
/// * `cycle_time`: Duration of a controller cycle in ns.
/// * `min_delay`: Minimum delay of every slot in cycles.
pub fn calculate_slot_delays(
    slot_latencies: impl IntoIterator<Item = (u32, u64)>,
    cycle_time: u64,
    min_delay: Cycles,
) -> LatencyCompensation {
    let latencies: BTreeMap<u32, u64> = slot_latencies.into_iter().collect();
    let max_latency = latencies.values().cloned().max().unwrap_or(0);
    debug!("Maximum latency is {} ns", max_latency);
    let slot_delays = latencies
        .into_iter()
        .map(|(slot, latency)| {
            let delay = min_delay + (max_latency - latency).div_ceil(cycle_time);
            (slot, delay)
        })
        .collect();
    LatencyCompensation {
        max_latency,
        slot_delays,
    }
}

pub fn calculate_latency_compensation(
    topology: &Topology,
    min_delay: Cycles,
) -> LatencyCompensation {
    calculate_slot_delays(
        topology
            .instruments()
            .iter()
            .map(|instrument| (instrument.slot, instrument.latency)),
        topology.cycle_time(),
        min_delay,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HardwareConfig;
    use crate::config::tests::test_config_json;

    #[test]
    fn test_two_slot_example() {
        let compensation = calculate_slot_delays([(0, 20), (1, 5)], 1, 1);
        assert_eq!(compensation.max_latency(), 20);
        assert_eq!(compensation.delay(0), Some(1));
        assert_eq!(compensation.delay(1), Some(16));
        assert_eq!(compensation.delay(2), None);
    }

    #[test]
    fn test_latency_rounded_up_to_cycles() {
        let compensation = calculate_slot_delays([(4, 100), (2, 59), (7, 100)], 20, 1);
        assert_eq!(
            compensation.iter().collect::<Vec<_>>(),
            vec![(2, 4), (4, 1), (7, 1)]
        );
    }

    #[test]
    fn test_duplicate_slot_keeps_last_latency() {
        let compensation = calculate_slot_delays([(0, 10), (1, 30), (0, 30)], 10, 1);
        assert_eq!(compensation.delay(0), Some(1));
    }

    #[test]
    fn test_no_instruments() {
        let compensation = calculate_slot_delays([], 20, 1);
        assert_eq!(compensation.iter().count(), 0);
    }

    #[test]
    fn test_topology_compensation() {
        let config = HardwareConfig::from_value(test_config_json()).unwrap();
        let topology = Topology::from_config(&config).unwrap();
        let compensation = calculate_latency_compensation(&topology, 1);
        // mw0 (slot 0) has 400 ns, ro0 (slot 1) has 100 ns at 20 ns cycles.
        assert_eq!(compensation.delay(0), Some(1));
        assert_eq!(compensation.delay(1), Some(16));
    }
}
