// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use crate::Cycles;
use crate::ir::{CregIndex, QubitIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Gate whose signals are defined by the platform instruction set.
    Custom,
    /// Quantum no-operation.
    Nop,
    /// Classical operation on the controller registers.
    Classical,
    /// Built-in measurement without CC specific signal definition.
    Measure,
    /// Simulator display directive.
    Display,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub kind: GateKind,
    pub name: String,
    pub qubits: Vec<QubitIndex>,
    pub cregs: Vec<CregIndex>,
    /// Duration in ns.
    pub duration: u64,
    pub angle: f64,
}

impl Gate {
    pub fn custom<S: Into<String>>(name: S, qubits: Vec<QubitIndex>, duration: u64) -> Self {
        Gate {
            kind: GateKind::Custom,
            name: name.into(),
            qubits,
            cregs: vec![],
            duration,
            angle: 0.0,
        }
    }

    pub fn readout<S: Into<String>>(
        name: S,
        qubit: QubitIndex,
        creg: CregIndex,
        duration: u64,
    ) -> Self {
        Gate {
            kind: GateKind::Custom,
            name: name.into(),
            qubits: vec![qubit],
            cregs: vec![creg],
            duration,
            angle: 0.0,
        }
    }

    pub fn classical<S: Into<String>>(name: S, cregs: Vec<CregIndex>) -> Self {
        Gate {
            kind: GateKind::Classical,
            name: name.into(),
            qubits: vec![],
            cregs,
            duration: 0,
            angle: 0.0,
        }
    }
}

/// Part of a bundle: either a single classical operation, or quantum gates
/// that execute in parallel.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Classical(Gate),
    Quantum(Vec<Gate>),
}

/// Gates scheduled to start at the same cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub start_cycle: Cycles,
    pub duration_in_cycles: Cycles,
    pub sections: Vec<Section>,
}

impl Bundle {
    pub fn new(start_cycle: Cycles, duration_in_cycles: Cycles, sections: Vec<Section>) -> Self {
        Bundle {
            start_cycle,
            duration_in_cycles,
            sections,
        }
    }
}

/// Comparison of two classical registers guarding a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCondition {
    pub op0: CregIndex,
    pub operation: String,
    pub op1: CregIndex,
}

impl std::fmt::Display for BranchCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{} {} R{}", self.op0, self.operation, self.op1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelKind {
    Static,
    IfStart,
    IfEnd,
    ElseStart,
    ElseEnd,
    ForStart { iterations: u64 },
    ForEnd,
    DoWhileStart,
    DoWhileEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    pub name: String,
    pub kind: KernelKind,
    pub condition: Option<BranchCondition>,
    pub gates: Vec<Gate>,
}

impl Kernel {
    pub fn new<S: Into<String>>(name: S, kind: KernelKind, gates: Vec<Gate>) -> Self {
        Kernel {
            name: name.into(),
            kind,
            condition: None,
            gates,
        }
    }

    pub fn with_condition(mut self, condition: BranchCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Label shared by the structural kernels of one construct.
    ///
    /// Kernel names of a construct share the leading token, e.g. `sp1_for1_start`
    /// and `sp1_for1_end` both map to `sp1`.
    pub fn label(&self) -> &str {
        self.name
            .split('_')
            .find(|token| !token.is_empty())
            .unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_label() {
        let kernel = Kernel::new("sp1_for1_start", KernelKind::ForStart { iterations: 3 }, vec![]);
        assert_eq!(kernel.label(), "sp1");
        let kernel = Kernel::new("_rus_do_while", KernelKind::DoWhileStart, vec![]);
        assert_eq!(kernel.label(), "rus");
        let kernel = Kernel::new("plain", KernelKind::Static, vec![]);
        assert_eq!(kernel.label(), "plain");
    }

    #[test]
    fn test_branch_condition_display() {
        let condition = BranchCondition {
            op0: 1,
            operation: "==".to_string(),
            op1: 2,
        };
        assert_eq!(condition.to_string(), "R1 == R2");
    }
}
