// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

pub mod circuit;
pub mod topology;

pub use circuit::{BranchCondition, Bundle, Gate, GateKind, Kernel, KernelKind, Section};
pub use topology::{
    ControlMode, InstructionDefinition, InstructionType, Instrument, SignalInfo, SignalTemplate,
    Topology,
};

pub type QubitIndex = usize;
pub type CregIndex = usize;
pub type GroupIndex = usize;
