// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use cc_log::{debug, info};

use crate::code_generator::CodeGenerator;
use crate::codeword_table::CodewordMap;
use crate::ir::{BranchCondition, Bundle, Gate, GateKind, Kernel, KernelKind, Section, Topology};
use crate::settings::CodeGeneratorSettings;
use crate::{Error, Result};

/// Places the gates of a kernel in time.
///
/// Bundles are translated in the order they are returned. Within a kernel,
/// the start cycles of consecutive bundles must not decrease on any slot.
pub trait Scheduler {
    fn schedule(&self, kernel: &Kernel, topology: &Topology) -> Result<Vec<Bundle>>;
}

#[derive(Debug, Clone)]
pub struct CompilationResult {
    /// Program text for the controller.
    pub code: String,
    /// Codeword assignment used by `code`.
    pub map: CodewordMap,
}

pub struct Backend<'a> {
    topology: &'a Topology,
    settings: CodeGeneratorSettings,
}

impl<'a> Backend<'a> {
    pub fn new(topology: &'a Topology, settings: CodeGeneratorSettings) -> Self {
        Self { topology, settings }
    }

    /// Compile the kernels of a program into controller code.
    ///
    /// # Arguments
    ///
    /// * `program_name`: Name written into the program header.
    /// * `kernels`: Kernels in program order.
    /// * `scheduler`: Provides the bundles of every kernel with gates.
    /// * `preloaded_map`: Codeword assignment to adhere to. Signals missing from it are errors.
    pub fn compile(
        &self,
        program_name: &str,
        kernels: &[Kernel],
        scheduler: &impl Scheduler,
        preloaded_map: Option<CodewordMap>,
    ) -> Result<CompilationResult> {
        if kernels.is_empty() {
            return Err(Error::configuration("Trying to compile empty kernel list"));
        }
        info!(
            "Compiling {} kernels to generate CC code for program '{}'",
            kernels.len(),
            program_name
        );
        let mut generator = CodeGenerator::new(self.topology, &self.settings, preloaded_map);
        generator.program_start(program_name);

        let mut bundle_index = 0;
        for kernel in kernels {
            info!("Compiling kernel: {}", kernel.name);
            generator.comment(format!("### Kernel: '{}'", kernel.name));
            kernel_prologue(&mut generator, kernel)?;
            if kernel.gates.is_empty() {
                debug!("Empty kernel: {}", kernel.name);
            } else {
                let bundles = scheduler.schedule(kernel, self.topology)?;
                generate_bundles(&mut generator, &bundles, &mut bundle_index)?;
            }
            kernel_epilogue(&mut generator, kernel)?;
        }
        generator.program_finish();

        Ok(CompilationResult {
            code: generator.code(),
            map: generator.codeword_map(),
        })
    }
}

fn branch_condition(kernel: &Kernel) -> Result<&BranchCondition> {
    kernel.condition.as_ref().ok_or_else(|| {
        Error::new(&format!(
            "Internal error: conditional kernel '{}' without branch condition",
            kernel.name
        ))
    })
}

fn kernel_prologue(generator: &mut CodeGenerator<'_>, kernel: &Kernel) -> Result<()> {
    match &kernel.kind {
        KernelKind::IfStart => generator.if_start(branch_condition(kernel)?),
        KernelKind::ElseStart => generator.else_start(branch_condition(kernel)?),
        KernelKind::ForStart { iterations } => generator.for_start(kernel.label(), *iterations),
        KernelKind::DoWhileStart => {
            generator.do_while_start(kernel.label());
            Ok(())
        }
        KernelKind::Static
        | KernelKind::ForEnd
        | KernelKind::DoWhileEnd
        | KernelKind::IfEnd
        | KernelKind::ElseEnd => Ok(()),
    }
}

fn kernel_epilogue(generator: &mut CodeGenerator<'_>, kernel: &Kernel) -> Result<()> {
    match &kernel.kind {
        KernelKind::ForEnd => generator.for_end(kernel.label()),
        KernelKind::DoWhileEnd => {
            generator.do_while_end(kernel.label(), kernel.condition.as_ref());
            Ok(())
        }
        KernelKind::Static
        | KernelKind::IfStart
        | KernelKind::IfEnd
        | KernelKind::ElseStart
        | KernelKind::ElseEnd
        | KernelKind::ForStart { .. }
        | KernelKind::DoWhileStart => Ok(()),
    }
}

fn generate_bundles(
    generator: &mut CodeGenerator<'_>,
    bundles: &[Bundle],
    bundle_index: &mut usize,
) -> Result<()> {
    info!("Generating CC code for {} bundles", bundles.len());
    generator.kernel_start();
    for (position, bundle) in bundles.iter().enumerate() {
        generator.bundle_start(format!(
            "## Bundle {}, start_cycle={}, duration_in_cycles={}:",
            bundle_index, bundle.start_cycle, bundle.duration_in_cycles
        ));
        *bundle_index += 1;
        for section in &bundle.sections {
            generate_section(generator, section)?;
        }
        let is_last_bundle = position + 1 == bundles.len();
        generator.bundle_finish(
            bundle.start_cycle,
            bundle.duration_in_cycles,
            is_last_bundle,
        )?;
    }
    generator.kernel_finish();
    Ok(())
}

fn generate_section(generator: &mut CodeGenerator<'_>, section: &Section) -> Result<()> {
    match section {
        Section::Classical(gate) => generator.classical_instruction(&gate.name, &gate.cregs),
        Section::Quantum(gates) => gates
            .iter()
            .try_for_each(|gate| generate_quantum_gate(generator, gate)),
    }
}

fn generate_quantum_gate(generator: &mut CodeGenerator<'_>, gate: &Gate) -> Result<()> {
    match gate.kind {
        GateKind::Custom => generator.custom_gate(
            &gate.name,
            &gate.qubits,
            &gate.cregs,
            gate.duration,
            gate.angle,
        ),
        GateKind::Nop => generator.nop_gate(),
        GateKind::Classical => Err(Error::new(&format!(
            "Inconsistency detected in bundle contents: classical gate '{}' in quantum section",
            gate.name
        ))),
        GateKind::Measure | GateKind::Display => Err(Error::Unimplemented(format!(
            "Gate type {:?} of gate '{}' not supported",
            gate.kind, gate.name
        ))),
    }
}
