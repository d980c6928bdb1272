//! HuC6280 core with debugger hook dispatch

use crate::bus::Bus;
use crate::hooks::{CpuObserver, HookMask, HookSlot};
use crate::interpreter::Interpreter;
use crate::state::{CpuState, IrqLines};

/// The committed CPU: register state plus hook registration
#[derive(Debug, Default)]
pub struct HuC6280 {
    /// Register state mutated only by genuinely executed instructions
    pub state: CpuState,
    hooks: HookSlot,
    /// Instructions committed since power-on
    instructions: u64,
}

impl HuC6280 {
    /// Create a new CPU with no hooks installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a debugger can install hooks through
    pub fn hook_slot(&self) -> HookSlot {
        self.hooks.clone()
    }

    /// Hooks currently installed
    pub fn installed_hooks(&self) -> HookMask {
        self.hooks.installed()
    }

    /// Number of committed instructions
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Reset the CPU and jump through the reset vector
    pub fn reset<B, O>(&mut self, bus: &mut B, observer: &mut O)
    where
        B: Bus + ?Sized,
        O: CpuObserver<B> + ?Sized,
    {
        if self.hooks.installed().contains(HookMask::BRANCH) {
            Interpreter::reset(&mut self.state, bus, |from, to, vector| observer.on_branch(from, to, vector));
        } else {
            Interpreter::reset(&mut self.state, bus, |_, _, _| {});
        }
        hp_core::cpu_debug!("Reset, PC=0x{:04x}", self.state.pc);
    }

    /// Execute a single instruction, calling the installed hooks.
    ///
    /// A pending interrupt is entered first, so the instruction hook always
    /// sees the instruction that actually runs at this boundary: the first
    /// instruction of the handler when an interrupt is taken.
    pub fn step<B, O>(&mut self, bus: &mut B, observer: &mut O) -> u32
    where
        B: Bus + ?Sized,
        O: CpuObserver<B> + ?Sized,
    {
        let hooks = self.hooks.installed();
        let tracing = hooks.contains(HookMask::BRANCH);

        let entry = if tracing {
            Interpreter::enter_interrupt(&mut self.state, bus, |from, to, vector| observer.on_branch(from, to, vector))
        } else {
            Interpreter::enter_interrupt(&mut self.state, bus, |_, _, _| {})
        };
        if entry.is_some() {
            hp_core::cpu_trace!("Interrupt entry to 0x{:04x}", self.state.pc);
        }

        if hooks.contains(HookMask::INSTRUCTION) {
            let pc = self.state.pc;
            if observer.on_instruction(pc, &mut self.state, bus) {
                // The interpreter decodes from `state.pc` on every step, so a
                // debugger-modified state needs no further invalidation.
                hp_core::cpu_trace!("Machine state changed by debugger at 0x{:04x}", pc);
            }
        }

        let cycles = if tracing {
            Interpreter::execute(&mut self.state, bus, |from, to, vector| observer.on_branch(from, to, vector))
        } else {
            Interpreter::execute(&mut self.state, bus, |_, _, _| {})
        };

        self.instructions += 1;
        entry.unwrap_or(0) + cycles
    }

    /// Execute `count` instructions, returning the total cycle count
    pub fn run<B, O>(&mut self, bus: &mut B, observer: &mut O, count: usize) -> u64
    where
        B: Bus + ?Sized,
        O: CpuObserver<B> + ?Sized,
    {
        (0..count).map(|_| self.step(bus, observer) as u64).sum()
    }

    /// Assert interrupt lines
    pub fn raise_irq(&mut self, lines: IrqLines) {
        self.state.irq_pending |= lines;
    }

    /// Release interrupt lines
    pub fn lower_irq(&mut self, lines: IrqLines) {
        self.state.irq_pending &= !lines;
    }
}
