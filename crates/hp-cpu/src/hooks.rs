//! Debugger hook registration
//!
//! The CPU does not own its debugger. It owns a [`HookSlot`] that says which
//! observer callbacks are installed, and the caller passes the observer into
//! [`crate::HuC6280::step`]. With nothing installed the step loop never
//! touches the observer.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::state::{CpuState, Vector};

bitflags! {
    /// Installed debugger hooks
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HookMask: u8 {
        /// Per-instruction hook, called before every instruction
        const INSTRUCTION = 0x01;
        /// Per-branch hook, called on every control transfer
        const BRANCH = 0x02;
    }
}

/// Receiver of hook installation requests
pub trait HookInstaller {
    fn install(&mut self, hooks: HookMask);
}

/// Shared installation cell polled by the CPU
#[derive(Debug, Clone, Default)]
pub struct HookSlot(Rc<Cell<HookMask>>);

impl HookSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently installed hooks
    #[inline]
    pub fn installed(&self) -> HookMask {
        self.0.get()
    }
}

impl HookInstaller for HookSlot {
    fn install(&mut self, hooks: HookMask) {
        self.0.set(hooks);
    }
}

/// Debugger-side callbacks invoked by the CPU
pub trait CpuObserver<B: ?Sized> {
    /// Called with the PC of the instruction about to execute.
    ///
    /// Returning `true` tells the CPU the machine state may have changed.
    fn on_instruction(&mut self, pc: u16, cpu: &mut CpuState, bus: &mut B) -> bool;

    /// Called on every control transfer; `vector` is set for interrupt entries.
    fn on_branch(&mut self, from: u16, to: u16, vector: Option<Vector>);
}

/// Observer for running without a debugger
#[derive(Debug, Default, Clone, Copy)]
pub struct NoObserver;

impl<B: ?Sized> CpuObserver<B> for NoObserver {
    fn on_instruction(&mut self, _pc: u16, _cpu: &mut CpuState, _bus: &mut B) -> bool {
        false
    }

    fn on_branch(&mut self, _from: u16, _to: u16, _vector: Option<Vector>) {}
}
