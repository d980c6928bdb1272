//! HuC6280 CPU emulation for huprobe
//!
//! The HuC6280 is a 65C02 derivative with an on-chip MMU: eight mapping
//! registers (MPR0-7) translate the 16-bit logical window into a 21-bit
//! physical space in 8 KiB banks.
//!
//! The interpreter runs against any [`CpuState`] and [`Bus`] pair, which lets
//! a debugger replay the next instruction on a copied state with an
//! instrumented bus. Debugger hooks are registered through [`HookInstaller`].

pub mod bus;
pub mod cpu;
pub mod hooks;
pub mod interpreter;
pub mod state;

pub use bus::{Access, AccessKind, Bus};
pub use cpu::HuC6280;
pub use hooks::{CpuObserver, HookInstaller, HookMask, HookSlot, NoObserver};
pub use interpreter::Interpreter;
pub use state::{CpuRegister, CpuState, IrqLines, Vector};
