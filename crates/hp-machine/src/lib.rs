//! PC Engine machine model for huprobe
//!
//! Provides the physical memory map behind the HuC6280's MMU: HuCard ROM in
//! banks 0x00-0x7F, 8 KiB of work RAM mirrored through banks 0xF8-0xFB, and
//! the VDC port window in the I/O bank. [`Machine`] implements
//! [`hp_cpu::Bus`].

pub mod constants;
pub mod machine;
pub mod vdc;

pub use machine::{Machine, MachineSnapshot};
pub use vdc::{Vdc, VdcStatus};
