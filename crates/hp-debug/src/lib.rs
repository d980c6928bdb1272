//! Debugging support for huprobe
//!
//! This crate provides:
//! - Breakpoints on PC, opcode, bus reads/writes and decoded VDC accesses
//! - Shadow execution of the next instruction to find what it will touch
//! - The per-instruction notification protocol driving the host callback
//! - A coalescing branch trace
//! - Address-space, register and BIOS-call glue for host debuggers

pub mod address_space;
pub mod bios;
pub mod branch_trace;
pub mod breakpoint;
pub mod debugger;
pub mod registers;
pub mod shadow;
pub mod target;

pub use address_space::AddressSpaceInfo;
pub use bios::{BiosCall, BiosCallLog, LogSink, SyscardCallNames};
pub use branch_trace::{BranchTrace, BranchTraceRecord};
pub use breakpoint::{AddressMode, BreakpointKind, BreakpointRange, BreakpointStore};
pub use debugger::{DebugContext, Debugger, HostCallback};
pub use registers::{CpuRegisterGroup, RegisterGroup, RegisterInfo};
pub use shadow::{AuxAccess, ProbeRecord, ShadowExecutor, VdcDecodeState, VdcProbe};
pub use target::DebugTarget;
