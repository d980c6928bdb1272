//! Register groups for host display

use hp_core::{Error, Result};
use hp_cpu::{CpuRegister, CpuState};

/// One register of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub id: u32,
    pub name: &'static str,
    pub description: &'static str,
    /// Width in bits
    pub bits: u8,
}

/// A hardware block whose registers the host can list, read and write
pub trait RegisterGroup {
    fn name(&self) -> &'static str;

    fn registers(&self) -> &'static [RegisterInfo];

    fn get(&self, id: u32) -> Result<u32>;

    fn set(&mut self, id: u32, value: u32) -> Result<()>;
}

const fn reg(id: u32, name: &'static str, description: &'static str, bits: u8) -> RegisterInfo {
    RegisterInfo { id, name, description, bits }
}

/// Register ids of the CPU group
pub mod cpu_ids {
    pub const PC: u32 = 0;
    pub const A: u32 = 1;
    pub const X: u32 = 2;
    pub const Y: u32 = 3;
    pub const SP: u32 = 4;
    pub const P: u32 = 5;
    /// MPR0; MPR1-7 follow
    pub const MPR0: u32 = 6;
    pub const SPD: u32 = 14;
    pub const IRQM: u32 = 15;
    pub const STAMP: u32 = 16;
    pub const SECONDS: u32 = 17;
}

static CPU_REGISTERS: [RegisterInfo; 18] = [
    reg(cpu_ids::PC, "PC", "Program Counter", 16),
    reg(cpu_ids::A, "A", "Accumulator", 8),
    reg(cpu_ids::X, "X", "X Index", 8),
    reg(cpu_ids::Y, "Y", "Y Index", 8),
    reg(cpu_ids::SP, "SP", "Stack Pointer", 8),
    reg(cpu_ids::P, "P", "Status", 8),
    reg(cpu_ids::MPR0, "MPR0", "MPR0", 8),
    reg(cpu_ids::MPR0 + 1, "MPR1", "MPR1", 8),
    reg(cpu_ids::MPR0 + 2, "MPR2", "MPR2", 8),
    reg(cpu_ids::MPR0 + 3, "MPR3", "MPR3", 8),
    reg(cpu_ids::MPR0 + 4, "MPR4", "MPR4", 8),
    reg(cpu_ids::MPR0 + 5, "MPR5", "MPR5", 8),
    reg(cpu_ids::MPR0 + 6, "MPR6", "MPR6", 8),
    reg(cpu_ids::MPR0 + 7, "MPR7", "MPR7", 8),
    reg(cpu_ids::SPD, "SPD", "CPU Speed", 1),
    reg(cpu_ids::IRQM, "IRQM", "IRQ Mask", 3),
    reg(cpu_ids::STAMP, "Stamp", "Master-clock timestamp", 32),
    reg(cpu_ids::SECONDS, "Seconds", "Emulated time in seconds", 32),
];

/// Map a CPU group id onto the CPU's register enum
pub fn cpu_register(id: u32) -> Option<CpuRegister> {
    Some(match id {
        cpu_ids::PC => CpuRegister::Pc,
        cpu_ids::A => CpuRegister::A,
        cpu_ids::X => CpuRegister::X,
        cpu_ids::Y => CpuRegister::Y,
        cpu_ids::SP => CpuRegister::Sp,
        cpu_ids::P => CpuRegister::P,
        6..=13 => CpuRegister::Mpr((id - cpu_ids::MPR0) as u8),
        cpu_ids::SPD => CpuRegister::Spd,
        cpu_ids::IRQM => CpuRegister::Irqm,
        cpu_ids::STAMP => CpuRegister::Stamp,
        cpu_ids::SECONDS => CpuRegister::Seconds,
        _ => return None,
    })
}

/// HuC6280 registers
pub struct CpuRegisterGroup<'a> {
    cpu: &'a mut CpuState,
    /// Raised by `set`
    changed: Option<&'a mut bool>,
}

impl<'a> CpuRegisterGroup<'a> {
    pub fn new(cpu: &'a mut CpuState) -> Self {
        Self { cpu, changed: None }
    }

    /// A group that raises `changed` on every successful `set`
    pub fn tracked(cpu: &'a mut CpuState, changed: &'a mut bool) -> Self {
        Self { cpu, changed: Some(changed) }
    }

    fn lookup(id: u32) -> Result<CpuRegister> {
        cpu_register(id).ok_or(Error::UnknownRegister { group: "cpu", id })
    }
}

impl RegisterGroup for CpuRegisterGroup<'_> {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn registers(&self) -> &'static [RegisterInfo] {
        &CPU_REGISTERS
    }

    fn get(&self, id: u32) -> Result<u32> {
        Ok(self.cpu.register(Self::lookup(id)?))
    }

    fn set(&mut self, id: u32, value: u32) -> Result<()> {
        self.cpu.set_register(Self::lookup(id)?, value);
        if let Some(changed) = self.changed.as_deref_mut() {
            *changed = true;
        }
        Ok(())
    }
}
