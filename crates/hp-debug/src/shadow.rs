//! Side-effect-free probing of the next instruction
//!
//! Before an instruction commits, the debugger replays it on a copy of the
//! CPU state against a [`ProbeBus`]. The probe bus answers reads from the
//! target's side-effect-free `peek` (overlaid with anything the probed
//! instruction itself wrote) and swallows every write, so neither the real
//! CPU nor any real peripheral can observe the probe.
//!
//! Port accesses that hit a VDC are also fed to a [`VdcProbe`], a decode-only
//! model of the chip's register interface. It reports which registers and
//! which VRAM words the access would touch.

use hp_cpu::{Access, Bus, CpuState, Interpreter};
use hp_machine::vdc::{increment_for, regs, REGISTER_COUNT};

use crate::breakpoint::{BreakpointKind, BreakpointStore};
use crate::target::DebugTarget;

/// Highest number of VDCs on any supported system
pub const MAX_VDCS: usize = 2;

/// Aux-space bit marking a register index rather than a VRAM address
pub const AUX_REGISTER_SPACE: u32 = 0x2_0000;

/// Aux address of a VRAM word
#[inline]
pub fn aux_vram(chip: usize, addr: u16) -> u32 {
    ((chip as u32) << 16) | addr as u32
}

/// Aux address of a VDC register
#[inline]
pub fn aux_register(chip: usize, index: u8) -> u32 {
    AUX_REGISTER_SPACE | ((chip as u32) << 16) | index as u32
}

/// VDC register-interface state a probe starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VdcDecodeState {
    pub select: u8,
    pub registers: [u16; REGISTER_COUNT],
}

impl Default for VdcDecodeState {
    fn default() -> Self {
        Self { select: 0, registers: [0; REGISTER_COUNT] }
    }
}

/// A range in the aux address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuxAccess {
    pub address: u32,
    pub len: u32,
}

/// Everything one probed instruction would touch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeRecord {
    pub reads: Vec<Access>,
    pub writes: Vec<Access>,
    pub aux_reads: Vec<AuxAccess>,
    pub aux_writes: Vec<AuxAccess>,
}

impl ProbeRecord {
    fn clear(&mut self) {
        self.reads.clear();
        self.writes.clear();
        self.aux_reads.clear();
        self.aux_writes.clear();
    }

    fn aux_read(&mut self, address: u32, len: u32) {
        self.aux_reads.push(AuxAccess { address, len });
    }

    fn aux_write(&mut self, address: u32, len: u32) {
        self.aux_writes.push(AuxAccess { address, len });
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty() && self.writes.is_empty() && self.aux_reads.is_empty() && self.aux_writes.is_empty()
    }

    /// Test every recorded access against the store
    pub fn matches(&self, store: &BreakpointStore) -> bool {
        self.reads.iter().any(|a| store.match_access(BreakpointKind::Read, a))
            || self.writes.iter().any(|a| store.match_access(BreakpointKind::Write, a))
            || self
                .aux_reads
                .iter()
                .any(|a| store.match_range(BreakpointKind::AuxRead, a.address, a.len))
            || self
                .aux_writes
                .iter()
                .any(|a| store.match_range(BreakpointKind::AuxWrite, a.address, a.len))
    }
}

/// Decode-only model of one VDC's register interface
#[derive(Debug, Clone, Default)]
pub struct VdcProbe {
    state: VdcDecodeState,
}

impl VdcProbe {
    /// Resynchronise from the real chip
    pub fn reset(&mut self, state: VdcDecodeState) {
        self.state = state;
    }

    fn reg(&self, index: u8) -> u16 {
        self.state.registers[index as usize]
    }

    fn reg_mut(&mut self, index: u8) -> &mut u16 {
        &mut self.state.registers[index as usize]
    }

    fn increment(&self) -> u16 {
        increment_for(self.reg(regs::CR))
    }

    /// Record what a port read would touch
    pub fn read(&mut self, chip: usize, port: u8, record: &mut ProbeRecord) {
        let select = self.state.select;
        match port & 3 {
            2 => record.aux_read(aux_register(chip, select), 1),
            3 => {
                record.aux_read(aux_register(chip, select), 1);
                if select == regs::VWR {
                    let marr = self.reg(regs::MARR);
                    record.aux_read(aux_vram(chip, marr), 1);
                    *self.reg_mut(regs::MARR) = marr.wrapping_add(self.increment());
                }
            }
            _ => {}
        }
    }

    /// Record what a port write would touch
    pub fn write(&mut self, chip: usize, port: u8, value: u8, record: &mut ProbeRecord) {
        let select = self.state.select;
        match port & 3 {
            0 => self.state.select = value & 0x1F,
            2 => {
                let reg = self.reg_mut(select);
                *reg = (*reg & 0xFF00) | value as u16;
                record.aux_write(aux_register(chip, select), 1);
            }
            3 => {
                let reg = self.reg_mut(select);
                *reg = (*reg & 0x00FF) | ((value as u16) << 8);
                record.aux_write(aux_register(chip, select), 1);
                self.commit(chip, select, record);
            }
            _ => {}
        }
    }

    fn commit(&mut self, chip: usize, select: u8, record: &mut ProbeRecord) {
        match select {
            regs::VWR => {
                let mawr = self.reg(regs::MAWR);
                record.aux_write(aux_vram(chip, mawr), 1);
                *self.reg_mut(regs::MAWR) = mawr.wrapping_add(self.increment());
            }
            regs::MARR => {
                record.aux_read(aux_vram(chip, self.reg(regs::MARR)), 1);
            }
            regs::LENR => {
                let words = self.reg(regs::LENR) as u32 + 1;
                record.aux_read(aux_vram(chip, self.reg(regs::SOUR)), words);
                record.aux_write(aux_vram(chip, self.reg(regs::DESR)), words);
            }
            _ => {}
        }
    }
}

/// Instrumented bus the probed instruction runs against
pub struct ProbeBus<'a, T: ?Sized> {
    target: &'a T,
    overlay: &'a mut Vec<(u32, u8)>,
    vdcs: &'a mut [VdcProbe],
    record: &'a mut ProbeRecord,
}

impl<T: DebugTarget + ?Sized> ProbeBus<'_, T> {
    fn overlaid(&self, physical: u32) -> Option<u8> {
        self.overlay.iter().rev().find(|(addr, _)| *addr == physical).map(|(_, value)| *value)
    }
}

impl<T: DebugTarget + ?Sized> Bus for ProbeBus<'_, T> {
    fn read(&mut self, access: Access) -> u8 {
        self.record.reads.push(access);
        if let Some((chip, port)) = self.target.vdc_port(access.physical) {
            if let Some(probe) = self.vdcs.get_mut(chip) {
                probe.read(chip, port, self.record);
            }
        }
        self.peek(access.physical)
    }

    fn write(&mut self, access: Access, value: u8) {
        self.record.writes.push(access);
        if let Some((chip, port)) = self.target.vdc_port(access.physical) {
            if let Some(probe) = self.vdcs.get_mut(chip) {
                probe.write(chip, port, value, self.record);
            }
        }
        self.overlay.push((access.physical, value));
    }

    fn peek(&self, physical: u32) -> u8 {
        self.overlaid(physical).unwrap_or_else(|| self.target.peek(physical))
    }

    fn poke(&mut self, physical: u32, value: u8) {
        self.overlay.push((physical, value));
    }
}

/// Replays the next instruction on a private copy of the CPU state
#[derive(Debug, Default)]
pub struct ShadowExecutor {
    probe: CpuState,
    vdcs: Vec<VdcProbe>,
    overlay: Vec<(u32, u8)>,
    record: ProbeRecord,
}

impl ShadowExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe the instruction at `cpu.pc` and return what it would touch.
    ///
    /// Only the executor's own buffers change; `cpu` and `target` are read.
    pub fn probe<T: DebugTarget + ?Sized>(&mut self, cpu: &CpuState, target: &T) -> &ProbeRecord {
        self.probe.clone_from(cpu);

        self.vdcs.clear();
        for chip in 0..MAX_VDCS {
            match target.vdc_decode_state(chip) {
                Some(state) => {
                    let mut probe = VdcProbe::default();
                    probe.reset(state);
                    self.vdcs.push(probe);
                }
                None => break,
            }
        }

        self.overlay.clear();
        self.record.clear();

        let mut bus = ProbeBus {
            target,
            overlay: &mut self.overlay,
            vdcs: &mut self.vdcs,
            record: &mut self.record,
        };
        Interpreter::dry_run(&mut self.probe, &mut bus);

        &self.record
    }

    /// Accesses recorded by the most recent probe
    pub fn last_record(&self) -> &ProbeRecord {
        &self.record
    }

    /// CPU state after the most recent probe
    pub fn probe_state(&self) -> &CpuState {
        &self.probe
    }
}
