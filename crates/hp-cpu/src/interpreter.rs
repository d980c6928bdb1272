//! HuC6280 interpreter
//!
//! Executes against any state/bus pair so the same code drives committed
//! execution and debugger probing. Control transfers are reported through the
//! `on_branch` callback; the caller decides whether anybody is listening.

use crate::bus::{Access, Bus};
use crate::state::{flags, CpuState, IrqLines, Vector, STACK_PAGE, ZERO_PAGE};

/// Physical targets of ST0, ST1 and ST2
pub const ST0_PORT: u32 = 0x1FE000;
pub const ST1_PORT: u32 = 0x1FE002;
pub const ST2_PORT: u32 = 0x1FE003;

/// Master clocks per CPU cycle in high-speed mode
const FAST_CLOCKS: u64 = 3;
/// Master clocks per CPU cycle in low-speed mode
const SLOW_CLOCKS: u64 = 12;

/// Cycles taken by an interrupt entry
const INTERRUPT_CYCLES: u32 = 8;

/// HuC6280 interpreter for instruction execution
pub struct Interpreter;

struct Exec<'a, B: ?Sized, F> {
    s: &'a mut CpuState,
    bus: &'a mut B,
    on_branch: F,
    /// Address of the instruction being executed
    op_pc: u16,
    /// False for debugger dry runs
    committed: bool,
}

impl Interpreter {
    /// Take the highest-priority pending interrupt, if one is unmasked.
    ///
    /// Returns the cycles spent on the entry, or `None` when no interrupt was
    /// taken.
    pub fn enter_interrupt<B, F>(state: &mut CpuState, bus: &mut B, on_branch: F) -> Option<u32>
    where
        B: Bus + ?Sized,
        F: FnMut(u16, u16, Option<Vector>),
    {
        let vector = state.next_interrupt()?;
        let op_pc = state.pc;
        let mut exec = Exec { s: state, bus, on_branch, op_pc, committed: true };
        let cycles = exec.interrupt(vector);
        exec.account(cycles);
        Some(cycles)
    }

    /// Execute the instruction at `state.pc`. Returns the cycle count.
    pub fn execute<B, F>(state: &mut CpuState, bus: &mut B, on_branch: F) -> u32
    where
        B: Bus + ?Sized,
        F: FnMut(u16, u16, Option<Vector>),
    {
        let op_pc = state.pc;
        let mut exec = Exec { s: state, bus, on_branch, op_pc, committed: true };
        let cycles = exec.instruction();
        exec.account(cycles);
        cycles
    }

    /// Execute the instruction at `state.pc` for a debugger dry run.
    ///
    /// Same as [`Interpreter::execute`] minus branch reporting and diagnostics.
    pub fn dry_run<B>(state: &mut CpuState, bus: &mut B) -> u32
    where
        B: Bus + ?Sized,
    {
        let op_pc = state.pc;
        let mut exec = Exec { s: state, bus, on_branch: |_: u16, _: u16, _: Option<Vector>| {}, op_pc, committed: false };
        let cycles = exec.instruction();
        exec.account(cycles);
        cycles
    }

    /// Power-on/reset sequence: map bank 0 at the top of the logical window
    /// and load PC from the reset vector.
    pub fn reset<B, F>(state: &mut CpuState, bus: &mut B, on_branch: F)
    where
        B: Bus + ?Sized,
        F: FnMut(u16, u16, Option<Vector>),
    {
        let from = state.pc;
        state.mpr[7] = 0x00;
        state.p = flags::I;
        state.fast = false;
        state.irq_pending = Default::default();

        let mut exec = Exec { s: state, bus, on_branch, op_pc: from, committed: true };
        let target = exec.read_vector(Vector::Reset);
        exec.jump(target, Some(Vector::Reset));
    }
}

impl<B, F> Exec<'_, B, F>
where
    B: Bus + ?Sized,
    F: FnMut(u16, u16, Option<Vector>),
{
    /// Advance the timestamp by `cycles` at the current speed
    fn account(&mut self, cycles: u32) {
        let clocks = if self.s.fast { FAST_CLOCKS } else { SLOW_CLOCKS };
        self.s.timestamp += cycles as u64 * clocks;
    }

    #[inline]
    fn fetch(&mut self) -> u8 {
        let pc = self.s.pc;
        self.s.pc = pc.wrapping_add(1);
        self.bus.read(Access::fetch(self.s.physical(pc), pc))
    }

    #[inline]
    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch() as u16;
        let hi = self.fetch() as u16;
        lo | (hi << 8)
    }

    #[inline]
    fn read(&mut self, logical: u16) -> u8 {
        self.s.last_logical_read = logical;
        self.bus.read(Access::data(self.s.physical(logical), logical))
    }

    #[inline]
    fn write(&mut self, logical: u16, value: u8) {
        self.s.last_logical_write = logical;
        self.bus.write(Access::data(self.s.physical(logical), logical), value);
    }

    fn read_vector(&mut self, vector: Vector) -> u16 {
        let addr = vector.address();
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    fn push(&mut self, value: u8) {
        let addr = self.s.stack_address();
        self.write(addr, value);
        self.s.s = self.s.s.wrapping_sub(1);
    }

    fn pull(&mut self) -> u8 {
        self.s.s = self.s.s.wrapping_add(1);
        let addr = STACK_PAGE | self.s.s as u16;
        self.read(addr)
    }

    fn jump(&mut self, target: u16, vector: Option<Vector>) {
        self.s.pc = target;
        (self.on_branch)(self.op_pc, target, vector);
    }

    // Addressing modes, each returning a logical address

    fn zp(&mut self) -> u16 {
        ZERO_PAGE | self.fetch() as u16
    }

    fn zp_x(&mut self) -> u16 {
        ZERO_PAGE | self.fetch().wrapping_add(self.s.x) as u16
    }

    fn abs(&mut self) -> u16 {
        self.fetch_word()
    }

    fn abs_x(&mut self) -> u16 {
        self.fetch_word().wrapping_add(self.s.x as u16)
    }

    fn abs_y(&mut self) -> u16 {
        self.fetch_word().wrapping_add(self.s.y as u16)
    }

    fn zp_pointer(&mut self, zp: u8) -> u16 {
        let lo = self.read(ZERO_PAGE | zp as u16) as u16;
        let hi = self.read(ZERO_PAGE | zp.wrapping_add(1) as u16) as u16;
        lo | (hi << 8)
    }

    /// (zp)
    fn ind(&mut self) -> u16 {
        let zp = self.fetch();
        self.zp_pointer(zp)
    }

    /// (zp),Y
    fn ind_y(&mut self) -> u16 {
        let zp = self.fetch();
        self.zp_pointer(zp).wrapping_add(self.s.y as u16)
    }

    // ALU

    fn adc(&mut self, value: u8) {
        let a = self.s.a;
        let sum = a as u16 + value as u16 + self.s.flag(flags::C) as u16;
        let result = sum as u8;
        self.s.set_flag(flags::V, (!(a ^ value) & (a ^ result) & 0x80) != 0);
        self.s.set_flag(flags::C, sum > 0xFF);
        self.s.a = result;
        self.s.set_nz(result);
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.s.set_flag(flags::C, register >= value);
        self.s.set_nz(register.wrapping_sub(value));
    }

    fn branch(&mut self, condition: bool) -> u32 {
        let offset = self.fetch() as i8;
        if condition {
            let target = self.s.pc.wrapping_add(offset as u16);
            self.jump(target, None);
            4
        } else {
            2
        }
    }

    fn modify(&mut self, addr: u16, delta: i8) {
        let value = self.read(addr).wrapping_add(delta as u8);
        self.write(addr, value);
        self.s.set_nz(value);
    }

    fn interrupt(&mut self, vector: Vector) -> u32 {
        let pc = self.s.pc;
        self.push((pc >> 8) as u8);
        self.push(pc as u8);
        let p = self.s.p & !flags::B;
        self.push(p);
        self.s.p = (self.s.p | flags::I) & !(flags::D | flags::T);
        match vector {
            Vector::Irq2 => self.s.irq_pending.remove(IrqLines::IRQ2),
            Vector::Irq1 => self.s.irq_pending.remove(IrqLines::IRQ1),
            Vector::Timer => self.s.irq_pending.remove(IrqLines::TIMER),
            Vector::Reset | Vector::Nmi => {}
        }
        let target = self.read_vector(vector);
        self.jump(target, Some(vector));
        INTERRUPT_CYCLES
    }

    /// Decode table, one opcode per line
    #[rustfmt::skip]
    fn instruction(&mut self) -> u32 {
        let opcode = self.fetch();
        self.s.p &= !flags::T;

        match opcode {
            // LDA
            0xA9 => { self.s.a = self.fetch(); self.s.set_nz(self.s.a); 2 }
            0xA5 => { let a = self.zp(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 4 }
            0xB5 => { let a = self.zp_x(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 4 }
            0xAD => { let a = self.abs(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 5 }
            0xBD => { let a = self.abs_x(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 5 }
            0xB9 => { let a = self.abs_y(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 5 }
            0xB2 => { let a = self.ind(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 7 }
            0xB1 => { let a = self.ind_y(); self.s.a = self.read(a); self.s.set_nz(self.s.a); 7 }
            // LDX / LDY
            0xA2 => { self.s.x = self.fetch(); self.s.set_nz(self.s.x); 2 }
            0xA6 => { let a = self.zp(); self.s.x = self.read(a); self.s.set_nz(self.s.x); 4 }
            0xAE => { let a = self.abs(); self.s.x = self.read(a); self.s.set_nz(self.s.x); 5 }
            0xA0 => { self.s.y = self.fetch(); self.s.set_nz(self.s.y); 2 }
            0xA4 => { let a = self.zp(); self.s.y = self.read(a); self.s.set_nz(self.s.y); 4 }
            0xAC => { let a = self.abs(); self.s.y = self.read(a); self.s.set_nz(self.s.y); 5 }
            // STA
            0x85 => { let a = self.zp(); self.write(a, self.s.a); 4 }
            0x95 => { let a = self.zp_x(); self.write(a, self.s.a); 4 }
            0x8D => { let a = self.abs(); self.write(a, self.s.a); 5 }
            0x9D => { let a = self.abs_x(); self.write(a, self.s.a); 5 }
            0x99 => { let a = self.abs_y(); self.write(a, self.s.a); 5 }
            0x92 => { let a = self.ind(); self.write(a, self.s.a); 7 }
            0x91 => { let a = self.ind_y(); self.write(a, self.s.a); 7 }
            // STX / STY / STZ
            0x86 => { let a = self.zp(); self.write(a, self.s.x); 4 }
            0x8E => { let a = self.abs(); self.write(a, self.s.x); 5 }
            0x84 => { let a = self.zp(); self.write(a, self.s.y); 4 }
            0x8C => { let a = self.abs(); self.write(a, self.s.y); 5 }
            0x64 => { let a = self.zp(); self.write(a, 0); 4 }
            0x9C => { let a = self.abs(); self.write(a, 0); 5 }
            // INC / DEC
            0xE6 => { let a = self.zp(); self.modify(a, 1); 6 }
            0xEE => { let a = self.abs(); self.modify(a, 1); 7 }
            0xC6 => { let a = self.zp(); self.modify(a, -1); 6 }
            0xCE => { let a = self.abs(); self.modify(a, -1); 7 }
            0x1A => { self.s.a = self.s.a.wrapping_add(1); self.s.set_nz(self.s.a); 2 }
            0x3A => { self.s.a = self.s.a.wrapping_sub(1); self.s.set_nz(self.s.a); 2 }
            0xE8 => { self.s.x = self.s.x.wrapping_add(1); self.s.set_nz(self.s.x); 2 }
            0xC8 => { self.s.y = self.s.y.wrapping_add(1); self.s.set_nz(self.s.y); 2 }
            0xCA => { self.s.x = self.s.x.wrapping_sub(1); self.s.set_nz(self.s.x); 2 }
            0x88 => { self.s.y = self.s.y.wrapping_sub(1); self.s.set_nz(self.s.y); 2 }
            // Transfers
            0xAA => { self.s.x = self.s.a; self.s.set_nz(self.s.x); 2 }
            0x8A => { self.s.a = self.s.x; self.s.set_nz(self.s.a); 2 }
            0xA8 => { self.s.y = self.s.a; self.s.set_nz(self.s.y); 2 }
            0x98 => { self.s.a = self.s.y; self.s.set_nz(self.s.a); 2 }
            0xBA => { self.s.x = self.s.s; self.s.set_nz(self.s.x); 2 }
            0x9A => { self.s.s = self.s.x; 2 }
            // Arithmetic and logic
            0x69 => { let v = self.fetch(); self.adc(v); 2 }
            0x65 => { let a = self.zp(); let v = self.read(a); self.adc(v); 4 }
            0x6D => { let a = self.abs(); let v = self.read(a); self.adc(v); 5 }
            0xE9 => { let v = self.fetch(); self.adc(!v); 2 }
            0x29 => { let v = self.fetch(); self.s.a &= v; self.s.set_nz(self.s.a); 2 }
            0x09 => { let v = self.fetch(); self.s.a |= v; self.s.set_nz(self.s.a); 2 }
            0x49 => { let v = self.fetch(); self.s.a ^= v; self.s.set_nz(self.s.a); 2 }
            0xC9 => { let v = self.fetch(); self.compare(self.s.a, v); 2 }
            0xC5 => { let a = self.zp(); let v = self.read(a); self.compare(self.s.a, v); 4 }
            0xCD => { let a = self.abs(); let v = self.read(a); self.compare(self.s.a, v); 5 }
            0xE0 => { let v = self.fetch(); self.compare(self.s.x, v); 2 }
            0xC0 => { let v = self.fetch(); self.compare(self.s.y, v); 2 }
            // Branches
            0x10 => self.branch(!self.s.flag(flags::N)),
            0x30 => self.branch(self.s.flag(flags::N)),
            0x50 => self.branch(!self.s.flag(flags::V)),
            0x70 => self.branch(self.s.flag(flags::V)),
            0x90 => self.branch(!self.s.flag(flags::C)),
            0xB0 => self.branch(self.s.flag(flags::C)),
            0xD0 => self.branch(!self.s.flag(flags::Z)),
            0xF0 => self.branch(self.s.flag(flags::Z)),
            0x80 => self.branch(true),
            // Jumps and subroutines
            0x4C => { let t = self.fetch_word(); self.jump(t, None); 4 }
            0x6C => {
                let ptr = self.fetch_word();
                let lo = self.read(ptr) as u16;
                let hi = self.read(ptr.wrapping_add(1)) as u16;
                self.jump(lo | (hi << 8), None);
                7
            }
            0x20 => {
                let target = self.fetch_word();
                let ret = self.s.pc.wrapping_sub(1);
                self.push((ret >> 8) as u8);
                self.push(ret as u8);
                self.jump(target, None);
                7
            }
            0x60 => {
                let lo = self.pull() as u16;
                let hi = self.pull() as u16;
                self.jump((lo | (hi << 8)).wrapping_add(1), None);
                7
            }
            0x40 => {
                self.s.p = self.pull();
                let lo = self.pull() as u16;
                let hi = self.pull() as u16;
                self.jump(lo | (hi << 8), None);
                7
            }
            0x00 => {
                let ret = self.s.pc.wrapping_add(1);
                self.push((ret >> 8) as u8);
                self.push(ret as u8);
                let p = self.s.p | flags::B;
                self.push(p);
                self.s.p = (self.s.p | flags::I) & !flags::D;
                let target = self.read_vector(Vector::Irq2);
                self.jump(target, Some(Vector::Irq2));
                8
            }
            // Stack
            0x48 => { self.push(self.s.a); 3 }
            0xDA => { self.push(self.s.x); 3 }
            0x5A => { self.push(self.s.y); 3 }
            0x08 => { self.push(self.s.p | flags::B); 3 }
            0x68 => { self.s.a = self.pull(); self.s.set_nz(self.s.a); 4 }
            0xFA => { self.s.x = self.pull(); self.s.set_nz(self.s.x); 4 }
            0x7A => { self.s.y = self.pull(); self.s.set_nz(self.s.y); 4 }
            0x28 => { self.s.p = self.pull(); 4 }
            // Flags
            0x18 => { self.s.set_flag(flags::C, false); 2 }
            0x38 => { self.s.set_flag(flags::C, true); 2 }
            0x58 => { self.s.set_flag(flags::I, false); 2 }
            0x78 => { self.s.set_flag(flags::I, true); 2 }
            0xD8 => { self.s.set_flag(flags::D, false); 2 }
            0xF8 => { self.s.set_flag(flags::D, true); 2 }
            0xB8 => { self.s.set_flag(flags::V, false); 2 }
            0xEA => 2,
            // HuC6280 specific
            0x53 => {
                let select = self.fetch();
                for bank in 0..8 {
                    if select & (1 << bank) != 0 {
                        self.s.mpr[bank] = self.s.a;
                    }
                }
                5
            }
            0x43 => {
                let select = self.fetch();
                if select != 0 {
                    self.s.a = self.s.mpr[select.trailing_zeros() as usize];
                }
                4
            }
            0x03 => { let v = self.fetch(); self.bus.write(Access::hardwired(ST0_PORT), v); 5 }
            0x13 => { let v = self.fetch(); self.bus.write(Access::hardwired(ST1_PORT), v); 5 }
            0x23 => { let v = self.fetch(); self.bus.write(Access::hardwired(ST2_PORT), v); 5 }
            0x54 => { self.s.fast = false; 3 }
            0xD4 => { self.s.fast = true; 3 }
            _ => {
                if self.committed {
                    tracing::warn!(target: "cpu", "Unimplemented opcode 0x{:02x} at 0x{:04x}", opcode, self.op_pc);
                }
                2
            }
        }
    }
}
