//! HuC6280 architectural state

use bitflags::bitflags;

/// Master clock frequency in Hz
pub const MASTER_CLOCK: u64 = 21_477_272;

/// Logical base of the zero page
pub const ZERO_PAGE: u16 = 0x2000;
/// Logical base of the stack page
pub const STACK_PAGE: u16 = 0x2100;

/// Status flag bits
pub mod flags {
    pub const C: u8 = 0x01;
    pub const Z: u8 = 0x02;
    pub const I: u8 = 0x04;
    pub const D: u8 = 0x08;
    pub const B: u8 = 0x10;
    pub const T: u8 = 0x20;
    pub const V: u8 = 0x40;
    pub const N: u8 = 0x80;
}

bitflags! {
    /// Interrupt request lines; bit layout matches the IRQ mask register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IrqLines: u8 {
        const IRQ2 = 0x01;
        const IRQ1 = 0x02;
        const TIMER = 0x04;
    }
}

/// Fixed interrupt and reset entry points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vector {
    Reset,
    Nmi,
    Timer,
    Irq1,
    /// Shared by IRQ2 and BRK
    Irq2,
}

impl Vector {
    /// Logical address of the vector
    pub const fn address(self) -> u16 {
        match self {
            Self::Reset => 0xFFFE,
            Self::Nmi => 0xFFFC,
            Self::Timer => 0xFFFA,
            Self::Irq1 => 0xFFF8,
            Self::Irq2 => 0xFFF6,
        }
    }
}

/// Register identifiers for debugger access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuRegister {
    Pc,
    A,
    X,
    Y,
    Sp,
    P,
    Mpr(u8),
    /// CPU speed: 1 = fast (7.16 MHz), 0 = slow
    Spd,
    Irqm,
    /// Master-clock timestamp
    Stamp,
    /// Whole seconds of emulated time
    Seconds,
}

/// Complete architectural state of the HuC6280
///
/// Plain value type: the debugger copies it to probe the next instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Stack pointer (offset within the stack page)
    pub s: u8,
    /// Processor status
    pub p: u8,
    pub pc: u16,
    /// Memory mapping registers
    pub mpr: [u8; 8],
    /// High-speed mode (CSH)
    pub fast: bool,
    /// Disabled interrupt lines
    pub irq_mask: IrqLines,
    /// Asserted interrupt lines
    pub irq_pending: IrqLines,
    /// Master-clock timestamp
    pub timestamp: u64,
    /// Logical address of the most recent data read
    pub last_logical_read: u16,
    /// Logical address of the most recent data write
    pub last_logical_write: u16,
}

impl Default for CpuState {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFF,
            p: flags::I,
            pc: 0,
            mpr: [0xFF, 0xF8, 0, 0, 0, 0, 0, 0],
            fast: false,
            irq_mask: IrqLines::empty(),
            irq_pending: IrqLines::empty(),
            timestamp: 0,
            last_logical_read: 0,
            last_logical_write: 0,
        }
    }
}

impl CpuState {
    /// Translate a logical address through the MPRs
    #[inline]
    pub fn physical(&self, logical: u16) -> u32 {
        ((self.mpr[(logical >> 13) as usize] as u32) << 13) | (logical as u32 & 0x1FFF)
    }

    /// Logical address of the current stack slot
    #[inline]
    pub fn stack_address(&self) -> u16 {
        STACK_PAGE | self.s as u16
    }

    /// Check a status flag
    #[inline]
    pub fn flag(&self, flag: u8) -> bool {
        self.p & flag != 0
    }

    /// Set or clear a status flag
    #[inline]
    pub fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.p |= flag;
        } else {
            self.p &= !flag;
        }
    }

    /// Update N and Z from a result byte
    #[inline]
    pub fn set_nz(&mut self, value: u8) {
        self.set_flag(flags::Z, value == 0);
        self.set_flag(flags::N, value & 0x80 != 0);
    }

    /// Interrupt line that will be taken at the next boundary, highest priority first
    pub fn next_interrupt(&self) -> Option<Vector> {
        if self.flag(flags::I) {
            return None;
        }
        let live = self.irq_pending & !self.irq_mask;
        if live.contains(IrqLines::IRQ2) {
            Some(Vector::Irq2)
        } else if live.contains(IrqLines::IRQ1) {
            Some(Vector::Irq1)
        } else if live.contains(IrqLines::TIMER) {
            Some(Vector::Timer)
        } else {
            None
        }
    }

    /// Read a register by id
    pub fn register(&self, reg: CpuRegister) -> u32 {
        match reg {
            CpuRegister::Pc => self.pc as u32,
            CpuRegister::A => self.a as u32,
            CpuRegister::X => self.x as u32,
            CpuRegister::Y => self.y as u32,
            CpuRegister::Sp => self.s as u32,
            CpuRegister::P => self.p as u32,
            CpuRegister::Mpr(n) => self.mpr[(n & 7) as usize] as u32,
            CpuRegister::Spd => self.fast as u32,
            CpuRegister::Irqm => self.irq_mask.bits() as u32,
            CpuRegister::Stamp => self.timestamp as u32,
            CpuRegister::Seconds => (self.timestamp / MASTER_CLOCK) as u32,
        }
    }

    /// Write a register by id; read-only clock registers ignore writes
    pub fn set_register(&mut self, reg: CpuRegister, value: u32) {
        match reg {
            CpuRegister::Pc => self.pc = value as u16,
            CpuRegister::A => self.a = value as u8,
            CpuRegister::X => self.x = value as u8,
            CpuRegister::Y => self.y = value as u8,
            CpuRegister::Sp => self.s = value as u8,
            CpuRegister::P => self.p = value as u8,
            CpuRegister::Mpr(n) => self.mpr[(n & 7) as usize] = value as u8,
            CpuRegister::Spd => self.fast = value & 1 != 0,
            CpuRegister::Irqm => self.irq_mask = IrqLines::from_bits_truncate(value as u8),
            CpuRegister::Stamp | CpuRegister::Seconds => {}
        }
    }
}
