//! HuC6270 video display controller (register and VRAM subset)
//!
//! The VDC is reached through four byte ports: port 0 selects a register (and
//! reads status), ports 2 and 3 carry the low and high byte of the selected
//! register. Writing the high byte commits the register, which is where the
//! VRAM write, the read-buffer reload and the VRAM-to-VRAM DMA happen.
//!
//! Genuine port reads are not idempotent: reading status clears the latched
//! flags and reading the VRR high byte advances MARR. [`Vdc::peek_port`] gives
//! the same data without touching any of that.

use bitflags::bitflags;

use crate::constants::VRAM_WORDS;

/// Register indices
pub mod regs {
    /// Memory address write register
    pub const MAWR: u8 = 0x00;
    /// Memory address read register
    pub const MARR: u8 = 0x01;
    /// VRAM data write / read register
    pub const VWR: u8 = 0x02;
    /// Control register
    pub const CR: u8 = 0x05;
    /// Raster counter register
    pub const RCR: u8 = 0x06;
    /// DMA control register
    pub const DCR: u8 = 0x0F;
    /// DMA source
    pub const SOUR: u8 = 0x10;
    /// DMA destination
    pub const DESR: u8 = 0x11;
    /// DMA length (words minus one); writing the high byte starts the DMA
    pub const LENR: u8 = 0x12;
    /// Sprite attribute table base
    pub const SATB: u8 = 0x13;
}

/// Number of addressable registers
pub const REGISTER_COUNT: usize = 0x20;

/// CR bit enabling the vertical blank interrupt
const CR_VBLANK_IRQ: u16 = 0x0008;

bitflags! {
    /// Latched status flags, cleared by a genuine status read
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VdcStatus: u8 {
        /// Sprite collision
        const CR  = 0x01;
        /// Sprite overflow
        const OR  = 0x02;
        /// Raster counter match
        const RR  = 0x04;
        /// SAT DMA finished
        const DS  = 0x08;
        /// VRAM DMA finished
        const DV  = 0x10;
        /// Vertical blank
        const VD  = 0x20;
        /// Busy
        const BSY = 0x40;
    }
}

/// VRAM address increment selected by CR bits 11-12
pub fn increment_for(cr: u16) -> u16 {
    match (cr >> 11) & 3 {
        0 => 1,
        1 => 32,
        2 => 64,
        _ => 128,
    }
}

/// One HuC6270
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vdc {
    vram: Vec<u16>,
    regs: [u16; REGISTER_COUNT],
    select: u8,
    /// Word prefetched from VRAM at MARR
    read_buffer: u16,
    status: VdcStatus,
}

impl Default for Vdc {
    fn default() -> Self {
        Self::new()
    }
}

impl Vdc {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_WORDS],
            regs: [0; REGISTER_COUNT],
            select: 0,
            read_buffer: 0,
            status: VdcStatus::empty(),
        }
    }

    /// Currently selected register
    pub fn select(&self) -> u8 {
        self.select
    }

    /// Raw register contents (for VWR this is the pending write word)
    pub fn register(&self, index: u8) -> u16 {
        self.regs[index as usize % REGISTER_COUNT]
    }

    /// Set a register without committing it
    pub fn set_register(&mut self, index: u8, value: u16) {
        self.regs[index as usize % REGISTER_COUNT] = value;
    }

    /// VRAM address increment currently programmed in CR
    pub fn increment(&self) -> u16 {
        increment_for(self.regs[regs::CR as usize])
    }

    pub fn status(&self) -> VdcStatus {
        self.status
    }

    /// Latch status flags
    pub fn latch(&mut self, flags: VdcStatus) {
        self.status |= flags;
    }

    /// Whether the VDC is asserting its interrupt line
    pub fn irq_asserted(&self) -> bool {
        self.status.contains(VdcStatus::VD) && self.regs[regs::CR as usize] & CR_VBLANK_IRQ != 0
    }

    pub fn vram_word(&self, addr: u16) -> u16 {
        self.vram[addr as usize % VRAM_WORDS]
    }

    pub fn set_vram_word(&mut self, addr: u16, value: u16) {
        self.vram[addr as usize % VRAM_WORDS] = value;
    }

    /// Genuine port read
    pub fn read_port(&mut self, port: u8) -> u8 {
        let value = self.peek_port(port);
        match port & 3 {
            0 => self.status = VdcStatus::empty(),
            3 if self.select == regs::VWR => {
                let marr = self.regs[regs::MARR as usize].wrapping_add(self.increment());
                self.regs[regs::MARR as usize] = marr;
                self.read_buffer = self.vram_word(marr);
            }
            _ => {}
        }
        value
    }

    /// Side-effect-free port read
    pub fn peek_port(&self, port: u8) -> u8 {
        match port & 3 {
            0 => self.status.bits(),
            2 if self.select == regs::VWR => self.read_buffer as u8,
            3 if self.select == regs::VWR => (self.read_buffer >> 8) as u8,
            _ => 0,
        }
    }

    /// Genuine port write
    pub fn write_port(&mut self, port: u8, value: u8) {
        match port & 3 {
            0 => self.select = value & 0x1F,
            2 => {
                let reg = &mut self.regs[self.select as usize];
                *reg = (*reg & 0xFF00) | value as u16;
            }
            3 => {
                let reg = &mut self.regs[self.select as usize];
                *reg = (*reg & 0x00FF) | ((value as u16) << 8);
                self.commit(self.select);
            }
            _ => {}
        }
    }

    fn commit(&mut self, index: u8) {
        match index {
            regs::MARR => {
                self.read_buffer = self.vram_word(self.regs[regs::MARR as usize]);
            }
            regs::VWR => {
                let mawr = self.regs[regs::MAWR as usize];
                self.set_vram_word(mawr, self.regs[regs::VWR as usize]);
                self.regs[regs::MAWR as usize] = mawr.wrapping_add(self.increment());
            }
            regs::LENR => self.run_dma(),
            _ => {}
        }
    }

    /// VRAM-to-VRAM DMA of LENR + 1 words
    fn run_dma(&mut self) {
        let mut source = self.regs[regs::SOUR as usize];
        let mut dest = self.regs[regs::DESR as usize];
        let words = self.regs[regs::LENR as usize] as u32 + 1;

        tracing::trace!(target: "vdc", "DMA 0x{:04x} -> 0x{:04x}, {} words", source, dest, words);

        for _ in 0..words {
            let word = self.vram_word(source);
            self.set_vram_word(dest, word);
            source = source.wrapping_add(1);
            dest = dest.wrapping_add(1);
        }

        self.regs[regs::SOUR as usize] = source;
        self.regs[regs::DESR as usize] = dest;
        self.regs[regs::LENR as usize] = 0xFFFF;
        self.status |= VdcStatus::DV;
    }
}
