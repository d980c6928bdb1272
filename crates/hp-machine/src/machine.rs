//! The PC Engine system bus

use std::path::Path;

use hp_core::config::SystemConfig;
use hp_core::{DebugDepth, Error, Result};
use hp_cpu::{Access, Bus, IrqLines};

use crate::constants::*;
use crate::vdc::{Vdc, VdcStatus};

/// Scanline position and sync-breakpoint bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VideoTiming {
    /// Master-clock timestamp the current line started at
    line_start: u64,
    scanline: u32,
    hsync_armed: bool,
    vsync_armed: bool,
    hsync_hit: bool,
    vsync_hit: bool,
}

/// Debugger-visible state, for before/after comparisons
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub ram: Vec<u8>,
    pub rom: Vec<u8>,
    pub vdcs: Vec<Vdc>,
    pub scanline: u32,
    pub line_start: u64,
}

/// HuCard system: ROM, work RAM and one or two VDCs
pub struct Machine {
    rom: Vec<u8>,
    ram: Vec<u8>,
    vdcs: Vec<Vdc>,
    timing: VideoTiming,
    depth: DebugDepth,
    cd_system: bool,
}

impl Machine {
    /// Build a machine around a HuCard image
    pub fn new(image: &[u8], system: &SystemConfig) -> Result<Self> {
        let image = if image.len() % BANK_SIZE as usize == ROM_HEADER_SIZE {
            &image[ROM_HEADER_SIZE..]
        } else {
            image
        };

        if image.is_empty() {
            return Err(Error::InvalidRom("empty image".to_string()));
        }
        if image.len() > ROM_MAX_SIZE {
            return Err(Error::InvalidRom(format!(
                "image is {} bytes, maximum is {}",
                image.len(),
                ROM_MAX_SIZE
            )));
        }

        let mut rom = image.to_vec();
        let banks = rom.len().div_ceil(BANK_SIZE as usize);
        rom.resize(banks * BANK_SIZE as usize, 0xFF);

        let chips = if system.supergrafx { 2 } else { 1 };

        tracing::info!(
            "Loaded HuCard: {} banks, {} VDC(s), CD system {}",
            banks,
            chips,
            system.cd_system
        );

        Ok(Self {
            rom,
            ram: vec![0; RAM_SIZE],
            vdcs: vec![Vdc::new(); chips],
            timing: VideoTiming::default(),
            depth: DebugDepth::new(),
            cd_system: system.cd_system,
        })
    }

    /// Load a HuCard image from disk
    pub fn load(path: impl AsRef<Path>, system: &SystemConfig) -> Result<Self> {
        let image = std::fs::read(path.as_ref())?;
        Self::new(&image, system)
    }

    /// Nesting counter shared with the debugger
    pub fn depth(&self) -> DebugDepth {
        self.depth.clone()
    }

    pub fn cd_system(&self) -> bool {
        self.cd_system
    }

    pub fn supergrafx(&self) -> bool {
        self.vdcs.len() > 1
    }

    pub fn vdc_count(&self) -> usize {
        self.vdcs.len()
    }

    pub fn vdc(&self, chip: usize) -> Option<&Vdc> {
        self.vdcs.get(chip)
    }

    pub fn vdc_mut(&mut self, chip: usize) -> Option<&mut Vdc> {
        self.vdcs.get_mut(chip)
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn scanline(&self) -> u32 {
        self.timing.scanline
    }

    /// Decode a physical address into (chip, port) if it hits a VDC
    pub fn vdc_port(&self, physical: u32) -> Option<(usize, u8)> {
        if !(VDC_BASE..VDC_BASE + VDC_SIZE).contains(&physical) {
            return None;
        }
        let chip = if self.supergrafx() && physical & 0x18 == 0x10 { 1 } else { 0 };
        Some((chip, (physical & 3) as u8))
    }

    /// Arm the HSYNC/VSYNC breakpoint predicates
    pub fn set_sync_breakpoints(&mut self, hsync: bool, vsync: bool) {
        self.timing.hsync_armed = hsync;
        self.timing.vsync_armed = vsync;
    }

    /// An armed HSYNC occurred during the last [`Machine::sync`]
    pub fn hsync_hit(&self) -> bool {
        self.timing.hsync_hit
    }

    /// An armed VSYNC occurred during the last [`Machine::sync`]
    pub fn vsync_hit(&self) -> bool {
        self.timing.vsync_hit
    }

    /// Advance video timing to `timestamp`
    pub fn sync(&mut self, timestamp: u64) {
        self.timing.hsync_hit = false;
        self.timing.vsync_hit = false;

        while timestamp >= self.timing.line_start + LINE_CLOCKS {
            self.timing.line_start += LINE_CLOCKS;
            self.timing.scanline = (self.timing.scanline + 1) % LINES_PER_FRAME;
            self.timing.hsync_hit |= self.timing.hsync_armed;

            if self.timing.scanline == VBLANK_LINE {
                self.timing.vsync_hit |= self.timing.vsync_armed;
                for vdc in &mut self.vdcs {
                    vdc.latch(VdcStatus::VD);
                }
            }
        }
    }

    /// Interrupt lines the peripherals are asserting
    pub fn irq_lines(&self) -> IrqLines {
        if self.vdcs.iter().any(Vdc::irq_asserted) {
            IrqLines::IRQ1
        } else {
            IrqLines::empty()
        }
    }

    /// Copy of every piece of state a debugger could disturb
    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            ram: self.ram.clone(),
            rom: self.rom.clone(),
            vdcs: self.vdcs.clone(),
            scanline: self.timing.scanline,
            line_start: self.timing.line_start,
        }
    }

    #[inline]
    fn rom_offset(&self, physical: u32) -> usize {
        physical as usize % self.rom.len()
    }

    #[inline]
    fn ram_offset(physical: u32) -> usize {
        (physical as usize) & (RAM_SIZE - 1)
    }
}

impl Bus for Machine {
    fn read(&mut self, access: Access) -> u8 {
        let physical = access.physical;
        match (physical >> 13) as u8 {
            IO_BANK => match self.vdc_port(physical) {
                // Debugger-initiated cycles must not disturb the VDC
                Some((chip, port)) if self.depth.active() => self.vdcs[chip].peek_port(port),
                Some((chip, port)) => self.vdcs[chip].read_port(port),
                None => 0xFF,
            },
            _ => self.peek(physical),
        }
    }

    fn write(&mut self, access: Access, value: u8) {
        let physical = access.physical;
        match (physical >> 13) as u8 {
            0..=ROM_LAST_BANK => {
                tracing::trace!(target: "memory", "Write to ROM 0x{:06x} ignored", physical);
            }
            RAM_FIRST_BANK..=RAM_LAST_BANK => {
                self.ram[Self::ram_offset(physical)] = value;
            }
            IO_BANK => {
                if let Some((chip, port)) = self.vdc_port(physical) {
                    self.vdcs[chip].write_port(port, value);
                }
            }
            _ => {}
        }
    }

    fn peek(&self, physical: u32) -> u8 {
        match (physical >> 13) as u8 {
            0..=ROM_LAST_BANK => self.rom[self.rom_offset(physical)],
            RAM_FIRST_BANK..=RAM_LAST_BANK => self.ram[Self::ram_offset(physical)],
            IO_BANK => match self.vdc_port(physical) {
                Some((chip, port)) => self.vdcs[chip].peek_port(port),
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    fn poke(&mut self, physical: u32, value: u8) {
        match (physical >> 13) as u8 {
            0..=ROM_LAST_BANK => {
                let offset = self.rom_offset(physical);
                self.rom[offset] = value;
            }
            RAM_FIRST_BANK..=RAM_LAST_BANK => {
                self.ram[Self::ram_offset(physical)] = value;
            }
            _ => {}
        }
    }
}
