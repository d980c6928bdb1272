//! What the debugger needs from the emulated machine

use hp_cpu::Bus;
use hp_machine::constants::VRAM_WORDS;
use hp_machine::vdc::REGISTER_COUNT;
use hp_machine::Machine;

use crate::address_space::AddressSpaceInfo;
use crate::shadow::VdcDecodeState;

/// Machine-side collaborator of the debugger.
///
/// Everything beyond [`Bus`] has a default so a bare bus can be debugged.
pub trait DebugTarget: Bus {
    /// Decode a physical address into (chip, port) if it hits a VDC
    fn vdc_port(&self, _physical: u32) -> Option<(usize, u8)> {
        None
    }

    /// Register-interface state of VDC `chip`, or `None` past the last chip
    fn vdc_decode_state(&self, _chip: usize) -> Option<VdcDecodeState> {
        None
    }

    /// An armed HSYNC breakpoint fired
    fn hsync_breakpoint(&self) -> bool {
        false
    }

    /// An armed VSYNC breakpoint fired
    fn vsync_breakpoint(&self) -> bool {
        false
    }

    /// Bring peripherals up to the CPU timestamp before the host looks at them
    fn catch_up(&mut self, _timestamp: u64) {}

    /// Machine-specific address spaces
    fn spaces(&self) -> Vec<AddressSpaceInfo> {
        Vec::new()
    }

    /// Read one unit of a machine-specific space
    fn peek_unit(&self, _space: &str, _index: u32) -> Option<u16> {
        None
    }

    /// Write one unit of a machine-specific space; `false` if not writable
    fn poke_unit(&mut self, _space: &str, _index: u32, _value: u16) -> bool {
        false
    }
}

/// Names of the per-chip VRAM spaces
const VRAM_SPACES: [&str; 2] = ["vram", "vram2"];

fn vram_chip(space: &str) -> Option<usize> {
    VRAM_SPACES.iter().position(|name| *name == space)
}

impl DebugTarget for Machine {
    fn vdc_port(&self, physical: u32) -> Option<(usize, u8)> {
        Machine::vdc_port(self, physical)
    }

    fn vdc_decode_state(&self, chip: usize) -> Option<VdcDecodeState> {
        let vdc = self.vdc(chip)?;
        let mut registers = [0u16; REGISTER_COUNT];
        for (index, value) in registers.iter_mut().enumerate() {
            *value = vdc.register(index as u8);
        }
        Some(VdcDecodeState { select: vdc.select(), registers })
    }

    fn hsync_breakpoint(&self) -> bool {
        self.hsync_hit()
    }

    fn vsync_breakpoint(&self) -> bool {
        self.vsync_hit()
    }

    fn catch_up(&mut self, timestamp: u64) {
        self.sync(timestamp);
    }

    fn spaces(&self) -> Vec<AddressSpaceInfo> {
        let mut spaces = vec![
            AddressSpaceInfo::bytes("ram", "Work RAM", self.ram().len() as u32),
            AddressSpaceInfo::bytes("rom", "HuCard ROM", self.rom().len() as u32),
        ];
        for name in VRAM_SPACES.into_iter().take(self.vdc_count()) {
            spaces.push(AddressSpaceInfo::words(name, "VDC VRAM", VRAM_WORDS as u32));
        }
        spaces
    }

    fn peek_unit(&self, space: &str, index: u32) -> Option<u16> {
        match space {
            "ram" => self.ram().get(index as usize).map(|b| *b as u16),
            "rom" => self.rom().get(index as usize).map(|b| *b as u16),
            _ => {
                let vdc = self.vdc(vram_chip(space)?)?;
                Some(vdc.vram_word(index as u16))
            }
        }
    }

    fn poke_unit(&mut self, space: &str, index: u32, value: u16) -> bool {
        match space {
            "ram" => match self.ram_mut().get_mut(index as usize) {
                Some(byte) => {
                    *byte = value as u8;
                    true
                }
                None => false,
            },
            "rom" if (index as usize) < self.rom().len() => {
                self.poke(index, value as u8);
                true
            }
            _ => match vram_chip(space).and_then(|chip| self.vdc_mut(chip)) {
                Some(vdc) => {
                    vdc.set_vram_word(index as u16, value);
                    true
                }
                None => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_core::config::SystemConfig;

    fn machine(supergrafx: bool) -> Machine {
        let system = SystemConfig { supergrafx, ..Default::default() };
        Machine::new(&[0u8; 0x2000], &system).unwrap()
    }

    #[test]
    fn test_spaces_follow_vdc_count() {
        let names: Vec<_> = machine(false).spaces().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ram", "rom", "vram"]);

        let names: Vec<_> = machine(true).spaces().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["ram", "rom", "vram", "vram2"]);
    }

    #[test]
    fn test_unit_access() {
        let mut m = machine(false);
        assert!(m.poke_unit("vram", 0x10, 0xABCD));
        assert_eq!(m.peek_unit("vram", 0x10), Some(0xABCD));
        assert!(!m.poke_unit("vram2", 0x10, 0));
        assert_eq!(m.peek_unit("vram2", 0x10), None);

        assert!(m.poke_unit("rom", 0x1FFF, 0x42));
        assert_eq!(m.peek_unit("rom", 0x1FFF), Some(0x42));
        assert!(!m.poke_unit("rom", 0x2000, 0x42));
    }

    #[test]
    fn test_decode_state_mirrors_chip() {
        let mut m = machine(false);
        m.vdc_mut(0).unwrap().write_port(0, 0x01);
        m.vdc_mut(0).unwrap().set_register(0x01, 0x0777);

        let state = m.vdc_decode_state(0).unwrap();
        assert_eq!(state.select, 0x01);
        assert_eq!(state.registers[0x01], 0x0777);
        assert!(m.vdc_decode_state(1).is_none());
    }
}
