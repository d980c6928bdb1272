//! Named address spaces for host inspection
//!
//! `cpu` (16-bit logical, through the MPRs) and `physical` (21-bit) are always
//! present; the target adds its own. Spaces with 2-byte units are exposed to
//! the host as little-endian byte streams.

use hp_core::{Error, Result};
use hp_cpu::bus::PHYS_ADDR_MASK;
use hp_cpu::CpuState;

use crate::target::DebugTarget;

/// Description of one address space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpaceInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Bytes per addressable unit (1 or 2)
    pub unit_bytes: u8,
    /// Number of units
    pub units: u32,
}

impl AddressSpaceInfo {
    pub const fn bytes(name: &'static str, description: &'static str, units: u32) -> Self {
        Self { name, description, unit_bytes: 1, units }
    }

    pub const fn words(name: &'static str, description: &'static str, units: u32) -> Self {
        Self { name, description, unit_bytes: 2, units }
    }

    /// Size of the space in bytes
    pub fn byte_len(&self) -> u64 {
        self.units as u64 * self.unit_bytes as u64
    }
}

pub const CPU_SPACE: AddressSpaceInfo = AddressSpaceInfo::bytes("cpu", "CPU logical", 0x1_0000);
pub const PHYSICAL_SPACE: AddressSpaceInfo = AddressSpaceInfo::bytes("physical", "CPU physical", 0x20_0000);

/// Built-in spaces followed by the target's own
pub fn list<T: DebugTarget + ?Sized>(target: &T) -> Vec<AddressSpaceInfo> {
    let mut spaces = vec![CPU_SPACE, PHYSICAL_SPACE];
    spaces.extend(target.spaces());
    spaces
}

fn find<T: DebugTarget + ?Sized>(target: &T, space: &str) -> Result<AddressSpaceInfo> {
    target
        .spaces()
        .into_iter()
        .find(|info| info.name == space)
        .ok_or_else(|| Error::UnknownAddressSpace(space.to_string()))
}

/// Read `buffer.len()` bytes starting at `address`
pub fn get_bytes<T: DebugTarget + ?Sized>(
    cpu: &CpuState,
    target: &T,
    space: &str,
    address: u32,
    buffer: &mut [u8],
) -> Result<()> {
    match space {
        "cpu" => {
            for (i, byte) in buffer.iter_mut().enumerate() {
                let logical = address.wrapping_add(i as u32) as u16;
                *byte = target.peek(cpu.physical(logical));
            }
        }
        "physical" => {
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = target.peek(address.wrapping_add(i as u32) & PHYS_ADDR_MASK);
            }
        }
        _ => {
            let info = find(target, space)?;
            let len = info.byte_len();
            let mut address = address as u64 % len;
            let mut pos = 0;

            while pos < buffer.len() {
                let unit = address / info.unit_bytes as u64;
                let data = target.peek_unit(space, unit as u32).unwrap_or(0);

                if info.unit_bytes == 1 {
                    buffer[pos] = data as u8;
                    pos += 1;
                    address += 1;
                } else if address & 1 != 0 || buffer.len() - pos == 1 {
                    buffer[pos] = (data >> ((address & 1) * 8)) as u8;
                    pos += 1;
                    address += 1;
                } else {
                    buffer[pos] = data as u8;
                    buffer[pos + 1] = (data >> 8) as u8;
                    pos += 2;
                    address += 2;
                }
                address %= len;
            }
        }
    }
    Ok(())
}

/// Write `data` starting at `address`
pub fn put_bytes<T: DebugTarget + ?Sized>(
    cpu: &CpuState,
    target: &mut T,
    space: &str,
    address: u32,
    data: &[u8],
) -> Result<()> {
    match space {
        "cpu" => {
            for (i, byte) in data.iter().enumerate() {
                let logical = address.wrapping_add(i as u32) as u16;
                target.poke(cpu.physical(logical), *byte);
            }
        }
        "physical" => {
            for (i, byte) in data.iter().enumerate() {
                target.poke(address.wrapping_add(i as u32) & PHYS_ADDR_MASK, *byte);
            }
        }
        _ => {
            let info = find(target, space)?;
            let len = info.byte_len();
            let mut address = address as u64 % len;
            let mut rest = data;

            while !rest.is_empty() {
                let unit = (address / info.unit_bytes as u64) as u32;
                let (value, used) = if info.unit_bytes == 1 {
                    (rest[0] as u16, 1)
                } else if address & 1 != 0 || rest.len() == 1 {
                    let shift = (address & 1) * 8;
                    let old = target.peek_unit(space, unit).unwrap_or(0);
                    ((old & !(0xFF << shift)) | ((rest[0] as u16) << shift), 1)
                } else {
                    (rest[0] as u16 | ((rest[1] as u16) << 8), 2)
                };

                if !target.poke_unit(space, unit, value) {
                    return Err(Error::ReadOnlyAddressSpace(space.to_string()));
                }
                rest = &rest[used..];
                address = (address + used as u64) % len;
            }
        }
    }
    Ok(())
}
