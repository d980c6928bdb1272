//! Bus contract between the CPU and the rest of the machine

/// Mask for the 21-bit physical address bus
pub const PHYS_ADDR_MASK: u32 = 0x1F_FFFF;

/// What a bus read is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Opcode or operand byte fetched from the instruction stream
    Fetch,
    /// Data, stack or vector access
    Data,
}

/// A single bus cycle issued by the interpreter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access {
    /// 21-bit physical address
    pub physical: u32,
    /// Logical address the access was issued through; `None` for the
    /// hard-wired ST0/ST1/ST2 port writes, which bypass the MMU
    pub logical: Option<u16>,
    pub kind: AccessKind,
}

impl Access {
    /// Data access through the MMU
    pub fn data(physical: u32, logical: u16) -> Self {
        Self {
            physical: physical & PHYS_ADDR_MASK,
            logical: Some(logical),
            kind: AccessKind::Data,
        }
    }

    /// Instruction stream fetch through the MMU
    pub fn fetch(physical: u32, logical: u16) -> Self {
        Self {
            physical: physical & PHYS_ADDR_MASK,
            logical: Some(logical),
            kind: AccessKind::Fetch,
        }
    }

    /// Hard-wired write that bypasses the MMU
    pub fn hardwired(physical: u32) -> Self {
        Self {
            physical: physical & PHYS_ADDR_MASK,
            logical: None,
            kind: AccessKind::Data,
        }
    }
}

/// Memory and I/O as seen by the CPU
///
/// `read`/`write` are genuine bus cycles and may have device side effects.
/// `peek`/`poke` are debugger accesses and must never have any.
pub trait Bus {
    /// Genuine read cycle
    fn read(&mut self, access: Access) -> u8;

    /// Genuine write cycle
    fn write(&mut self, access: Access, value: u8);

    /// Side-effect-free read of a physical address
    fn peek(&self, physical: u32) -> u8;

    /// Side-effect-free write of a physical address (writes ROM too)
    fn poke(&mut self, physical: u32, value: u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_constructors_mask_physical() {
        let access = Access::data(0xFF_FFFF, 0x2000);
        assert_eq!(access.physical, PHYS_ADDR_MASK);
        assert_eq!(access.logical, Some(0x2000));
        assert_eq!(access.kind, AccessKind::Data);

        let access = Access::hardwired(0x1FE002);
        assert_eq!(access.logical, None);
    }
}
