//! Breakpoint storage and matching
//!
//! PC and opcode breakpoints live in dense bitmaps so the per-instruction
//! check is a single bit test. Read, write and aux breakpoints are kept as
//! range lists and matched by overlap.

use hp_core::config::DEFAULT_STATUS_PORT_WRITES;
use hp_core::dbg_debug;
use hp_cpu::Access;

/// Breakpoint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointKind {
    /// Program counter about to execute
    Pc,
    /// Opcode about to execute
    Opcode,
    /// CPU bus read
    Read,
    /// CPU bus write
    Write,
    /// Device register or VRAM read decoded from a port access
    AuxRead,
    /// Device register or VRAM write decoded from a port access
    AuxWrite,
}

impl BreakpointKind {
    pub const ALL: [Self; 6] = [
        Self::Pc,
        Self::Opcode,
        Self::Read,
        Self::Write,
        Self::AuxRead,
        Self::AuxWrite,
    ];

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }

    /// Whether this kind is matched by simulating the next instruction
    pub const fn needs_shadow(self) -> bool {
        matches!(self, Self::Read | Self::Write | Self::AuxRead | Self::AuxWrite)
    }

    /// Size of the bitmap index space, for bitmap kinds
    const fn bitmap_size(self) -> Option<u32> {
        match self {
            Self::Pc => Some(0x1_0000),
            Self::Opcode => Some(0x100),
            _ => None,
        }
    }
}

/// Which address a range breakpoint is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Address as issued by the CPU, before the MMU
    #[default]
    Logical,
    /// 21-bit physical address
    Physical,
}

/// Inclusive address range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BreakpointRange {
    pub lo: u32,
    pub hi: u32,
    pub mode: AddressMode,
}

impl BreakpointRange {
    /// True if any of `len` consecutive addresses from `address` is in range
    #[inline]
    pub fn overlaps(&self, address: u32, len: u32) -> bool {
        if len == 0 || self.lo > self.hi {
            return false;
        }
        let first = address as u64;
        let last = first + len as u64 - 1;
        first <= self.hi as u64 && last >= self.lo as u64
    }
}

/// Per-kind container
#[derive(Debug, Clone)]
pub enum BreakpointSet {
    Bitmap { bits: Box<[u64]>, size: u32 },
    Ranges(Vec<BreakpointRange>),
}

impl BreakpointSet {
    fn for_kind(kind: BreakpointKind) -> Self {
        match kind.bitmap_size() {
            Some(size) => Self::Bitmap {
                bits: vec![0u64; size.div_ceil(64) as usize].into_boxed_slice(),
                size,
            },
            None => Self::Ranges(Vec::new()),
        }
    }

    fn insert(&mut self, lo: u32, hi: u32, mode: AddressMode) {
        match self {
            Self::Bitmap { bits, size } => {
                if lo > hi || lo >= *size {
                    return;
                }
                for index in lo..=hi.min(*size - 1) {
                    bits[(index / 64) as usize] |= 1u64 << (index % 64);
                }
            }
            Self::Ranges(ranges) => ranges.push(BreakpointRange { lo, hi, mode }),
        }
    }

    fn clear(&mut self) {
        match self {
            Self::Bitmap { bits, .. } => bits.fill(0),
            Self::Ranges(ranges) => ranges.clear(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Bitmap { bits, .. } => bits.iter().all(|word| *word == 0),
            Self::Ranges(ranges) => ranges.is_empty(),
        }
    }

    #[inline]
    fn contains(&self, index: u32) -> bool {
        match self {
            Self::Bitmap { bits, size } => {
                index < *size && bits[(index / 64) as usize] & (1u64 << (index % 64)) != 0
            }
            Self::Ranges(ranges) => ranges.iter().any(|r| r.overlaps(index, 1)),
        }
    }

    /// Contents as ranges; bitmap runs are reported as logical ranges
    fn ranges(&self) -> Vec<BreakpointRange> {
        match self {
            Self::Ranges(ranges) => ranges.clone(),
            Self::Bitmap { size, .. } => {
                let mut out = Vec::new();
                let mut start = None;
                for index in 0..=*size {
                    match (start, index < *size && self.contains(index)) {
                        (None, true) => start = Some(index),
                        (Some(lo), false) => {
                            out.push(BreakpointRange { lo, hi: index - 1, mode: AddressMode::Logical });
                            start = None;
                        }
                        _ => {}
                    }
                }
                out
            }
        }
    }
}

/// All breakpoints of one debugging session
#[derive(Debug, Clone)]
pub struct BreakpointStore {
    sets: [BreakpointSet; 6],
    /// Hard-wired port writes ignored by logical-mode write breakpoints
    write_exclusions: Vec<u32>,
    pc_used: bool,
    opcode_used: bool,
    shadow_needed: bool,
}

impl Default for BreakpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_PORT_WRITES.to_vec())
    }
}

impl BreakpointStore {
    /// Create an empty store with the given logical-write exclusion list
    pub fn new(write_exclusions: Vec<u32>) -> Self {
        Self {
            sets: BreakpointKind::ALL.map(BreakpointSet::for_kind),
            write_exclusions,
            pc_used: false,
            opcode_used: false,
            shadow_needed: false,
        }
    }

    /// Add a breakpoint over `[lo, hi]`.
    ///
    /// PC and opcode ranges are clipped to their index space; out-of-range
    /// parts are dropped silently.
    pub fn add(&mut self, kind: BreakpointKind, lo: u32, hi: u32, mode: AddressMode) {
        dbg_debug!("Added {:?} breakpoint 0x{:x}-0x{:x} ({:?})", kind, lo, hi, mode);
        self.sets[kind.index()].insert(lo, hi, mode);
        self.recompute();
    }

    /// Remove every breakpoint of one kind
    pub fn flush(&mut self, kind: BreakpointKind) {
        dbg_debug!("Flushed {:?} breakpoints", kind);
        self.sets[kind.index()].clear();
        self.recompute();
    }

    /// Remove every breakpoint
    pub fn flush_all(&mut self) {
        for set in &mut self.sets {
            set.clear();
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.pc_used = !self.sets[BreakpointKind::Pc.index()].is_empty();
        self.opcode_used = !self.sets[BreakpointKind::Opcode.index()].is_empty();
        self.shadow_needed = BreakpointKind::ALL
            .iter()
            .any(|kind| kind.needs_shadow() && !self.sets[kind.index()].is_empty());
    }

    #[inline]
    pub fn match_pc(&self, pc: u16) -> bool {
        self.pc_used && self.sets[BreakpointKind::Pc.index()].contains(pc as u32)
    }

    #[inline]
    pub fn match_opcode(&self, opcode: u8) -> bool {
        self.opcode_used && self.sets[BreakpointKind::Opcode.index()].contains(opcode as u32)
    }

    /// Whether any opcode breakpoint exists (the opcode needs fetching)
    pub fn has_opcode_breakpoints(&self) -> bool {
        self.opcode_used
    }

    /// Overlap test of `[address, address + len)` against every range of `kind`,
    /// regardless of addressing mode
    pub fn match_range(&self, kind: BreakpointKind, address: u32, len: u32) -> bool {
        match &self.sets[kind.index()] {
            BreakpointSet::Ranges(ranges) => ranges.iter().any(|r| r.overlaps(address, len)),
            set @ BreakpointSet::Bitmap { .. } => {
                (0..len).any(|i| address.checked_add(i).is_some_and(|index| set.contains(index)))
            }
        }
    }

    /// Test one CPU bus access against the read or write breakpoints.
    ///
    /// Logical-mode breakpoints compare the logical address. Hard-wired port
    /// writes carry no logical address: those listed in the exclusion list are
    /// skipped, others are compared by physical address.
    pub fn match_access(&self, kind: BreakpointKind, access: &Access) -> bool {
        let BreakpointSet::Ranges(ranges) = &self.sets[kind.index()] else {
            return false;
        };

        ranges.iter().any(|range| {
            let address = match (range.mode, access.logical) {
                (AddressMode::Physical, _) => access.physical,
                (AddressMode::Logical, Some(logical)) => logical as u32,
                (AddressMode::Logical, None) => {
                    if kind == BreakpointKind::Write && self.write_exclusions.contains(&access.physical) {
                        return false;
                    }
                    access.physical
                }
            };
            range.overlaps(address, 1)
        })
    }

    /// True iff any read, write or aux breakpoint exists
    #[inline]
    pub fn needs_shadow_execution(&self) -> bool {
        self.shadow_needed
    }

    /// True iff no breakpoint of any kind exists
    pub fn is_empty(&self) -> bool {
        !self.pc_used && !self.opcode_used && !self.shadow_needed
    }

    /// Breakpoints of one kind, for listing
    pub fn ranges(&self, kind: BreakpointKind) -> Vec<BreakpointRange> {
        self.sets[kind.index()].ranges()
    }

    pub fn write_exclusions(&self) -> &[u32] {
        &self.write_exclusions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pc_bitmap_clips() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Pc, 0xFFF0, 0x1_0010, AddressMode::Logical);

        assert!(store.match_pc(0xFFF0));
        assert!(store.match_pc(0xFFFF));
        assert!(!store.match_pc(0xFFEF));
        assert!(!store.match_pc(0x0000));
        assert_eq!(
            store.ranges(BreakpointKind::Pc),
            vec![BreakpointRange { lo: 0xFFF0, hi: 0xFFFF, mode: AddressMode::Logical }]
        );
    }

    #[test]
    fn test_out_of_range_opcode_ignored() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Opcode, 0x100, 0x200, AddressMode::Logical);
        assert!(store.is_empty());

        store.add(BreakpointKind::Opcode, 0xEA, 0xEA, AddressMode::Logical);
        assert!(store.match_opcode(0xEA));
        assert!(!store.match_opcode(0xE9));
        assert!(!store.needs_shadow_execution());
    }

    #[test]
    fn test_reversed_range() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Pc, 0x20, 0x10, AddressMode::Logical);
        assert!(store.is_empty());

        store.add(BreakpointKind::Read, 0x20, 0x10, AddressMode::Logical);
        assert!(store.needs_shadow_execution());
        assert!(!store.match_range(BreakpointKind::Read, 0x10, 0x20));
    }

    #[test]
    fn test_range_overlap() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::AuxWrite, 0x100, 0x10F, AddressMode::Logical);

        assert!(store.match_range(BreakpointKind::AuxWrite, 0x0F0, 0x11));
        assert!(!store.match_range(BreakpointKind::AuxWrite, 0x0F0, 0x10));
        assert!(store.match_range(BreakpointKind::AuxWrite, 0x10F, 4));
        assert!(!store.match_range(BreakpointKind::AuxWrite, 0x110, 4));
        assert!(!store.match_range(BreakpointKind::AuxWrite, 0x100, 0));
        assert!(!store.match_range(BreakpointKind::AuxRead, 0x100, 1));
    }

    #[test]
    fn test_range_overlap_near_u32_max() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Read, 0xFFFF_FFFF, 0xFFFF_FFFF, AddressMode::Physical);
        assert!(store.match_range(BreakpointKind::Read, 0xFFFF_FFF0, 0x20));
    }

    #[test]
    fn test_access_modes() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Write, 0x2000, 0x2000, AddressMode::Logical);
        store.add(BreakpointKind::Read, 0x1F0000, 0x1F0000, AddressMode::Physical);

        assert!(store.match_access(BreakpointKind::Write, &Access::data(0x1F0000, 0x2000)));
        assert!(!store.match_access(BreakpointKind::Write, &Access::data(0x1F2000, 0x4000)));
        assert!(store.match_access(BreakpointKind::Read, &Access::data(0x1F0000, 0x4000)));
        assert!(!store.match_access(BreakpointKind::Read, &Access::data(0x1F0001, 0x2000)));
    }

    #[test]
    fn test_hardwired_writes_excluded_from_logical_mode() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Write, 0x0000, 0xFFFF_FFFF, AddressMode::Logical);
        assert!(!store.match_access(BreakpointKind::Write, &Access::hardwired(0x1FE002)));

        let mut store = BreakpointStore::new(Vec::new());
        store.add(BreakpointKind::Write, 0x1FE002, 0x1FE002, AddressMode::Logical);
        assert!(store.match_access(BreakpointKind::Write, &Access::hardwired(0x1FE002)));

        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Write, 0x1FE002, 0x1FE002, AddressMode::Physical);
        assert!(store.match_access(BreakpointKind::Write, &Access::hardwired(0x1FE002)));
    }

    #[test]
    fn test_flush_recomputes() {
        let mut store = BreakpointStore::default();
        store.add(BreakpointKind::Read, 0, 0, AddressMode::Logical);
        store.add(BreakpointKind::Pc, 0, 0, AddressMode::Logical);
        assert!(store.needs_shadow_execution());

        store.flush(BreakpointKind::Read);
        assert!(!store.needs_shadow_execution());
        assert!(!store.is_empty());

        store.flush_all();
        assert!(store.is_empty());
        assert!(!store.match_pc(0));
    }
}
