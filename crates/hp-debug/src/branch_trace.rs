//! Ring buffer of recent control transfers
//!
//! Tight loops would flush the ring in a few iterations, so a transfer equal
//! to the most recent entry bumps that entry's counter instead of taking a
//! new slot.

use hp_core::config::DEFAULT_BRANCH_TRACE_CAPACITY;
use hp_cpu::Vector;

/// One transfer as stored in the ring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BranchEntry {
    from: u16,
    to: u16,
    vector: Option<Vector>,
    count: u32,
    valid: bool,
}

/// One transfer as reported to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTraceRecord {
    /// Source PC as four hex digits
    pub from: String,
    /// Destination PC as four hex digits
    pub to: String,
    /// Single-character vector code, `None` for an ordinary branch
    pub code: Option<char>,
    pub count: u32,
}

/// Display code of an interrupt or reset entry
pub fn vector_code(vector: Vector) -> char {
    match vector {
        Vector::Reset => 'R',
        Vector::Nmi => 'N',
        Vector::Timer => 'T',
        Vector::Irq1 => '1',
        Vector::Irq2 => '2',
    }
}

/// Fixed-capacity coalescing ring
#[derive(Debug, Clone)]
pub struct BranchTrace {
    entries: Vec<BranchEntry>,
    /// Next slot to write
    index: usize,
    saturation: u32,
}

impl Default for BranchTrace {
    fn default() -> Self {
        Self::new(DEFAULT_BRANCH_TRACE_CAPACITY)
    }
}

impl BranchTrace {
    pub fn new(capacity: usize) -> Self {
        Self::with_limits(capacity, u32::MAX)
    }

    /// Ring with a custom counter saturation point
    pub fn with_limits(capacity: usize, saturation: u32) -> Self {
        Self {
            entries: vec![BranchEntry::default(); capacity.max(1)],
            index: 0,
            saturation,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.valid).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.entries.iter().any(|e| e.valid)
    }

    /// Record a control transfer
    pub fn record(&mut self, from: u16, to: u16, vector: Option<Vector>) {
        let capacity = self.entries.len();
        let prev = &mut self.entries[(self.index + capacity - 1) % capacity];

        if prev.valid && prev.from == from && prev.to == to && prev.vector == vector && prev.count < self.saturation {
            prev.count += 1;
            return;
        }

        self.entries[self.index] = BranchEntry {
            from,
            to,
            vector,
            count: 1,
            valid: true,
        };
        self.index = (self.index + 1) % capacity;
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.fill(BranchEntry::default());
        self.index = 0;
    }

    /// Valid entries, oldest first
    pub fn records(&self) -> Vec<BranchTraceRecord> {
        let capacity = self.entries.len();
        (0..capacity)
            .map(|i| &self.entries[(self.index + i) % capacity])
            .filter(|entry| entry.valid)
            .map(|entry| BranchTraceRecord {
                from: format!("{:04X}", entry.from),
                to: format!("{:04X}", entry.to),
                code: entry.vector.map(vector_code),
                count: entry.count,
            })
            .collect()
    }
}
