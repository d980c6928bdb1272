//! Debugger nesting counter
//!
//! Every debugger peek, poke and shadow step runs inside a [`DepthGuard`].
//! Peripherals hold a clone of the same [`DebugDepth`] and consult
//! [`DebugDepth::active`] when their behavior differs between a probing access
//! and a genuine emulated one.

use std::cell::Cell;
use std::rc::Rc;

/// Shared "in debug context" nesting counter for one emulation session
#[derive(Debug, Clone, Default)]
pub struct DebugDepth(Rc<Cell<u32>>);

impl DebugDepth {
    /// Create a counter at depth zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a debug context; the depth drops back when the guard is dropped
    pub fn enter(&self) -> DepthGuard {
        self.0.set(self.0.get() + 1);
        DepthGuard(self.0.clone())
    }

    /// Current nesting depth
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// True while any debugger access is in progress
    pub fn active(&self) -> bool {
        self.0.get() != 0
    }
}

/// RAII bracket returned by [`DebugDepth::enter`]
#[derive(Debug)]
#[must_use = "the debug context ends as soon as the guard is dropped"]
pub struct DepthGuard(Rc<Cell<u32>>);

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_nesting() {
        let depth = DebugDepth::new();
        assert!(!depth.active());

        let outer = depth.enter();
        {
            let _inner = depth.enter();
            assert_eq!(depth.get(), 2);
        }
        assert_eq!(depth.get(), 1);
        drop(outer);
        assert!(!depth.active());
    }

    #[test]
    fn test_clones_share_counter() {
        let depth = DebugDepth::new();
        let peripheral_view = depth.clone();

        let _guard = depth.enter();
        assert!(peripheral_view.active());
    }
}
