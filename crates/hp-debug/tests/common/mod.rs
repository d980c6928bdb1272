//! Shared helpers for the debugger integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use hp_core::config::Config;
use hp_cpu::{HuC6280, NoObserver};
use hp_debug::Debugger;
use hp_machine::Machine;

/// IRQ1 handler address in the test image
pub const IRQ1_HANDLER: u16 = 0xE100;

/// One-bank HuCard image: `program` at 0xE000, NOPs elsewhere
pub fn image(program: &[u8]) -> Vec<u8> {
    let mut image = vec![0xEA; 0x2000];
    image[..program.len()].copy_from_slice(program);
    image[0x1FF8..0x1FFA].copy_from_slice(&IRQ1_HANDLER.to_le_bytes());
    image[0x1FFE..0x2000].copy_from_slice(&0xE000u16.to_le_bytes());
    image
}

/// A reset CPU and machine running `program`, plus a debugger wired to both
pub fn session(program: &[u8], config: &Config) -> (HuC6280, Machine, Debugger) {
    hp_core::logging::init_for_tests();
    let mut machine = Machine::new(&image(program), &config.system).unwrap();
    let mut cpu = HuC6280::new();
    cpu.reset(&mut machine, &mut NoObserver);
    let debugger = Debugger::new(config, machine.depth(), cpu.hook_slot());
    (cpu, machine, debugger)
}

/// Callback log shared with a registered host callback
pub type Hits = Rc<RefCell<Vec<(u16, bool)>>>;

/// Register a callback that records `(pc, matched)`
pub fn record_hits(debugger: &mut Debugger, continuous: bool) -> Hits {
    let hits: Hits = Rc::new(RefCell::new(Vec::new()));
    let sink = hits.clone();
    debugger.set_callback(move |_, pc, found| sink.borrow_mut().push((pc, found)), continuous);
    hits
}
