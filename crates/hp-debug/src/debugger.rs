//! The debugging session and its per-instruction notification
//!
//! [`Debugger`] is handed to [`hp_cpu::HuC6280::step`] as the CPU observer.
//! It installs the CPU hooks only while something needs them: any
//! breakpoint, a host callback, or BIOS logging for the instruction hook, and
//! branch tracing for the branch hook. With nothing set up the CPU never calls
//! into it.
//!
//! On each instruction boundary it tests the PC and opcode bitmaps and the
//! sync predicates, probes the next instruction when range breakpoints exist,
//! and calls the host back once a match has latched continuous mode.

use hp_core::config::Config;
use hp_core::{dbg_debug, dbg_trace, DebugDepth, Error, Result};
use hp_cpu::state::STACK_PAGE;
use hp_cpu::{CpuObserver, CpuState, HookInstaller, HookMask, IrqLines, Vector};

use crate::address_space::{self, AddressSpaceInfo};
use crate::bios::{BiosCall, BiosCallLog, LogSink, SyscardCallNames, ARG_BASE, BIOS_WINDOW};
use crate::branch_trace::{BranchTrace, BranchTraceRecord};
use crate::breakpoint::{AddressMode, BreakpointKind, BreakpointStore};
use crate::registers::{cpu_register, CpuRegisterGroup, RegisterGroup};
use crate::shadow::{ProbeRecord, ShadowExecutor};
use crate::target::DebugTarget;

/// Host notification: `(context, pc, breakpoint_matched)`
pub type HostCallback = Box<dyn FnMut(&mut DebugContext<'_>, u16, bool)>;

/// Debugger session state for one emulation session
pub struct Debugger {
    store: BreakpointStore,
    shadow: ShadowExecutor,
    /// The last notification ran a probe
    probed: bool,
    trace: BranchTrace,
    trace_enabled: bool,
    callback: Option<HostCallback>,
    /// Keep notifying after the first match until the host resets it
    continuous: bool,
    /// Matches reported by collaborators since the last notification
    pending_match: bool,
    log_sink: Option<LogSink>,
    bios_logging: bool,
    cd_system: bool,
    bios_log: Box<dyn BiosCallLog>,
    installer: Box<dyn HookInstaller>,
    installed: HookMask,
    depth: DebugDepth,
    last_pc: u16,
}

impl Debugger {
    /// Create a session; `depth` must be the machine's nesting counter
    pub fn new(config: &Config, depth: DebugDepth, installer: impl HookInstaller + 'static) -> Self {
        let mut debugger = Self {
            store: BreakpointStore::new(config.debug.logical_write_exclusions.clone()),
            shadow: ShadowExecutor::new(),
            probed: false,
            trace: BranchTrace::new(config.debug.branch_trace_capacity),
            trace_enabled: false,
            callback: None,
            continuous: false,
            pending_match: false,
            log_sink: None,
            bios_logging: config.debug.bios_logging,
            cd_system: config.system.cd_system,
            bios_log: Box::new(SyscardCallNames),
            installer: Box::new(installer),
            installed: HookMask::empty(),
            depth,
            last_pc: 0,
        };
        debugger.update_hooks();
        debugger
    }

    /// Replace the BIOS call decoder
    pub fn with_bios_log(mut self, bios_log: impl BiosCallLog + 'static) -> Self {
        self.bios_log = Box::new(bios_log);
        self
    }

    fn needs_instruction_hook(&self) -> bool {
        !self.store.is_empty() || self.callback.is_some() || self.bios_logging
    }

    fn update_hooks(&mut self) {
        let mut hooks = HookMask::empty();
        if self.needs_instruction_hook() {
            hooks |= HookMask::INSTRUCTION;
        }
        if self.trace_enabled {
            hooks |= HookMask::BRANCH;
        }

        if hooks != self.installed {
            dbg_debug!("Installing CPU hooks {:?}", hooks);
            self.installer.install(hooks);
            self.installed = hooks;
        }
    }

    /// Hooks currently requested from the CPU
    pub fn installed_hooks(&self) -> HookMask {
        self.installed
    }

    pub fn add_breakpoint(&mut self, kind: BreakpointKind, lo: u32, hi: u32, mode: AddressMode) {
        self.store.add(kind, lo, hi, mode);
        self.update_hooks();
    }

    pub fn flush_breakpoints(&mut self, kind: BreakpointKind) {
        self.store.flush(kind);
        self.update_hooks();
    }

    pub fn flush_all_breakpoints(&mut self) {
        self.store.flush_all();
        self.update_hooks();
    }

    pub fn breakpoints(&self) -> &BreakpointStore {
        &self.store
    }

    /// Register the host callback.
    ///
    /// With `continuous` the callback fires on every instruction from now on;
    /// otherwise only once a breakpoint has matched.
    pub fn set_callback(&mut self, callback: impl FnMut(&mut DebugContext<'_>, u16, bool) + 'static, continuous: bool) {
        self.callback = Some(Box::new(callback));
        self.continuous = continuous;
        self.update_hooks();
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
        self.update_hooks();
    }

    /// Return to notifying only on matches
    pub fn reset_continuous(&mut self) {
        self.continuous = false;
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Turn branch tracing on or off; turning it off clears the ring
    pub fn enable_branch_trace(&mut self, enable: bool) {
        self.trace_enabled = enable;
        if !enable {
            self.trace.clear();
        }
        self.update_hooks();
    }

    pub fn branch_trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// Recorded transfers, oldest first
    pub fn branch_trace(&self) -> Vec<BranchTraceRecord> {
        self.trace.records()
    }

    pub fn set_log_sink(&mut self, sink: Option<LogSink>) {
        self.log_sink = sink;
    }

    pub fn set_bios_logging(&mut self, enable: bool) {
        self.bios_logging = enable;
        self.update_hooks();
    }

    /// Test an access made outside the CPU (e.g. by a DMA engine); a match is
    /// reported with the next notification
    pub fn check_access(&mut self, kind: BreakpointKind, address: u32, len: u32) {
        if self.store.match_range(kind, address, len) {
            dbg_trace!("{:?} access 0x{:x}+{} matched", kind, address, len);
            self.pending_match = true;
        }
    }

    /// Accesses recorded by the last probe, if the last notification probed
    pub fn last_probe(&self) -> Option<&ProbeRecord> {
        self.probed.then(|| self.shadow.last_record())
    }

    /// Host access to the machine between notifications
    pub fn inspect<'a>(&'a self, cpu: &'a mut CpuState, target: &'a mut dyn DebugTarget) -> DebugContext<'a> {
        DebugContext::new(cpu, target, &self.depth)
    }

    fn forward_bios_call(&mut self, pc: u16, cpu: &CpuState, target: &dyn DebugTarget) {
        let mut args = [0u8; 8];
        for (i, arg) in args.iter_mut().enumerate() {
            *arg = target.peek(cpu.physical(ARG_BASE + i as u16));
        }
        let call = BiosCall {
            pc,
            caller: self.last_pc,
            args,
            mpr: cpu.mpr,
            timestamp: cpu.timestamp,
        };

        match self.log_sink.as_mut() {
            Some(sink) => self.bios_log.log_call(&call, &mut **sink),
            None => self.bios_log.log_call(&call, &mut |_, _| {}),
        }
    }
}

impl<T: DebugTarget> CpuObserver<T> for Debugger {
    fn on_instruction(&mut self, pc: u16, cpu: &mut CpuState, target: &mut T) -> bool {
        assert!(!self.depth.active(), "instruction hook re-entered at PC 0x{:04x}", pc);
        let guard = self.depth.enter();

        let mut found = self.store.match_pc(pc) || target.hsync_breakpoint() || target.vsync_breakpoint();
        if self.store.has_opcode_breakpoints() {
            found |= self.store.match_opcode(target.peek(cpu.physical(pc)));
        }

        self.probed = self.store.needs_shadow_execution();
        if self.probed {
            found |= self.shadow.probe(cpu, &*target).matches(&self.store);
        }
        found |= std::mem::take(&mut self.pending_match);

        self.continuous |= found;

        let mut changed = false;
        if self.continuous {
            if let Some(callback) = self.callback.as_mut() {
                target.catch_up(cpu.timestamp);
                let mut ctx = DebugContext::new(cpu, &mut *target, &self.depth);
                callback(&mut ctx, pc, found);
                changed = ctx.state_changed();
            }
        }

        if self.bios_logging && self.cd_system && BIOS_WINDOW.contains(&pc) {
            self.forward_bios_call(pc, cpu, &*target);
        }

        self.last_pc = pc;
        drop(guard);
        assert!(!self.depth.active(), "debug context still open after the instruction hook");
        changed
    }

    fn on_branch(&mut self, from: u16, to: u16, vector: Option<Vector>) {
        if self.trace_enabled {
            self.trace.record(from, to, vector);
        }
    }
}

/// Host view of the machine during a notification
///
/// Every access runs inside the debug context, and every mutation marks the
/// machine state as changed.
pub struct DebugContext<'a> {
    cpu: &'a mut CpuState,
    target: &'a mut dyn DebugTarget,
    depth: &'a DebugDepth,
    changed: bool,
}

impl<'a> DebugContext<'a> {
    fn new(cpu: &'a mut CpuState, target: &'a mut dyn DebugTarget, depth: &'a DebugDepth) -> Self {
        Self { cpu, target, depth, changed: false }
    }

    pub fn cpu(&self) -> &CpuState {
        self.cpu
    }

    pub fn pc(&self) -> u16 {
        self.cpu.pc
    }

    /// Logical address of the current stack slot
    pub fn stack_pointer(&self) -> u16 {
        STACK_PAGE | self.cpu.s as u16
    }

    pub fn register(&self, id: u32) -> Result<u32> {
        let reg = cpu_register(id).ok_or(Error::UnknownRegister { group: "cpu", id })?;
        Ok(self.cpu.register(reg))
    }

    pub fn set_register(&mut self, id: u32, value: u32) -> Result<()> {
        self.cpu_registers().set(id, value)
    }

    /// The CPU register group; writes through it count as state changes
    pub fn cpu_registers(&mut self) -> CpuRegisterGroup<'_> {
        CpuRegisterGroup::tracked(&mut *self.cpu, &mut self.changed)
    }

    pub fn peek_logical(&self, addr: u16) -> u8 {
        let _guard = self.depth.enter();
        self.target.peek(self.cpu.physical(addr))
    }

    pub fn peek_physical(&self, addr: u32) -> u8 {
        let _guard = self.depth.enter();
        self.target.peek(addr & hp_cpu::bus::PHYS_ADDR_MASK)
    }

    pub fn poke_logical(&mut self, addr: u16, value: u8) {
        let _guard = self.depth.enter();
        let physical = self.cpu.physical(addr);
        self.target.poke(physical, value);
        self.changed = true;
    }

    pub fn poke_physical(&mut self, addr: u32, value: u8) {
        let _guard = self.depth.enter();
        self.target.poke(addr & hp_cpu::bus::PHYS_ADDR_MASK, value);
        self.changed = true;
    }

    /// Little-endian read of up to four bytes
    pub fn mem_peek(&self, addr: u32, len: u32, logical: bool) -> u32 {
        (0..len.min(4)).fold(0, |value, i| {
            let byte = if logical {
                self.peek_logical(addr.wrapping_add(i) as u16)
            } else {
                self.peek_physical(addr.wrapping_add(i))
            };
            value | (byte as u32) << (i * 8)
        })
    }

    pub fn spaces(&self) -> Vec<AddressSpaceInfo> {
        address_space::list(&*self.target)
    }

    pub fn get_address_space_bytes(&self, space: &str, address: u32, buffer: &mut [u8]) -> Result<()> {
        let _guard = self.depth.enter();
        address_space::get_bytes(self.cpu, &*self.target, space, address, buffer)
    }

    pub fn put_address_space_bytes(&mut self, space: &str, address: u32, data: &[u8]) -> Result<()> {
        let _guard = self.depth.enter();
        self.changed = true;
        address_space::put_bytes(self.cpu, &mut *self.target, space, address, data)
    }

    /// Assert an interrupt line: 1 = IRQ1, 2 = IRQ2, 3 = timer
    pub fn raise_irq(&mut self, level: u8) {
        let line = match level {
            1 => IrqLines::IRQ1,
            2 => IrqLines::IRQ2,
            3 => IrqLines::TIMER,
            _ => {
                dbg_debug!("Ignoring IRQ request for level {}", level);
                return;
            }
        };
        self.cpu.irq_pending |= line;
        self.changed = true;
    }

    /// Flag a change made behind the context's back
    pub fn mark_state_changed(&mut self) {
        self.changed = true;
    }

    pub fn state_changed(&self) -> bool {
        self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hp_cpu::{Access, Bus, HookSlot};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Flat memory target with no peripherals
    struct FlatTarget(Vec<u8>);

    impl Bus for FlatTarget {
        fn read(&mut self, access: Access) -> u8 {
            self.0[access.physical as usize]
        }
        fn write(&mut self, access: Access, value: u8) {
            self.0[access.physical as usize] = value;
        }
        fn peek(&self, physical: u32) -> u8 {
            self.0[physical as usize]
        }
        fn poke(&mut self, physical: u32, value: u8) {
            self.0[physical as usize] = value;
        }
    }

    impl DebugTarget for FlatTarget {}

    fn setup() -> (Debugger, HookSlot, CpuState, FlatTarget) {
        let slot = HookSlot::new();
        let debugger = Debugger::new(&Config::default(), DebugDepth::new(), slot.clone());
        let mut cpu = CpuState::default();
        cpu.pc = 0x4000;
        (debugger, slot, cpu, FlatTarget(vec![0xEA; 0x20_0000]))
    }

    #[test]
    fn test_idle_installs_nothing() {
        let (debugger, slot, _, _) = setup();
        assert!(slot.installed().is_empty());
        assert!(debugger.installed_hooks().is_empty());
    }

    #[test]
    fn test_pc_breakpoint_notifies() {
        let (mut debugger, slot, mut cpu, mut target) = setup();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = hits.clone();

        debugger.add_breakpoint(BreakpointKind::Pc, 0x4000, 0x4000, AddressMode::Logical);
        debugger.set_callback(move |_, pc, found| sink.borrow_mut().push((pc, found)), false);
        assert_eq!(slot.installed(), HookMask::INSTRUCTION);

        cpu.pc = 0x3FFF;
        debugger.on_instruction(0x3FFF, &mut cpu, &mut target);
        assert!(hits.borrow().is_empty());

        cpu.pc = 0x4000;
        debugger.on_instruction(0x4000, &mut cpu, &mut target);
        assert_eq!(*hits.borrow(), vec![(0x4000, true)]);
        assert!(debugger.last_probe().is_none());
    }

    #[test]
    fn test_opcode_breakpoint_reads_next_opcode() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        let hits = Rc::new(RefCell::new(0));
        let sink = hits.clone();
        debugger.add_breakpoint(BreakpointKind::Opcode, 0x8D, 0x8D, AddressMode::Logical);
        debugger.set_callback(move |_, _, _| *sink.borrow_mut() += 1, false);

        debugger.on_instruction(0x4000, &mut cpu, &mut target);
        assert_eq!(*hits.borrow(), 0);

        target.0[cpu.physical(0x4000) as usize] = 0x8D;
        debugger.on_instruction(0x4000, &mut cpu, &mut target);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn test_callback_mutation_reports_state_change() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        debugger.set_callback(
            |ctx, _, _| {
                ctx.set_register(crate::registers::cpu_ids::A, 0x42).unwrap();
                ctx.poke_logical(0x2000, 0x99);
            },
            true,
        );

        assert!(debugger.on_instruction(0x4000, &mut cpu, &mut target));
        assert_eq!(cpu.a, 0x42);
        assert_eq!(target.0[cpu.physical(0x2000) as usize], 0x99);
    }

    #[test]
    fn test_read_only_callback_reports_no_change() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        debugger.set_callback(
            |ctx, pc, _| {
                assert_eq!(ctx.pc(), pc);
                assert_eq!(ctx.mem_peek(0x4000, 2, true), 0xEAEA);
                assert_eq!(ctx.stack_pointer(), 0x21FF);
            },
            true,
        );

        assert!(!debugger.on_instruction(0x4000, &mut cpu, &mut target));
    }

    #[test]
    fn test_depth_active_during_callback_only() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        let depth = DebugDepth::new();
        debugger.depth = depth.clone();
        let seen = Rc::new(RefCell::new(0));
        let sink = seen.clone();
        let probe = depth.clone();
        debugger.set_callback(move |_, _, _| *sink.borrow_mut() = probe.get(), true);

        debugger.on_instruction(0x4000, &mut cpu, &mut target);
        assert_eq!(*seen.borrow(), 1);
        assert_eq!(depth.get(), 0);
    }

    #[test]
    #[should_panic(expected = "re-entered")]
    fn test_reentry_panics() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        let _guard = debugger.depth.enter();
        debugger.on_instruction(0x4000, &mut cpu, &mut target);
    }

    #[test]
    fn test_register_reads_leave_state_unchanged() {
        let (debugger, _, mut cpu, mut target) = setup();
        let mut ctx = debugger.inspect(&mut cpu, &mut target);

        let group = ctx.cpu_registers();
        assert_eq!(group.get(crate::registers::cpu_ids::PC).unwrap(), 0x4000);
        assert_eq!(group.registers().len(), 18);
        assert!(!ctx.state_changed());

        ctx.cpu_registers().set(crate::registers::cpu_ids::Y, 0x07).unwrap();
        assert!(ctx.state_changed());
        drop(ctx);
        assert_eq!(cpu.y, 0x07);
    }

    #[test]
    fn test_raise_irq_levels() {
        let (debugger, _, mut cpu, mut target) = setup();
        let mut ctx = debugger.inspect(&mut cpu, &mut target);
        ctx.raise_irq(3);
        ctx.raise_irq(7);
        assert!(ctx.state_changed());
        drop(ctx);
        assert_eq!(cpu.irq_pending, IrqLines::TIMER);
    }

    #[test]
    fn test_check_access_feeds_next_notification() {
        let (mut debugger, _, mut cpu, mut target) = setup();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = hits.clone();
        debugger.add_breakpoint(BreakpointKind::AuxWrite, 0x100, 0x1FF, AddressMode::Logical);
        debugger.set_callback(move |_, _, found| sink.borrow_mut().push(found), false);

        debugger.check_access(BreakpointKind::AuxWrite, 0x180, 4);
        debugger.on_instruction(0x4000, &mut cpu, &mut target);
        debugger.reset_continuous();
        debugger.on_instruction(0x4000, &mut cpu, &mut target);

        assert_eq!(*hits.borrow(), vec![true]);
    }

    #[test]
    fn test_bios_forwarding_needs_cd_system() {
        let mut config = Config::default();
        config.debug.bios_logging = true;
        let slot = HookSlot::new();
        let mut cpu = CpuState::default();
        let mut target = FlatTarget(vec![0; 0x20_0000]);
        let lines = Rc::new(RefCell::new(Vec::new()));

        let mut debugger = Debugger::new(&config, DebugDepth::new(), slot.clone());
        assert_eq!(slot.installed(), HookMask::INSTRUCTION);
        let sink = lines.clone();
        debugger.set_log_sink(Some(Box::new(move |kind: &str, text: &str| {
            sink.borrow_mut().push(format!("{kind}: {text}"))
        })));
        debugger.on_instruction(0xE07B, &mut cpu, &mut target);
        assert!(lines.borrow().is_empty());

        config.system.cd_system = true;
        let mut debugger = Debugger::new(&config, DebugDepth::new(), slot);
        let sink = lines.clone();
        debugger.set_log_sink(Some(Box::new(move |kind: &str, text: &str| {
            sink.borrow_mut().push(format!("{kind}: {text}"))
        })));
        debugger.on_instruction(0x1234, &mut cpu, &mut target);
        debugger.on_instruction(0xE07B, &mut cpu, &mut target);
        assert_eq!(*lines.borrow(), vec!["BIOS: Call EX_VSYNC from $1234".to_string()]);
    }
}
