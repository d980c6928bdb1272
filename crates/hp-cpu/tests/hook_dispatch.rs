//! Hook installation and dispatch through the committed CPU

use hp_cpu::{Access, Bus, CpuObserver, CpuState, HookInstaller, HookMask, HuC6280, IrqLines, NoObserver, Vector};

struct FlatBus(Vec<u8>);

impl FlatBus {
    /// Program at logical 0xE000 with bank 0 mapped there and the reset
    /// vector pointing at it
    fn with_program(program: &[u8]) -> Self {
        let mut mem = vec![0xEA; 0x20_0000];
        mem[..program.len()].copy_from_slice(program);
        mem[0x1FFE] = 0x00;
        mem[0x1FFF] = 0xE0;
        mem[0x1FF6] = 0x00;
        mem[0x1FF7] = 0xE1;
        Self(mem)
    }
}

impl Bus for FlatBus {
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

#[derive(Default)]
struct Recorder {
    instructions: Vec<u16>,
    branches: Vec<(u16, u16, Option<Vector>)>,
    change_state: bool,
}

impl CpuObserver<FlatBus> for Recorder {
    fn on_instruction(&mut self, pc: u16, cpu: &mut CpuState, _bus: &mut FlatBus) -> bool {
        self.instructions.push(pc);
        if self.change_state {
            cpu.x = 0x99;
        }
        self.change_state
    }

    fn on_branch(&mut self, from: u16, to: u16, vector: Option<Vector>) {
        self.branches.push((from, to, vector));
    }
}

#[test]
fn test_no_hooks_no_calls() {
    // NOP ; BRA -3
    let mut bus = FlatBus::with_program(&[0xEA, 0x80, 0xFD]);
    let mut cpu = HuC6280::new();
    let mut recorder = Recorder::default();

    cpu.reset(&mut bus, &mut recorder);
    cpu.run(&mut bus, &mut recorder, 10);

    assert!(recorder.instructions.is_empty());
    assert!(recorder.branches.is_empty());
    assert_eq!(cpu.instructions(), 10);
}

#[test]
fn test_instruction_hook_sees_next_pc() {
    let mut bus = FlatBus::with_program(&[0xEA, 0xEA, 0xEA]);
    let mut cpu = HuC6280::new();
    cpu.reset(&mut bus, &mut NoObserver);
    cpu.hook_slot().install(HookMask::INSTRUCTION);

    let mut recorder = Recorder::default();
    cpu.run(&mut bus, &mut recorder, 3);

    assert_eq!(recorder.instructions, vec![0xE000, 0xE001, 0xE002]);
    assert!(recorder.branches.is_empty());
}

#[test]
fn test_branch_hook_and_uninstall() {
    // NOP ; BRA -3
    let mut bus = FlatBus::with_program(&[0xEA, 0x80, 0xFD]);
    let mut cpu = HuC6280::new();
    let mut slot = cpu.hook_slot();
    slot.install(HookMask::BRANCH);

    let mut recorder = Recorder::default();
    cpu.reset(&mut bus, &mut recorder);
    cpu.run(&mut bus, &mut recorder, 2);

    assert_eq!(
        recorder.branches,
        vec![(0x0000, 0xE000, Some(Vector::Reset)), (0xE001, 0xE000, None)]
    );

    slot.install(HookMask::empty());
    cpu.run(&mut bus, &mut recorder, 4);
    assert_eq!(recorder.branches.len(), 2);
}

#[test]
fn test_debugger_state_change_is_visible() {
    let mut bus = FlatBus::with_program(&[0x8A]); // TXA
    let mut cpu = HuC6280::new();
    cpu.reset(&mut bus, &mut NoObserver);
    cpu.hook_slot().install(HookMask::INSTRUCTION);

    let mut recorder = Recorder { change_state: true, ..Default::default() };
    cpu.step(&mut bus, &mut recorder);

    assert_eq!(cpu.state.a, 0x99);
}

#[test]
fn test_raised_irq_enters_vector() {
    // CLI ; NOP
    let mut bus = FlatBus::with_program(&[0x58, 0xEA]);
    let mut cpu = HuC6280::new();
    cpu.reset(&mut bus, &mut NoObserver);
    cpu.step(&mut bus, &mut NoObserver);

    cpu.raise_irq(IrqLines::IRQ2);
    cpu.step(&mut bus, &mut NoObserver);

    // Entry plus the handler's first instruction
    assert_eq!(cpu.state.pc, 0xE101);
    assert_eq!(cpu.instructions(), 2);
}

#[test]
fn test_instruction_hook_sees_handler_after_entry() {
    // CLI ; NOP ; NOP
    let mut bus = FlatBus::with_program(&[0x58, 0xEA, 0xEA]);
    let mut cpu = HuC6280::new();
    cpu.reset(&mut bus, &mut NoObserver);
    cpu.step(&mut bus, &mut NoObserver);
    cpu.hook_slot().install(HookMask::INSTRUCTION | HookMask::BRANCH);

    let mut recorder = Recorder::default();
    cpu.raise_irq(IrqLines::IRQ2);
    cpu.run(&mut bus, &mut recorder, 2);

    assert_eq!(recorder.branches, vec![(0xE001, 0xE100, Some(Vector::Irq2))]);
    assert_eq!(recorder.instructions, vec![0xE100, 0xE101]);
}
