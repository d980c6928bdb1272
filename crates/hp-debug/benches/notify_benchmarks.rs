use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hp_core::config::Config;
use hp_cpu::{HuC6280, NoObserver};
use hp_debug::{AddressMode, BreakpointKind, Debugger};
use hp_machine::Machine;

fn criterion_config() -> Criterion {
    match std::env::var("HUPROBE_BENCH_PROFILE").as_deref() {
        Ok("ci") => Criterion::default()
            .warm_up_time(Duration::from_millis(150))
            .measurement_time(Duration::from_millis(400))
            .sample_size(20),
        _ => Criterion::default()
            .warm_up_time(Duration::from_secs(1))
            .measurement_time(Duration::from_secs(2))
            .sample_size(50),
    }
}

/// LDA $2000 ; STA $2001 ; ST1 #$00 ; INX ; BRA to start
fn machine() -> Machine {
    let program = [0xAD, 0x00, 0x20, 0x8D, 0x01, 0x20, 0x13, 0x00, 0xE8, 0x80, 0xF5];
    let mut image = vec![0xEA; 0x2000];
    image[..program.len()].copy_from_slice(&program);
    image[0x1FFE..].copy_from_slice(&0xE000u16.to_le_bytes());
    Machine::new(&image, &Config::default().system).expect("bench image")
}

fn setup(configure: impl FnOnce(&mut Debugger)) -> (HuC6280, Machine, Debugger) {
    let mut machine = machine();
    let mut cpu = HuC6280::new();
    cpu.reset(&mut machine, &mut NoObserver);
    let mut debugger = Debugger::new(&Config::default(), machine.depth(), cpu.hook_slot());
    configure(&mut debugger);
    (cpu, machine, debugger)
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_1000");

    let (mut cpu, mut machine, _) = setup(|_| {});
    group.bench_function("no_debugger", |b| {
        b.iter(|| black_box(cpu.run(&mut machine, &mut NoObserver, 1000)))
    });

    let (mut cpu, mut machine, mut debugger) = setup(|_| {});
    group.bench_function("debugger_idle", |b| {
        b.iter(|| black_box(cpu.run(&mut machine, &mut debugger, 1000)))
    });

    let (mut cpu, mut machine, mut debugger) = setup(|d| {
        d.add_breakpoint(BreakpointKind::Pc, 0x8000, 0x8000, AddressMode::Logical);
    });
    group.bench_function("pc_breakpoint_miss", |b| {
        b.iter(|| black_box(cpu.run(&mut machine, &mut debugger, 1000)))
    });

    let (mut cpu, mut machine, mut debugger) = setup(|d| {
        d.add_breakpoint(BreakpointKind::Read, 0x3000, 0x30FF, AddressMode::Logical);
        d.add_breakpoint(BreakpointKind::Write, 0x3000, 0x30FF, AddressMode::Logical);
        d.add_breakpoint(BreakpointKind::AuxWrite, 0x7000, 0x7FFF, AddressMode::Logical);
    });
    group.bench_function("range_breakpoints_miss", |b| {
        b.iter(|| black_box(cpu.run(&mut machine, &mut debugger, 1000)))
    });

    let (mut cpu, mut machine, mut debugger) = setup(|d| d.enable_branch_trace(true));
    group.bench_function("branch_trace", |b| {
        b.iter(|| black_box(cpu.run(&mut machine, &mut debugger, 1000)))
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_step
}
criterion_main!(benches);
