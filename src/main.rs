//! huprobe - HuC6280 debugger core
//!
//! Runs a HuCard image under the debugger, printing every notification and the
//! branch trace on exit.
//!
//! Usage: huprobe <rom> [--break <hex>]... [--watch <hex>]... [--steps <n>]

use std::env;
use std::process;

use anyhow::{bail, Context, Result};
use hp_core::config::Config;
use hp_cpu::{HuC6280, IrqLines};
use hp_debug::{AddressMode, BreakpointKind, Debugger};
use hp_machine::Machine;

const DEFAULT_STEPS: u64 = 100_000;

struct Args {
    rom: String,
    breaks: Vec<u16>,
    watches: Vec<u16>,
    steps: u64,
}

fn parse_hex(value: &str) -> Result<u16> {
    let digits = value.trim_start_matches("0x").trim_start_matches('$');
    u16::from_str_radix(digits, 16).with_context(|| format!("invalid address '{}'", value))
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut rom = None;
    let mut breaks = Vec::new();
    let mut watches = Vec::new();
    let mut steps = DEFAULT_STEPS;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--break" => breaks.push(parse_hex(&args.next().context("--break needs an address")?)?),
            "--watch" => watches.push(parse_hex(&args.next().context("--watch needs an address")?)?),
            "--steps" => {
                let value = args.next().context("--steps needs a count")?;
                steps = value.parse().with_context(|| format!("invalid step count '{}'", value))?;
            }
            _ if arg.starts_with("--") => bail!("unknown option {}", arg),
            _ => rom = Some(arg),
        }
    }

    Ok(Args {
        rom: rom.context("usage: huprobe <rom> [--break <hex>]... [--watch <hex>]... [--steps <n>]")?,
        breaks,
        watches,
        steps,
    })
}

fn run(args: Args) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    hp_core::logging::init(&config);
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting huprobe on {}", args.rom);

    let mut machine = Machine::load(&args.rom, &config.system)
        .with_context(|| format!("failed to load ROM {}", args.rom))?;
    let mut cpu = HuC6280::new();
    let mut debugger = Debugger::new(&config, machine.depth(), cpu.hook_slot());

    debugger.enable_branch_trace(true);
    for pc in &args.breaks {
        debugger.add_breakpoint(BreakpointKind::Pc, *pc as u32, *pc as u32, AddressMode::Logical);
    }
    for addr in &args.watches {
        debugger.add_breakpoint(BreakpointKind::Write, *addr as u32, *addr as u32, AddressMode::Logical);
    }
    debugger.set_callback(
        |ctx, pc, found| {
            let cpu = ctx.cpu();
            println!(
                "{} PC={:04X} A={:02X} X={:02X} Y={:02X} S={:02X} P={:02X}",
                if found { "break" } else { "step " },
                pc,
                cpu.a,
                cpu.x,
                cpu.y,
                cpu.s,
                cpu.p
            );
        },
        false,
    );

    cpu.reset(&mut machine, &mut debugger);

    for _ in 0..args.steps {
        cpu.step(&mut machine, &mut debugger);
        // One report per match
        debugger.reset_continuous();

        machine.sync(cpu.state.timestamp);
        let lines = machine.irq_lines();
        cpu.lower_irq(IrqLines::IRQ1 - lines);
        cpu.raise_irq(lines);
    }

    println!("Branch trace ({} instructions):", cpu.instructions());
    for record in debugger.branch_trace() {
        println!(
            "  {} -> {} {} x{}",
            record.from,
            record.to,
            record.code.unwrap_or(' '),
            record.count
        );
    }

    Ok(())
}

fn main() {
    let result = parse_args().and_then(run);
    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
