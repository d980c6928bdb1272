//! CD system-card call forwarding
//!
//! When BIOS logging is on and the CPU is about to execute inside the system
//! card's jump table, the debugger hands a [`BiosCall`] to a [`BiosCallLog`]
//! which turns it into text for the host's log sink.

use std::ops::RangeInclusive;

use hp_core::bios_debug;

/// Jump-table window of the CD system card
pub const BIOS_WINDOW: RangeInclusive<u16> = 0xE000..=0xE07B;

/// Logical address of the _AL.._DH argument block in zero page
pub const ARG_BASE: u16 = 0x20F8;

/// Host log sink taking `(kind, text)`
pub type LogSink = Box<dyn FnMut(&str, &str)>;

const CD_SEEK: u16 = 0xE00C;
const CD_READ: u16 = 0xE009;
const CD_SUBQ: u16 = 0xE01E;

static ENTRY_POINTS: [(u16, &str); 29] = [
    (0xE000, "CD_BOOT"),
    (0xE003, "CD_RESET"),
    (0xE006, "CD_BASE"),
    (CD_READ, "CD_READ"),
    (CD_SEEK, "CD_SEEK"),
    (0xE00F, "CD_EXEC"),
    (0xE012, "CD_PLAY"),
    (0xE015, "CD_SEARCH"),
    (0xE018, "CD_PAUSE"),
    (0xE01B, "CD_STAT"),
    (CD_SUBQ, "CD_SUBQ"),
    (0xE021, "CD_DINFO"),
    (0xE024, "CD_CONTNTS"),
    (0xE027, "CD_SUBRD"),
    (0xE02A, "CD_PCMRD"),
    (0xE02D, "CD_FADE"),
    (0xE030, "AD_RESET"),
    (0xE033, "AD_TRANS"),
    (0xE036, "AD_READ"),
    (0xE039, "AD_WRITE"),
    (0xE03C, "AD_PLAY"),
    (0xE03F, "AD_CPLAY"),
    (0xE042, "AD_STOP"),
    (0xE045, "AD_STAT"),
    (0xE05A, "EX_GETVER"),
    (0xE05D, "EX_SETVEC"),
    (0xE060, "EX_GETFNT"),
    (0xE063, "EX_JOYSNS"),
    (0xE07B, "EX_VSYNC"),
];

/// Name of the system-card entry point at `pc`
pub fn entry_name(pc: u16) -> Option<&'static str> {
    ENTRY_POINTS.iter().find(|(addr, _)| *addr == pc).map(|(_, name)| *name)
}

/// A system-card call about to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosCall {
    /// Entry point being executed
    pub pc: u16,
    /// PC of the instruction before it
    pub caller: u16,
    /// _AL, _AH, _BL, _BH, _CL, _CH, _DL, _DH
    pub args: [u8; 8],
    pub mpr: [u8; 8],
    pub timestamp: u64,
}

impl BiosCall {
    pub fn al(&self) -> u8 {
        self.args[0]
    }
    pub fn bl(&self) -> u8 {
        self.args[2]
    }
    pub fn bh(&self) -> u8 {
        self.args[3]
    }
    pub fn cl(&self) -> u8 {
        self.args[4]
    }
    pub fn ch(&self) -> u8 {
        self.args[5]
    }
    pub fn dl(&self) -> u8 {
        self.args[6]
    }
    pub fn dh(&self) -> u8 {
        self.args[7]
    }

    /// _BX as a logical address
    pub fn bx(&self) -> u16 {
        u16::from_le_bytes([self.bl(), self.bh()])
    }

    /// Bank mapped at a logical address at call time
    pub fn bank_of(&self, logical: u16) -> u8 {
        self.mpr[(logical >> 13) as usize]
    }
}

/// Turns system-card calls into log text
pub trait BiosCallLog {
    fn log_call(&mut self, call: &BiosCall, sink: &mut dyn FnMut(&str, &str));
}

/// Names every entry point and decodes the arguments of the common CD calls
#[derive(Debug, Default, Clone, Copy)]
pub struct SyscardCallNames;

impl SyscardCallNames {
    fn describe(call: &BiosCall, name: &str) -> String {
        let sector = format!("{:02X}{:02X}{:02X}", call.cl(), call.ch(), call.dl());
        match call.pc {
            CD_SEEK => format!("Call CD_SEEK from ${:04X}, DEST={}", call.caller, sector),
            CD_READ => {
                let dest = match call.dh() {
                    1 => format!("LOC ${:04X} (Bank ${:02X})", call.bx(), call.bank_of(call.bx())),
                    0xFE | 0xFF => format!("VRAM ${:04X}", call.bx()),
                    2..=6 => format!("BANK ${:02X}", call.bl()),
                    dh => format!("bad DH ${:02X}", dh),
                };
                format!(
                    "Call CD_READ from ${:04X}, SRC={}, DEST={}, LEN=${:02X}",
                    call.caller,
                    sector,
                    dest,
                    call.al()
                )
            }
            CD_SUBQ => format!(
                "Call CD_SUBQ from ${:04X}, Buffer addr = ${:04X} (Bank ${:02X})",
                call.caller,
                call.bx(),
                call.bank_of(call.bx())
            ),
            _ => format!("Call {} from ${:04X}", name, call.caller),
        }
    }
}

impl BiosCallLog for SyscardCallNames {
    fn log_call(&mut self, call: &BiosCall, sink: &mut dyn FnMut(&str, &str)) {
        let Some(name) = entry_name(call.pc) else {
            return;
        };
        let text = Self::describe(call, name);
        bios_debug!("{}", text);
        sink("BIOS", &text);
    }
}
