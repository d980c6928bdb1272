//! PC Engine physical memory map constants

/// Size of one MPR bank (8 KiB)
pub const BANK_SIZE: u32 = 0x2000;

/// Last bank decoded as HuCard ROM
pub const ROM_LAST_BANK: u8 = 0x7F;
/// Maximum HuCard image size (128 banks)
pub const ROM_MAX_SIZE: usize = 0x10_0000;
/// Copier header some dumps carry in front of the image
pub const ROM_HEADER_SIZE: usize = 0x200;

/// First work RAM bank
pub const RAM_FIRST_BANK: u8 = 0xF8;
/// Last work RAM bank (the 8 KiB mirrors through F8-FB)
pub const RAM_LAST_BANK: u8 = 0xFB;
/// Work RAM size (8 KiB)
pub const RAM_SIZE: usize = 0x2000;

/// Hardware I/O bank
pub const IO_BANK: u8 = 0xFF;

/// VDC port window base
pub const VDC_BASE: u32 = 0x1F_E000;
/// VDC port window size
pub const VDC_SIZE: u32 = 0x400;

/// VRAM size in 16-bit words
pub const VRAM_WORDS: usize = 0x8000;

/// Master clocks per scanline
pub const LINE_CLOCKS: u64 = 1365;
/// Scanlines per frame
pub const LINES_PER_FRAME: u32 = 263;
/// First scanline of vertical blanking
pub const VBLANK_LINE: u32 = 242;
