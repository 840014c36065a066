use dotboy_core::GameBoy;
use dotboy_core::cartridge::Cartridge;

pub const ROM_SIZE: usize = 0x8000;

/// A flat 32 KiB ROM with `program` placed at the entry point, 0x0100.
#[allow(dead_code)]
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    rom
}

#[allow(dead_code)]
pub fn gameboy_with_program(program: &[u8]) -> GameBoy {
    gameboy_with_rom(rom_with_program(program))
}

#[allow(dead_code)]
pub fn gameboy_with_rom(rom: Vec<u8>) -> GameBoy {
    let mut gb = GameBoy::new();
    gb.load_cart(Cartridge::load(rom).expect("valid ROM image"));
    gb
}

/// Step until PC reaches `pc`, bounded by `max_steps`. Returns whether the
/// target was hit.
#[allow(dead_code)]
pub fn run_until_pc(gb: &mut GameBoy, pc: u16, max_steps: usize) -> bool {
    for _ in 0..max_steps {
        if gb.cpu.pc == pc {
            return true;
        }
        gb.step();
    }
    gb.cpu.pc == pc
}

/// Scan serial output for a Blargg-style result marker, tracking how far
/// previous calls already looked.
#[allow(dead_code)]
pub fn serial_contains_result(serial: &[u8], checked_up_to: &mut usize) -> bool {
    const PASSED: &[u8] = b"Passed";
    const FAILED: &[u8] = b"Failed";

    let max_marker_len = PASSED.len().max(FAILED.len());
    let lookbehind = max_marker_len.saturating_sub(1);
    let start = checked_up_to.saturating_sub(lookbehind).min(serial.len());
    let window = &serial[start..];

    let found = window.windows(PASSED.len()).any(|chunk| chunk == PASSED)
        || window.windows(FAILED.len()).any(|chunk| chunk == FAILED);

    *checked_up_to = serial.len();
    found
}
