use std::path::Path;

use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::Cpu,
    input::Button,
    mmu::Mmu,
};

/// T-cycles per frame: 144 drawn lines plus 10 VBlank lines at 456 each.
pub const FRAME_CYCLES: u32 = 70_224;

/// The whole machine: CPU plus the bus that owns everything else.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    /// T-cycles the previous `step_frame` ran past the frame boundary.
    frame_overshoot: u32,
}

impl GameBoy {
    /// A Game Boy in the DMG post-boot state, with no cartridge inserted.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
            frame_overshoot: 0,
        }
    }

    pub fn load_rom<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CartridgeError> {
        let cart = Cartridge::from_file(path)?;
        self.mmu.load_cart(cart);
        Ok(())
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Reset to the post-boot state, preserving the loaded cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        self.frame_overshoot = 0;
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
    }

    /// Run one CPU unit of work, then advance the PPU, timer, and APU by
    /// the T-cycles it consumed.
    pub fn step(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.mmu);
        self.mmu.tick(cycles);
        cycles
    }

    /// Run the stepping loop for one frame's worth of T-cycles. The
    /// overshoot past the 70,224 boundary carries into the next call, so
    /// pacing averages out exactly.
    pub fn step_frame(&mut self) {
        let mut cycles = self.frame_overshoot;
        while cycles < FRAME_CYCLES {
            cycles += self.step();
        }
        self.frame_overshoot = cycles - FRAME_CYCLES;
    }

    /// The 160x144 ARGB framebuffer, valid until the next step.
    pub fn framebuffer(&self) -> &[u32; 160 * 144] {
        self.mmu.ppu.framebuffer()
    }

    /// Host-facing button interface. Ids: A=0, B=1, Select=2, Start=3,
    /// Right=4, Left=5, Up=6, Down=7. Out-of-range ids are ignored.
    pub fn set_button_state(&mut self, id: u8, pressed: bool) {
        if let Some(button) = Button::from_id(id) {
            self.mmu
                .input
                .set_button(button, pressed, &mut self.mmu.if_reg);
        }
    }

    /// Consume and return bytes the guest wrote to the serial port since
    /// the last call. Test ROMs report "Passed"/"Failed" through here.
    pub fn take_serial_bytes(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
