//! famicore-core: an NES emulation core.
//!
//! The crate models the console as four tightly coupled subsystems — the
//! 6502 [`cpu::Cpu`], the [`ppu::Ppu`], the [`apu::Apu`], and the
//! [`cartridge::Cartridge`] with its mapper — glued by a borrowed
//! [`bus::CpuBus`] view assembled per CPU step. A host shell owns
//! presentation: it calls [`Nes::step_one_frame`], reads
//! [`Nes::frame_buffer`], drains audio with [`Nes::drain_audio`], and feeds
//! input with [`Nes::set_buttons`].
//!
//! ```no_run
//! use famicore_core::{Nes, cartridge::Cartridge};
//!
//! let cart = Cartridge::from_file("game.nes")?;
//! let mut nes = Nes::new(cart);
//! while !nes.cpu.jammed() {
//!     nes.step_one_frame();
//!     let _pixels = nes.frame_buffer(); // 256x240, 0xAARRGGBB
//! }
//! # Ok::<(), famicore_core::error::Error>(())
//! ```

use crate::{
    apu::Apu,
    bus::cpu::CpuBus,
    cartridge::Cartridge,
    controller::{Button, Controller},
    cpu::{Cpu, CpuSnapshot},
    ppu::Ppu,
    ram::cpu as cpu_ram,
};

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod ppu;
pub mod ram;

/// Default host audio sample rate in Hz.
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// PPU dots per CPU cycle (NTSC).
const PPU_DOTS_PER_CPU_CYCLE: u32 = 3;

/// The whole console: owns every component and drives the clock.
///
/// One `step_one_frame` call repeatedly executes a CPU instruction, then
/// advances the APU by the consumed cycles and the PPU by three dots per
/// cycle, until the PPU signals the VBlank edge.
#[derive(Debug)]
pub struct Nes {
    pub cpu: Cpu,
    pub ppu: Ppu,
    pub apu: Apu,
    pub cartridge: Cartridge,
    ram: cpu_ram::Ram,
    controllers: [Controller; 2],
}

/// Builder for configuring and constructing a powered-on console.
#[derive(Debug, Clone)]
pub struct NesBuilder {
    sample_rate: u32,
}

impl NesBuilder {
    pub fn new() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Sets the host audio sample rate.
    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Builds the console around the inserted cartridge and applies the
    /// power-on reset.
    pub fn build(self, cartridge: Cartridge) -> Nes {
        let mut nes = Nes {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(self.sample_rate),
            cartridge,
            ram: cpu_ram::Ram::new(),
            controllers: [Controller::new(), Controller::new()],
        };
        nes.reset();
        nes
    }
}

impl Default for NesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! cpu_bus {
    ($nes:ident) => {
        CpuBus::new(
            &mut $nes.ram,
            &mut $nes.ppu,
            &mut $nes.apu,
            &mut $nes.cartridge,
            &mut $nes.controllers,
        )
    };
}

impl Nes {
    /// Creates a [`NesBuilder`] with defaults.
    pub fn builder() -> NesBuilder {
        NesBuilder::new()
    }

    /// Constructs a powered-on console with the default audio sample rate.
    pub fn new(cartridge: Cartridge) -> Self {
        Self::builder().build(cartridge)
    }

    /// Re-initializes RAM, PPU, APU, and mapper state, and reloads the CPU
    /// `PC` from the reset vector at `$FFFC/$FFFD`.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.apu.reset();
        self.cartridge.reset();
        let mut bus = cpu_bus!(self);
        self.cpu.reset(&mut bus);
    }

    /// Executes one CPU instruction and advances the APU and PPU in
    /// lockstep. Returns the CPU cycles consumed (including any DMA stall).
    pub fn step_instruction(&mut self) -> u32 {
        let (cycles, _) = self.step_clock();
        cycles
    }

    /// Runs the clock loop until the PPU completes the current frame.
    pub fn step_one_frame(&mut self) {
        loop {
            let (_, frame_complete) = self.step_clock();
            if frame_complete {
                break;
            }
        }
    }

    fn step_clock(&mut self) -> (u32, bool) {
        let cycles = {
            let mut bus = cpu_bus!(self);
            self.cpu.step(&mut bus)
        };

        self.apu.step(cycles);
        let frame_complete = self
            .ppu
            .step(cycles * PPU_DOTS_PER_CPU_CYCLE, &mut self.cartridge);

        // NMI raised during this window is sampled by the CPU at its next
        // instruction boundary.
        if self.ppu.take_nmi() {
            self.cpu.signal_nmi();
        }

        (cycles, frame_complete)
    }

    /// The rendered frame: 256x240 pixels in `0xAARRGGBB`.
    pub fn frame_buffer(&self) -> &[u32] {
        self.ppu.frame_buffer()
    }

    /// Moves all audio samples produced since the last drain into `out`.
    pub fn drain_audio(&mut self, out: &mut Vec<f32>) {
        self.apu.drain_samples(out);
    }

    /// Replaces a controller's button byte (bit 0 = A ... bit 7 = Right).
    pub fn set_buttons(&mut self, port: usize, state: u8) {
        if let Some(pad) = self.controllers.get_mut(port) {
            pad.set_state(state);
        }
    }

    /// Updates the pressed state of a single controller button.
    pub fn set_button(&mut self, port: usize, button: Button, pressed: bool) {
        if let Some(pad) = self.controllers.get_mut(port) {
            pad.set_button(button, pressed);
        }
    }

    /// Reads a byte through the CPU bus.
    ///
    /// Debug/test helper: registers with read side effects (`$2002`,
    /// `$2007`, `$4015`, `$4016`) observe them as a real read would.
    pub fn peek_cpu_byte(&mut self, addr: u16) -> u8 {
        let mut bus = cpu_bus!(self);
        bus.read(addr)
    }

    /// Snapshot of the current CPU registers for tracing/debugging.
    pub fn cpu_snapshot(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    /// Formats the instruction at `PC` as a reference-log trace line.
    pub fn trace_line(&mut self) -> cpu::trace::TraceLine {
        let snapshot = self.cpu.snapshot();
        let bytes = [
            self.peek_cpu_byte(snapshot.pc),
            self.peek_cpu_byte(snapshot.pc.wrapping_add(1)),
            self.peek_cpu_byte(snapshot.pc.wrapping_add(2)),
        ];
        cpu::trace::TraceLine::new(snapshot, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nrom_with_program(program: &[u8]) -> Cartridge {
        let mut rom = vec![
            b'N', b'E', b'S', 0x1A, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let mut bank = vec![0u8; 16 * 1024];
        bank[..program.len()].copy_from_slice(program);
        bank[0x3FFC] = 0x00;
        bank[0x3FFD] = 0x80;
        rom.extend(bank);
        Cartridge::new(&rom).expect("test cartridge")
    }

    #[test]
    fn power_on_loads_reset_vector() {
        let nes = Nes::new(nrom_with_program(&[0xEA]));
        assert_eq!(nes.cpu.pc, 0x8000);
        assert_eq!(nes.cpu.s, 0xFD);
    }

    #[test]
    fn frame_stepping_advances_the_ppu_frame_counter() {
        let mut nes = Nes::new(nrom_with_program(&[0x4C, 0x00, 0x80])); // JMP $8000
        assert_eq!(nes.ppu.frame_count(), 0);
        nes.step_one_frame();
        nes.step_one_frame();
        assert!(nes.ppu.frame_count() >= 1);
    }

    #[test]
    fn reset_restores_ram_and_vector() {
        let mut nes = Nes::new(nrom_with_program(&[
            0xA9, 0x55, // LDA #$55
            0x85, 0x10, // STA $10
        ]));
        nes.step_instruction();
        nes.step_instruction();
        assert_eq!(nes.peek_cpu_byte(0x0010), 0x55);

        nes.reset();
        assert_eq!(nes.peek_cpu_byte(0x0010), 0x00);
        assert_eq!(nes.cpu.pc, 0x8000);
    }

    #[test]
    fn builder_applies_sample_rate() {
        let mut nes = Nes::builder()
            .sample_rate(96_000)
            .build(nrom_with_program(&[0x4C, 0x00, 0x80]));
        nes.step_one_frame();
        let mut samples = Vec::new();
        nes.drain_audio(&mut samples);
        // The power-on frame (241 scanlines to the VBlank edge) at 96 kHz.
        assert!((1400..=1600).contains(&samples.len()), "{}", samples.len());
    }

    #[test]
    fn controller_bytes_reach_the_serial_port() {
        let mut nes = Nes::new(nrom_with_program(&[0xEA]));
        nes.set_buttons(0, 0b0000_1001); // A + Start
        nes.peek_cpu_byte(0x4016); // harmless pre-strobe read

        // Strobe through the bus, then read three bits.
        let mut bus = CpuBus::new(
            &mut nes.ram,
            &mut nes.ppu,
            &mut nes.apu,
            &mut nes.cartridge,
            &mut nes.controllers,
        );
        bus.write(0x4016, 1);
        bus.write(0x4016, 0);
        assert_eq!(bus.read(0x4016) & 1, 1); // A
        assert_eq!(bus.read(0x4016) & 1, 0); // B
        assert_eq!(bus.read(0x4016) & 1, 0); // Select
        assert_eq!(bus.read(0x4016) & 1, 1); // Start
    }
}
