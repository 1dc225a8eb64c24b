//! Mapper trait and shared storage helpers.
//!
//! A mapper sits between both console buses and the cartridge ROM/RAM chips:
//! it decodes CPU accesses in `$4020-$FFFF` and PPU accesses in
//! `$0000-$1FFF`, applies whatever banking registers the board carries, may
//! override nametable mirroring, and may drive a scanline-counted IRQ line.
//! The supported set is closed: mappers 0 (NROM), 1 (MMC1), 2 (UNROM),
//! 3 (CNROM), and 4 (MMC3).

use std::borrow::Cow;
use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::cartridge::header::{Header, Mirroring};
use crate::error::Error;

mod mapper0;
mod mapper1;
mod mapper2;
mod mapper3;
mod mapper4;

pub use mapper0::Mapper0;
pub use mapper1::Mapper1;
pub use mapper2::Mapper2;
pub use mapper3::Mapper3;
pub use mapper4::Mapper4;

/// Cartridge-side address translator and bank switcher.
pub trait Mapper: DynClone + Debug {
    /// Reads a byte for the CPU bus. Returns `None` when the address does not
    /// decode to cartridge hardware (the bus then sees open-bus/zero).
    fn cpu_read(&self, addr: u16) -> Option<u8>;

    /// Handles a CPU bus write (PRG RAM or bank-select registers).
    fn cpu_write(&mut self, addr: u16, data: u8);

    /// Reads a byte from CHR space for the PPU bus.
    fn ppu_read(&self, addr: u16) -> u8;

    /// Handles a PPU CHR-space write (CHR RAM boards only).
    fn ppu_write(&mut self, addr: u16, data: u8);

    /// Effective nametable mirroring, which banking registers may override.
    fn mirroring(&self) -> Mirroring;

    /// Scanline hook driven by the PPU once per rendered line.
    ///
    /// MMC3 clocks its IRQ counter here; the other boards ignore it.
    fn scanline(&mut self) {}

    /// Whether the mapper is currently asserting its IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Acknowledges a pending mapper IRQ.
    fn clear_irq(&mut self) {}

    /// Restores the power-on register state. ROM/RAM contents are preserved.
    fn reset(&mut self) {}

    /// Board name for diagnostics.
    fn name(&self) -> Cow<'static, str>;

    /// iNES mapper number.
    fn mapper_id(&self) -> u8;
}

dyn_clone::clone_trait_object!(Mapper);

/// Constructs the mapper named by the header, taking ownership of the ROM
/// sections. Unknown mapper numbers are a construction-time error; silently
/// booting the wrong board produces unrunnable state that is hard to diagnose
/// downstream.
pub fn create_mapper(
    header: &Header,
    prg_rom: Box<[u8]>,
    chr_rom: Box<[u8]>,
) -> Result<Box<dyn Mapper>, Error> {
    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(Mapper0::new(header, prg_rom, chr_rom)),
        1 => Box::new(Mapper1::new(header, prg_rom, chr_rom)),
        2 => Box::new(Mapper2::new(header, prg_rom, chr_rom)),
        3 => Box::new(Mapper3::new(header, prg_rom, chr_rom)),
        4 => Box::new(Mapper4::new(header, prg_rom, chr_rom)),
        id => return Err(Error::UnsupportedMapper { id }),
    };
    Ok(mapper)
}

/// High-level description of PPU-side CHR storage.
///
/// Boards expose either CHR ROM or CHR RAM to the PPU; wrapping the two cases
/// lets mappers share the address decoding instead of re-implementing it.
#[derive(Debug, Clone)]
pub enum ChrStorage {
    /// CHR is backed by read-only ROM data from the cartridge image.
    Rom(Box<[u8]>),
    /// CHR is backed by writable RAM located on the cartridge.
    Ram(Box<[u8]>),
}

impl ChrStorage {
    /// Selects ROM or RAM backing based on the header.
    pub fn from_header(header: &Header, chr_rom: Box<[u8]>) -> Self {
        if header.chr_rom_size > 0 {
            ChrStorage::Rom(chr_rom)
        } else {
            ChrStorage::Ram(vec![0u8; header.chr_ram_size.max(1)].into_boxed_slice())
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            ChrStorage::Rom(rom) => rom,
            ChrStorage::Ram(ram) => ram,
        }
    }

    /// Read a byte from CHR space, applying 8 KiB mirroring.
    pub fn read(&self, addr: u16) -> u8 {
        let bytes = self.bytes();
        if bytes.is_empty() {
            return 0;
        }
        bytes[(addr as usize & 0x1FFF) % bytes.len()]
    }

    /// Write a byte to CHR RAM; ignored for CHR ROM boards.
    pub fn write(&mut self, addr: u16, data: u8) {
        if let ChrStorage::Ram(ram) = self {
            if !ram.is_empty() {
                let len = ram.len();
                ram[(addr as usize & 0x1FFF) % len] = data;
            }
        }
    }

    /// Read a byte from an explicitly banked CHR window.
    ///
    /// `base` and `offset` form an absolute index into the CHR chip, wrapped
    /// to the underlying length. Used by boards with sub-8 KiB banking.
    pub fn read_indexed(&self, base: usize, offset: usize) -> u8 {
        let bytes = self.bytes();
        if bytes.is_empty() {
            return 0;
        }
        bytes[(base + offset) % bytes.len()]
    }

    /// Write a byte through an explicitly banked CHR window, if RAM backed.
    pub fn write_indexed(&mut self, base: usize, offset: usize, data: u8) {
        if let ChrStorage::Ram(ram) = self {
            if !ram.is_empty() {
                let len = ram.len();
                ram[(base + offset) % len] = data;
            }
        }
    }

    /// Returns a view of the underlying CHR bytes (tests and tools).
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes()
    }
}

/// PRG RAM size allocated for boards that expose `$6000-$7FFF`.
const PRG_RAM_SIZE: usize = 8 * 1024;

/// Allocates the 8 KiB PRG RAM window used by MMC1/MMC3 boards (and by many
/// homebrew NROM images, so NROM gets one too).
pub(crate) fn allocate_prg_ram() -> Box<[u8]> {
    vec![0u8; PRG_RAM_SIZE].into_boxed_slice()
}
