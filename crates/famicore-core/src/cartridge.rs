use std::{fs, path::Path};

use tracing::debug;

use crate::{
    cartridge::{
        header::{Header, Mirroring, NES_HEADER_LEN, TRAINER_LEN},
        mapper::{Mapper, create_mapper},
    },
    error::Error,
};

pub mod header;
pub mod mapper;

/// Parsed NES cartridge: header metadata plus the mapper that owns the ROM
/// and RAM chips and performs all bus-address translation.
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: Header,
    mapper: Box<dyn Mapper>,
}

impl Cartridge {
    /// Parse a cartridge from an in-memory iNES image.
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let header = Header::parse(bytes)?;

        let mut cursor = NES_HEADER_LEN;
        if header.trainer_present {
            // The 512-byte trainer is legacy copier baggage; skip it.
            section(bytes, &mut cursor, TRAINER_LEN, "trainer")?;
        }

        let prg_rom = section(bytes, &mut cursor, header.prg_rom_size, "PRG ROM")?;
        let chr_rom = section(bytes, &mut cursor, header.chr_rom_size, "CHR ROM")?;

        let mapper = create_mapper(&header, prg_rom, chr_rom)?;
        debug!(
            mapper = %mapper.name(),
            prg_kib = header.prg_rom_size / 1024,
            chr_kib = header.chr_rom_size / 1024,
            mirroring = ?header.mirroring,
            "cartridge loaded"
        );

        Ok(Self { header, mapper })
    }

    /// Load and parse a cartridge directly from disk.
    pub fn from_file<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let bytes = fs::read(path)?;
        Self::new(&bytes)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reads a byte for the CPU bus (`$4020-$FFFF`).
    #[inline]
    pub fn cpu_read(&self, addr: u16) -> u8 {
        self.mapper.cpu_read(addr).unwrap_or(0)
    }

    /// Routes a CPU bus write to PRG RAM or the banking registers.
    #[inline]
    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        self.mapper.cpu_write(addr, data);
    }

    /// Reads a byte from CHR space for the PPU.
    #[inline]
    pub fn ppu_read(&self, addr: u16) -> u8 {
        self.mapper.ppu_read(addr)
    }

    /// Writes a byte to CHR space (CHR RAM boards).
    #[inline]
    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        self.mapper.ppu_write(addr, data);
    }

    /// Effective nametable mirroring after any mapper override.
    #[inline]
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    /// Per-scanline hook for mappers with scanline-counted IRQs.
    #[inline]
    pub fn scanline(&mut self) {
        self.mapper.scanline();
    }

    /// Whether the mapper is asserting its IRQ line.
    #[inline]
    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    /// Acknowledges a pending mapper IRQ.
    #[inline]
    pub fn clear_irq(&mut self) {
        self.mapper.clear_irq();
    }

    /// Restores mapper registers to their power-on state.
    pub fn reset(&mut self) {
        self.mapper.reset();
    }
}

fn section(
    bytes: &[u8],
    cursor: &mut usize,
    len: usize,
    name: &'static str,
) -> Result<Box<[u8]>, Error> {
    if len == 0 {
        return Ok(Box::new([]));
    }

    let missing = || Error::SectionTooShort {
        section: name,
        expected: len,
        actual: bytes.len().saturating_sub(*cursor),
    };

    let end = cursor.checked_add(len).ok_or_else(missing)?;
    let slice = bytes.get(*cursor..end).ok_or_else(missing)?;
    *cursor = end;
    Ok(slice.into())
}
