//! Mapper 3 (CNROM).
//!
//! The mirror image of UNROM: PRG is fixed (16 or 32 KiB, NROM-style
//! mirroring for the small case) and any write to `$8000-$FFFF` selects which
//! 8 KiB CHR ROM bank the PPU sees.

use std::borrow::Cow;

use crate::{
    cartridge::{
        header::{CHR_BANK_SIZE, Header, Mirroring},
        mapper::{ChrStorage, Mapper},
    },
    memory::cpu as cpu_mem,
};

#[derive(Debug, Clone)]
pub struct Mapper3 {
    prg_rom: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
    /// Number of 8 KiB CHR banks.
    chr_bank_count: usize,
    /// Currently selected CHR bank.
    chr_bank: usize,
}

impl Mapper3 {
    pub fn new(header: &Header, prg_rom: Box<[u8]>, chr_rom: Box<[u8]>) -> Self {
        let chr_bank_count = (chr_rom.len() / CHR_BANK_SIZE).max(1);
        Self {
            prg_rom,
            chr: ChrStorage::from_header(header, chr_rom),
            mirroring: header.mirroring,
            chr_bank_count,
            chr_bank: 0,
        }
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => {
                if self.prg_rom.is_empty() {
                    return Some(0);
                }
                let idx = (addr - cpu_mem::PRG_ROM_START) as usize % self.prg_rom.len();
                Some(self.prg_rom[idx])
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if addr >= cpu_mem::PRG_ROM_START {
            self.chr_bank = data as usize % self.chr_bank_count;
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr
            .read_indexed(self.chr_bank * CHR_BANK_SIZE, addr as usize & 0x1FFF)
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr
            .write_indexed(self.chr_bank * CHR_BANK_SIZE, addr as usize & 0x1FFF, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("CNROM")
    }

    fn mapper_id(&self) -> u8 {
        3
    }
}
