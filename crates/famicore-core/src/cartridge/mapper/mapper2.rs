//! Mapper 2 (UNROM).
//!
//! PRG banking only: `$8000-$BFFF` selects one of the 16 KiB PRG banks via
//! any write to `$8000-$FFFF`, while `$C000-$FFFF` is hardwired to the last
//! bank so the vectors stay put. CHR is always 8 KiB of RAM.

use std::borrow::Cow;

use crate::{
    cartridge::{
        header::{Header, Mirroring, PRG_BANK_SIZE},
        mapper::{ChrStorage, Mapper},
    },
    memory::cpu as cpu_mem,
};

#[derive(Debug, Clone)]
pub struct Mapper2 {
    prg_rom: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
    /// Number of 16 KiB PRG banks.
    prg_bank_count: usize,
    /// Bank mapped at `$8000-$BFFF`.
    prg_bank: usize,
}

impl Mapper2 {
    pub fn new(header: &Header, prg_rom: Box<[u8]>, chr_rom: Box<[u8]>) -> Self {
        let prg_bank_count = (prg_rom.len() / PRG_BANK_SIZE).max(1);
        Self {
            prg_rom,
            chr: ChrStorage::from_header(header, chr_rom),
            mirroring: header.mirroring,
            prg_bank_count,
            prg_bank: 0,
        }
    }

    fn read_prg_rom(&self, addr: u16) -> u8 {
        if self.prg_rom.is_empty() {
            return 0;
        }
        let bank = if addr < 0xC000 {
            self.prg_bank
        } else {
            self.prg_bank_count - 1
        };
        let offset = (addr as usize - cpu_mem::PRG_ROM_START as usize) & (PRG_BANK_SIZE - 1);
        let idx = (bank * PRG_BANK_SIZE + offset) % self.prg_rom.len();
        self.prg_rom[idx]
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => Some(self.read_prg_rom(addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if addr >= cpu_mem::PRG_ROM_START {
            self.prg_bank = data as usize % self.prg_bank_count;
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        self.chr.read(addr)
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        self.chr.write(addr, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("UNROM")
    }

    fn mapper_id(&self) -> u8 {
        2
    }
}
