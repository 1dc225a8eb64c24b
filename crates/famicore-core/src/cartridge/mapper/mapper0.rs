//! Mapper 0 (NROM).
//!
//! The launch-era board with no banking at all: the CPU sees the whole PRG
//! ROM at `$8000-$FFFF` (a 16 KiB image is mirrored into the upper half) and
//! the PPU sees the whole 8 KiB CHR chip. We also provide the conventional
//! 8 KiB PRG RAM window at `$6000-$7FFF` that homebrew images expect.

use std::borrow::Cow;

use crate::{
    cartridge::{
        header::{Header, Mirroring},
        mapper::{ChrStorage, Mapper, allocate_prg_ram},
    },
    memory::cpu as cpu_mem,
};

#[derive(Debug, Clone)]
pub struct Mapper0 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,
    mirroring: Mirroring,
}

impl Mapper0 {
    pub fn new(header: &Header, prg_rom: Box<[u8]>, chr_rom: Box<[u8]>) -> Self {
        Self {
            prg_rom,
            prg_ram: allocate_prg_ram(),
            chr: ChrStorage::from_header(header, chr_rom),
            mirroring: header.mirroring,
        }
    }

    fn read_prg_rom(&self, addr: u16) -> u8 {
        if self.prg_rom.is_empty() {
            return 0;
        }
        // The modulo folds NROM-128 images: a 16 KiB ROM repeats at $C000.
        let idx = (addr - cpu_mem::PRG_ROM_START) as usize % self.prg_rom.len();
        self.prg_rom[idx]
    }
}

impl Mapper for Mapper0 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                let idx = (addr - cpu_mem::PRG_RAM_START) as usize % self.prg_ram.len();
                Some(self.prg_ram[idx])
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => Some(self.read_prg_rom(addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if (cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END).contains(&addr) {
            let idx = (addr - cpu_mem::PRG_RAM_START) as usize % self.prg_ram.len();
            self.prg_ram[idx] = data;
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

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("NROM")
    }

    fn mapper_id(&self) -> u8 {
        0
    }
}
