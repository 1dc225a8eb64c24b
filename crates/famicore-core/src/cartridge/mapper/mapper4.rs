//! Mapper 4 (MMC3).
//!
//! Eight 1/2 KiB CHR windows and four 8 KiB PRG windows are indirected
//! through an 8-entry bank register file. `$8000` selects which register the
//! next `$8001` write fills and carries the PRG swap mode (bit 6) and CHR
//! A12 inversion (bit 7); `$A000` controls mirroring; `$C000/$C001` program
//! the IRQ latch and reload strobe; `$E000/$E001` disable/enable the IRQ.
//!
//! The IRQ counter decrements once per rendered scanline through the PPU's
//! `scanline()` hook (standing in for A12 rising-edge detection), reloading
//! from the latch on underflow or after a `$C001` strobe, and asserting the
//! IRQ line when it reaches zero while enabled.

use std::borrow::Cow;

use crate::{
    cartridge::{
        header::{Header, Mirroring},
        mapper::{ChrStorage, Mapper, allocate_prg_ram},
    },
    memory::cpu as cpu_mem,
};

/// PRG-ROM bank size exposed to the CPU (8 KiB).
const PRG_BANK_SIZE_8K: usize = 8 * 1024;
/// CHR banking granularity (1 KiB).
const CHR_BANK_SIZE_1K: usize = 1024;

/// CPU-visible MMC3 register set: even/odd addresses in each 8 KiB window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mmc3Register {
    BankSelect,
    BankData,
    Mirroring,
    PrgRamProtect,
    IrqLatch,
    IrqReload,
    IrqDisable,
    IrqEnable,
}

impl Mmc3Register {
    fn from_addr(addr: u16) -> Option<Self> {
        use Mmc3Register::*;

        let odd = addr & 1 != 0;
        match addr {
            0x8000..=0x9FFF => Some(if odd { BankData } else { BankSelect }),
            0xA000..=0xBFFF => Some(if odd { PrgRamProtect } else { Mirroring }),
            0xC000..=0xDFFF => Some(if odd { IrqReload } else { IrqLatch }),
            0xE000..=0xFFFF => Some(if odd { IrqEnable } else { IrqDisable }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mapper4 {
    prg_rom: Box<[u8]>,
    prg_ram: Box<[u8]>,
    chr: ChrStorage,

    prg_bank_count: usize,
    base_mirroring: Mirroring,
    mirroring: Mirroring,

    /// Bank select register ($8000): bits 0-2 target register, bit 6 PRG
    /// mode, bit 7 CHR A12 inversion.
    bank_select: u8,
    /// Bank data registers: 0-5 control CHR, 6-7 the switchable PRG windows.
    bank_regs: [u8; 8],

    prg_ram_enable: bool,
    prg_ram_write_protect: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
}

impl Mapper4 {
    pub fn new(header: &Header, prg_rom: Box<[u8]>, chr_rom: Box<[u8]>) -> Self {
        let prg_bank_count = (prg_rom.len() / PRG_BANK_SIZE_8K).max(1);
        Self {
            prg_rom,
            prg_ram: allocate_prg_ram(),
            chr: ChrStorage::from_header(header, chr_rom),
            prg_bank_count,
            base_mirroring: header.mirroring,
            mirroring: header.mirroring,
            bank_select: 0,
            bank_regs: [0; 8],
            prg_ram_enable: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
        }
    }

    #[inline]
    fn chr_invert(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    /// false: swap at `$8000`; true: swap at `$C000`.
    #[inline]
    fn prg_swap_at_c000(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    fn read_prg_rom(&self, addr: u16) -> u8 {
        if self.prg_rom.is_empty() {
            return 0;
        }

        let last = self.prg_bank_count - 1;
        let second_last = self.prg_bank_count.saturating_sub(2);
        let select = |reg: usize| self.bank_regs[reg] as usize % self.prg_bank_count;

        let bank = match (addr, self.prg_swap_at_c000()) {
            (0x8000..=0x9FFF, false) => select(6),
            (0x8000..=0x9FFF, true) => second_last,
            (0xA000..=0xBFFF, _) => select(7),
            (0xC000..=0xDFFF, false) => second_last,
            (0xC000..=0xDFFF, true) => select(6),
            _ => last,
        };

        let offset = (addr as usize - cpu_mem::PRG_ROM_START as usize) & (PRG_BANK_SIZE_8K - 1);
        let idx = bank * PRG_BANK_SIZE_8K + offset;
        self.prg_rom.get(idx).copied().unwrap_or(0)
    }

    /// Resolves a CHR address to a (bank base, inner offset) pair, applying
    /// the current banking mode and A12 inversion.
    fn chr_index(&self, addr: u16) -> (usize, usize) {
        let a = (addr & 0x1FFF) as usize;
        // R0/R1 are 2 KiB windows: their low bank bit is forced to zero.
        let wide = |reg: usize| (self.bank_regs[reg] & !1) as usize * CHR_BANK_SIZE_1K;
        let narrow = |reg: usize| self.bank_regs[reg] as usize * CHR_BANK_SIZE_1K;

        // Normal layout: R0/R1 cover $0000-$0FFF, R2-R5 cover $1000-$1FFF.
        // Inversion swaps the two halves.
        let half = a >> 12;
        let inverted = self.chr_invert();
        match (half == 1) ^ inverted {
            false => {
                let window = (a >> 11) & 1;
                (wide(window), a & 0x07FF)
            }
            true => {
                let window = 2 + ((a >> 10) & 3);
                (narrow(window), a & 0x03FF)
            }
        }
    }

    fn clock_irq_counter(&mut self) {
        if self.irq_reload || self.irq_counter == 0 {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }

    fn prg_ram_readable(&self) -> bool {
        !self.prg_ram.is_empty() && self.prg_ram_enable
    }
}

impl Mapper for Mapper4 {
    fn cpu_read(&self, addr: u16) -> Option<u8> {
        match addr {
            cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END => {
                if !self.prg_ram_readable() {
                    return None;
                }
                let idx = (addr - cpu_mem::PRG_RAM_START) as usize % self.prg_ram.len();
                Some(self.prg_ram[idx])
            }
            cpu_mem::PRG_ROM_START..=cpu_mem::CPU_ADDR_END => Some(self.read_prg_rom(addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, addr: u16, data: u8) {
        if (cpu_mem::PRG_RAM_START..=cpu_mem::PRG_RAM_END).contains(&addr) {
            if self.prg_ram_readable() && !self.prg_ram_write_protect {
                let idx = (addr - cpu_mem::PRG_RAM_START) as usize % self.prg_ram.len();
                self.prg_ram[idx] = data;
            }
            return;
        }

        let Some(reg) = Mmc3Register::from_addr(addr) else {
            return;
        };

        match reg {
            Mmc3Register::BankSelect => self.bank_select = data,
            Mmc3Register::BankData => {
                let index = (self.bank_select & 0x07) as usize;
                self.bank_regs[index] = data;
            }
            Mmc3Register::Mirroring => {
                // Four-screen boards ignore the mirroring register entirely.
                if self.base_mirroring != Mirroring::FourScreen {
                    self.mirroring = if data & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            Mmc3Register::PrgRamProtect => {
                self.prg_ram_enable = data & 0x80 != 0;
                self.prg_ram_write_protect = data & 0x40 != 0;
            }
            Mmc3Register::IrqLatch => self.irq_latch = data,
            Mmc3Register::IrqReload => self.irq_reload = true,
            Mmc3Register::IrqDisable => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            Mmc3Register::IrqEnable => self.irq_enabled = true,
        }
    }

    fn ppu_read(&self, addr: u16) -> u8 {
        let (base, offset) = self.chr_index(addr);
        self.chr.read_indexed(base, offset)
    }

    fn ppu_write(&mut self, addr: u16, data: u8) {
        let (base, offset) = self.chr_index(addr);
        self.chr.write_indexed(base, offset, data);
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn scanline(&mut self) {
        self.clock_irq_counter();
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    fn reset(&mut self) {
        self.bank_select = 0;
        self.bank_regs = [0; 8];
        self.prg_ram_enable = true;
        self.prg_ram_write_protect = false;
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
        self.mirroring = self.base_mirroring;
    }

    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("MMC3")
    }

    fn mapper_id(&self) -> u8 {
        4
    }
}
