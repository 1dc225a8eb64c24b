//! Shared definitions for the NES memory map.
//!
//! Centralizing address-related constants keeps the hardware layout in one
//! location, prevents magic numbers from sneaking into other modules, and
//! makes it easier to reference the original console documentation while
//! reading the code base.

/// CPU memory map details.
pub mod cpu {
    /// First address of the 2 KiB internal RAM.
    pub const INTERNAL_RAM_START: u16 = 0x0000;
    /// Last address (inclusive) of the internal RAM mirror region.
    pub const INTERNAL_RAM_MIRROR_END: u16 = 0x1FFF;
    /// Mask that folds the mirror region onto the physical 2 KiB.
    pub const INTERNAL_RAM_MASK: u16 = 0x07FF;
    /// Physical internal RAM size in bytes.
    pub const INTERNAL_RAM_SIZE: usize = 0x0800;

    /// First address of the hardware stack page.
    pub const STACK_PAGE_START: u16 = 0x0100;

    /// First CPU-visible PPU register address.
    pub const PPU_REGISTER_BASE: u16 = 0x2000;
    /// Last address of the mirrored PPU register window.
    pub const PPU_REGISTER_END: u16 = 0x3FFF;

    /// First CPU-mapped APU channel register.
    pub const APU_REGISTER_BASE: u16 = 0x4000;
    /// Last APU channel register before the status/DMA/controller bridge.
    pub const APU_CHANNEL_END: u16 = 0x4013;
    /// APU status register (`$4015`).
    pub const APU_STATUS: u16 = 0x4015;

    /// OAM DMA trigger register (`$4014`, write-only).
    pub const OAM_DMA: u16 = 0x4014;

    /// Controller port 1 (`$4016`): strobe on write, serial data on read.
    pub const CONTROLLER_PORT_1: u16 = 0x4016;
    /// Controller port 2 / APU frame counter (`$4017`).
    pub const CONTROLLER_PORT_2: u16 = 0x4017;

    /// CPU test-mode registers, unused on the console.
    pub const TEST_MODE_BASE: u16 = 0x4018;
    /// Last CPU test-mode register address.
    pub const TEST_MODE_END: u16 = 0x401F;

    /// First address routed to the cartridge through the mapper.
    pub const CARTRIDGE_SPACE_BASE: u16 = 0x4020;
    /// First address of the cartridge PRG RAM window.
    pub const PRG_RAM_START: u16 = 0x6000;
    /// Last address of the cartridge PRG RAM window.
    pub const PRG_RAM_END: u16 = 0x7FFF;
    /// First address of the cartridge PRG ROM window.
    pub const PRG_ROM_START: u16 = 0x8000;
    /// Top of the CPU address space.
    pub const CPU_ADDR_END: u16 = 0xFFFF;

    /// NMI vector (`$FFFA/$FFFB`).
    pub const NMI_VECTOR: u16 = 0xFFFA;
    /// Reset vector (`$FFFC/$FFFD`).
    pub const RESET_VECTOR: u16 = 0xFFFC;
    /// IRQ/BRK vector (`$FFFE/$FFFF`).
    pub const IRQ_VECTOR: u16 = 0xFFFE;
}

/// PPU register layout and VRAM mirror rules.
pub mod ppu {
    /// Mask for decoding register mirrors (`addr & 0x0007`).
    pub const REGISTER_SELECT_MASK: u16 = 0x0007;

    /// Address mask applied after each VRAM access (14-bit external bus).
    pub const VRAM_MIRROR_MASK: u16 = 0x3FFF;

    /// End of the pattern table region (`$0000-$1FFF`).
    pub const PATTERN_TABLE_END: u16 = 0x1FFF;
    /// Pattern table base address for table 1.
    pub const PATTERN_TABLE_1: u16 = 0x1000;

    /// Base address of nametable 0.
    pub const NAMETABLE_BASE: u16 = 0x2000;
    /// Size of a single nametable in bytes.
    pub const NAMETABLE_SIZE: u16 = 0x0400;
    /// Physical nametable RAM on the console (two 1 KiB pages).
    pub const NAMETABLE_RAM_SIZE: usize = 0x0800;

    /// Palette RAM base address (`$3F00`).
    pub const PALETTE_BASE: u16 = 0x3F00;
    /// Palette RAM byte count (32 bytes mirrored every 32 bytes).
    pub const PALETTE_RAM_SIZE: usize = 0x20;

    /// Primary OAM size in bytes (64 sprites of 4 bytes).
    pub const OAM_RAM_SIZE: usize = 0x100;
    /// Sprites the hardware can hold for one scanline.
    pub const SPRITES_PER_LINE: usize = 8;

    /// CPU-visible PPU register identifiers.
    #[repr(u16)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Register {
        /// `$2000` - PPUCTRL
        Control = 0x2000,
        /// `$2001` - PPUMASK
        Mask = 0x2001,
        /// `$2002` - PPUSTATUS
        Status = 0x2002,
        /// `$2003` - OAMADDR
        OamAddr = 0x2003,
        /// `$2004` - OAMDATA
        OamData = 0x2004,
        /// `$2005` - PPUSCROLL
        Scroll = 0x2005,
        /// `$2006` - PPUADDR
        Addr = 0x2006,
        /// `$2007` - PPUDATA
        Data = 0x2007,
    }

    impl Register {
        /// Raw address backing the register.
        pub const fn addr(self) -> u16 {
            self as u16
        }

        /// Resolves the canonical register for a CPU address in `$2000-$3FFF`.
        pub const fn from_cpu_addr(addr: u16) -> Self {
            match addr & REGISTER_SELECT_MASK {
                0 => Self::Control,
                1 => Self::Mask,
                2 => Self::Status,
                3 => Self::OamAddr,
                4 => Self::OamData,
                5 => Self::Scroll,
                6 => Self::Addr,
                _ => Self::Data,
            }
        }
    }
}

/// Audio Processing Unit (APU) register layout.
pub mod apu {
    /// Start of the CPU-mapped APU register range.
    pub const REGISTER_BASE: u16 = 0x4000;
    /// Final channel register before the status and frame counter bridges.
    pub const CHANNEL_REGISTER_END: u16 = 0x4013;
    /// Address of the status register (`$4015`).
    pub const STATUS: u16 = 0x4015;
    /// Address of the frame counter configuration register (`$4017`).
    pub const FRAME_COUNTER: u16 = 0x4017;
}
