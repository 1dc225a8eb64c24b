//! Picture Processing Unit: a 341x262 dot state machine.
//!
//! Scanline `-1` is the pre-render line, `0..=239` are visible, `240` is the
//! post-render idle line, and `241..=260` are VBlank. Each scanline spans
//! 341 dots. Rendering combines a background fetch pipeline (16-bit pattern
//! and attribute shifters refilled every 8 dots) with a per-scanline sprite
//! line buffer prepared during the previous line, compositing one pixel per
//! dot into an `0xAARRGGBB` frame buffer.
//!
//! Timing quirks modelled here:
//! - the odd-frame skip of dot (0,0) on the pre-render line while rendering;
//! - the `$2002` read race that suppresses the NMI one dot before VBlank;
//! - the `$2007` read buffer with its palette bypass;
//! - the one-call-per-frame `true` from [`Ppu::step`] at dot 1 of line 241.

pub mod background_pipeline;
pub mod palette;
pub mod registers;
pub mod sprite;

use crate::{
    cartridge::{Cartridge, header::Mirroring},
    memory::ppu::{self as ppu_mem, Register},
    ppu::{
        background_pipeline::BgPipeline,
        palette::{PaletteRam, SYSTEM_PALETTE},
        registers::{Mask, Registers, Status},
        sprite::{SpriteEvaluation, evaluate_line},
    },
    ram::ppu::{NametableRam, OamRam},
};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

const DOTS_PER_SCANLINE: u16 = 341;
const PRERENDER_SCANLINE: i16 = -1;
const LAST_SCANLINE: i16 = 260;
const VBLANK_SCANLINE: i16 = 241;

#[derive(Clone)]
pub struct Ppu {
    registers: Registers,
    /// The console's two physical nametable pages; cartridge mirroring maps
    /// the four logical tables onto them.
    nametable_ram: NametableRam,
    palette_ram: PaletteRam,
    oam: OamRam,

    /// Current dot (0..=340) within the active scanline.
    cycle: u16,
    /// Current scanline; `-1` is the pre-render line.
    scanline: i16,
    frame: u64,
    odd_frame: bool,

    bg: BgPipeline,
    /// Fetch latches filled across the 8-dot background fetch cycle.
    fetch_nt: u8,
    fetch_at: u8,
    fetch_pattern_lo: u8,
    fetch_pattern_hi: u8,

    /// Sprites prepared for the scanline currently being drawn.
    sprite_line: SpriteEvaluation,

    /// `$2007` read buffer: non-palette reads are delayed by one access.
    read_buffer: u8,
    /// Last value driven on the register bus (open-bus readback).
    bus_latch: u8,

    /// Level of the NMI output line (VBlank AND enable).
    nmi_output: bool,
    /// Edge latch consumed by the system driver.
    nmi_pending: bool,
    /// Set by a `$2002` read landing one dot before VBlank.
    suppress_vblank: bool,

    framebuffer: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            nametable_ram: NametableRam::new(),
            palette_ram: PaletteRam::new(),
            oam: OamRam::new(),
            cycle: 0,
            scanline: 0,
            frame: 0,
            odd_frame: false,
            bg: BgPipeline::new(),
            fetch_nt: 0,
            fetch_at: 0,
            fetch_pattern_lo: 0,
            fetch_pattern_hi: 0,
            sprite_line: SpriteEvaluation::default(),
            read_buffer: 0,
            bus_latch: 0,
            nmi_output: false,
            nmi_pending: false,
            suppress_vblank: false,
            framebuffer: vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT]
                .into_boxed_slice()
                .try_into()
                .expect("framebuffer length"),
        }
    }

    /// Restores power-on state: cleared memories, dot (0,0) of frame 0.
    pub fn reset(&mut self) {
        self.registers.reset();
        self.nametable_ram.fill(0);
        self.palette_ram.reset();
        self.oam.fill(0);
        self.cycle = 0;
        self.scanline = 0;
        self.frame = 0;
        self.odd_frame = false;
        self.bg.clear();
        self.fetch_nt = 0;
        self.fetch_at = 0;
        self.fetch_pattern_lo = 0;
        self.fetch_pattern_hi = 0;
        self.sprite_line = SpriteEvaluation::default();
        self.read_buffer = 0;
        self.bus_latch = 0;
        self.nmi_output = false;
        self.nmi_pending = false;
        self.suppress_vblank = false;
        self.framebuffer.fill(0);
    }

    /// Advances the PPU by `dots` cycles. Returns `true` when this call
    /// crossed dot 1 of scanline 241 (the frame-complete / VBlank edge).
    pub fn step(&mut self, dots: u32, cart: &mut Cartridge) -> bool {
        let mut frame_complete = false;
        for _ in 0..dots {
            frame_complete |= self.clock(cart);
        }
        frame_complete
    }

    /// Takes the latched NMI edge, if one is pending.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// The rendered frame: 256x240 pixels in `0xAARRGGBB`.
    pub fn frame_buffer(&self) -> &[u32] {
        &self.framebuffer[..]
    }

    /// Raw OAM bytes (debug/test view).
    pub fn oam(&self) -> &[u8] {
        &self.oam
    }

    /// Raw status bits (debug/test view; no read side effects).
    pub fn status_bits(&self) -> u8 {
        self.registers.status.bits()
    }

    pub fn scanline(&self) -> i16 {
        self.scanline
    }

    pub fn cycle(&self) -> u16 {
        self.cycle
    }

    /// Frames completed since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    // -------------------------------------------------------------------
    // CPU register interface
    // -------------------------------------------------------------------

    /// CPU read from the mirrored register window (`$2000-$3FFF`).
    pub fn cpu_read(&mut self, addr: u16, cart: &mut Cartridge) -> u8 {
        let value = match Register::from_cpu_addr(addr) {
            Register::Status => self.read_status(),
            Register::OamData => self.oam[self.registers.oam_addr as usize],
            Register::Data => self.read_data(cart),
            // Write-only registers read back the bus latch.
            _ => self.bus_latch,
        };
        self.bus_latch = value;
        value
    }

    /// CPU write to the mirrored register window (`$2000-$3FFF`).
    pub fn cpu_write(&mut self, addr: u16, value: u8, cart: &mut Cartridge) {
        self.bus_latch = value;
        match Register::from_cpu_addr(addr) {
            Register::Control => {
                let prev = self.nmi_output;
                self.registers.write_control(value);
                // Enabling NMI while VBlank is already set raises the line
                // immediately (edge into the latch).
                self.update_nmi_output(prev);
            }
            Register::Mask => self.registers.mask = Mask::from_bits_retain(value),
            Register::Status => {}
            Register::OamAddr => self.registers.oam_addr = value,
            Register::OamData => {
                self.oam[self.registers.oam_addr as usize] = value;
                self.registers.oam_addr = self.registers.oam_addr.wrapping_add(1);
            }
            Register::Scroll => self.registers.vram.write_scroll(value),
            Register::Addr => self.registers.vram.write_addr(value),
            Register::Data => self.write_data(value, cart),
        }
    }

    fn read_status(&mut self) -> u8 {
        let value = (self.registers.status.bits() & 0xE0) | (self.bus_latch & 0x1F);

        // Reading one dot before the VBlank edge races the flag set: the CPU
        // sees it clear and the NMI for this frame is swallowed.
        if self.scanline == VBLANK_SCANLINE && self.cycle == 0 {
            self.suppress_vblank = true;
        }

        let prev = self.nmi_output;
        self.registers.status.remove(Status::VERTICAL_BLANK);
        self.registers.vram.reset_toggle();
        self.update_nmi_output(prev);
        value
    }

    fn read_data(&mut self, cart: &mut Cartridge) -> u8 {
        let addr = self.registers.vram.v.raw() & ppu_mem::VRAM_MIRROR_MASK;
        let value = if addr >= ppu_mem::PALETTE_BASE {
            // Palette reads bypass the buffer, which still picks up the
            // nametable byte underneath the palette window.
            self.read_buffer = self.read_nametable(addr & 0x2FFF, cart.mirroring());
            self.palette_ram.read(addr)
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.read_vram(addr, cart);
            buffered
        };
        self.registers
            .vram
            .v
            .increment(self.registers.vram_increment());
        value
    }

    fn write_data(&mut self, value: u8, cart: &mut Cartridge) {
        let addr = self.registers.vram.v.raw() & ppu_mem::VRAM_MIRROR_MASK;
        self.write_vram(addr, value, cart);
        self.registers
            .vram
            .v
            .increment(self.registers.vram_increment());
    }

    // -------------------------------------------------------------------
    // PPU address space
    // -------------------------------------------------------------------

    /// Maps a nametable address (`$2000-$2FFF`) onto the two physical pages.
    fn nametable_index(addr: u16, mirroring: Mirroring) -> usize {
        let offset = (addr as usize) & 0x0FFF;
        let table = offset / ppu_mem::NAMETABLE_SIZE as usize;
        let inner = offset & (ppu_mem::NAMETABLE_SIZE as usize - 1);

        let page = match mirroring {
            Mirroring::Horizontal => table >> 1,
            // Four-screen boards carry their own VRAM; with two pages we
            // fall back to the vertical layout.
            Mirroring::Vertical | Mirroring::FourScreen => table & 1,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
        };
        page * ppu_mem::NAMETABLE_SIZE as usize + inner
    }

    fn read_nametable(&self, addr: u16, mirroring: Mirroring) -> u8 {
        self.nametable_ram[Self::nametable_index(addr, mirroring)]
    }

    /// Reads through the PPU address space (`$0000-$3EFF`).
    fn read_vram(&self, addr: u16, cart: &mut Cartridge) -> u8 {
        match addr {
            0x0000..=ppu_mem::PATTERN_TABLE_END => cart.ppu_read(addr),
            _ => self.read_nametable(addr & 0x2FFF, cart.mirroring()),
        }
    }

    fn write_vram(&mut self, addr: u16, value: u8, cart: &mut Cartridge) {
        match addr {
            0x0000..=ppu_mem::PATTERN_TABLE_END => cart.ppu_write(addr, value),
            0x3F00..=0x3FFF => self.palette_ram.write(addr, value),
            _ => {
                let index = Self::nametable_index(addr & 0x2FFF, cart.mirroring());
                self.nametable_ram[index] = value;
            }
        }
    }

    // -------------------------------------------------------------------
    // Dot state machine
    // -------------------------------------------------------------------

    /// Advances one dot. Returns `true` on the VBlank edge.
    ///
    /// The position counters increment first and the dot's work runs on the
    /// new position, so the VBlank edge is observed after exactly
    /// `341 * 241 + 1` dots from power-on.
    fn clock(&mut self, cart: &mut Cartridge) -> bool {
        self.advance_dot();

        let rendering = self.registers.mask.rendering_enabled();

        // Odd-frame skip: the pre-render line loses dot 0 when rendering.
        if self.scanline == PRERENDER_SCANLINE
            && self.cycle == 0
            && self.odd_frame
            && rendering
        {
            self.cycle = 1;
        }

        let mut frame_complete = false;

        match self.scanline {
            PRERENDER_SCANLINE => {
                if self.cycle == 1 {
                    self.registers.status.remove(
                        Status::VERTICAL_BLANK | Status::SPRITE_ZERO_HIT | Status::SPRITE_OVERFLOW,
                    );
                    let prev = self.nmi_output;
                    self.update_nmi_output(prev);
                    self.nmi_pending = false;
                    self.suppress_vblank = false;
                }
                self.render_line_dot(cart, rendering, false);
                if rendering && (280..=304).contains(&self.cycle) {
                    self.registers.vram.copy_vertical();
                }
            }
            0..=239 => self.render_line_dot(cart, rendering, true),
            240 => {}
            VBLANK_SCANLINE.. => {
                if self.scanline == VBLANK_SCANLINE && self.cycle == 1 {
                    frame_complete = true;
                    if !self.suppress_vblank {
                        let prev = self.nmi_output;
                        self.registers.status.insert(Status::VERTICAL_BLANK);
                        self.update_nmi_output(prev);
                    }
                    self.suppress_vblank = false;
                }
            }
            _ => unreachable!("PPU scanline {} out of range", self.scanline),
        }

        frame_complete
    }

    /// Shared per-dot work for visible scanlines and the pre-render line.
    fn render_line_dot(&mut self, cart: &mut Cartridge, rendering: bool, visible: bool) {
        match self.cycle {
            1..=256 => {
                if visible {
                    self.render_pixel();
                }
                if rendering {
                    self.bg.shift();
                    self.background_fetch(cart);
                    if self.cycle == 256 {
                        self.registers.vram.increment_y();
                    }
                }
            }
            257 => {
                if rendering {
                    self.registers.vram.copy_horizontal();
                    self.evaluate_next_line(cart);
                }
            }
            // The MMC3 scanline counter is clocked by the sprite-fetch A12
            // rise, which lands at this dot of every rendered line.
            260 => {
                if rendering {
                    cart.scanline();
                }
            }
            321..=336 => {
                if rendering {
                    self.bg.shift();
                    self.background_fetch(cart);
                }
            }
            _ => {}
        }
    }

    /// One step of the repeating 8-dot background fetch cycle.
    fn background_fetch(&mut self, cart: &mut Cartridge) {
        let v = self.registers.vram.v;
        match (self.cycle - 1) & 7 {
            0 => {
                let addr = ppu_mem::NAMETABLE_BASE | (v.raw() & 0x0FFF);
                self.fetch_nt = self.read_nametable(addr, cart.mirroring());
            }
            2 => {
                let addr = 0x23C0
                    | (v.raw() & 0x0C00)
                    | ((v.raw() >> 4) & 0x38)
                    | ((v.raw() >> 2) & 0x07);
                let byte = self.read_nametable(addr, cart.mirroring());
                // Select the 2-bit quadrant for this tile.
                let shift = ((v.coarse_y() & 2) << 1) | (v.coarse_x() & 2);
                self.fetch_at = (byte >> shift) & 0b11;
            }
            4 => {
                let addr = self.registers.background_pattern_table()
                    | ((self.fetch_nt as u16) << 4)
                    | v.fine_y() as u16;
                self.fetch_pattern_lo = cart.ppu_read(addr);
            }
            6 => {
                let addr = self.registers.background_pattern_table()
                    | ((self.fetch_nt as u16) << 4)
                    | v.fine_y() as u16;
                self.fetch_pattern_hi = cart.ppu_read(addr + 8);
            }
            7 => {
                self.bg
                    .reload([self.fetch_pattern_lo, self.fetch_pattern_hi], self.fetch_at);
                self.registers.vram.increment_coarse_x();
            }
            _ => {}
        }
    }

    /// Dot 257: prepare the sprite line buffer for the next scanline.
    fn evaluate_next_line(&mut self, cart: &mut Cartridge) {
        let next_line = self.scanline + 1;
        if !(0..SCREEN_HEIGHT as i16).contains(&next_line) {
            self.sprite_line = SpriteEvaluation::default();
            return;
        }

        let eval = evaluate_line(
            &self.oam,
            next_line,
            self.registers.control.sprite_height(),
            self.registers.sprite_pattern_table(),
            cart,
        );
        if eval.overflow {
            self.registers.status.insert(Status::SPRITE_OVERFLOW);
        }
        self.sprite_line = eval;
    }

    /// Composites one pixel at the current dot into the frame buffer.
    fn render_pixel(&mut self) {
        let x = (self.cycle - 1) as usize;
        let y = self.scanline as usize;
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }

        let mask = self.registers.mask;

        // Background sample, honoring the left-edge mask.
        let (mut bg_palette, mut bg_pattern) = self.bg.sample(self.registers.vram.x);
        let bg_visible = mask.contains(Mask::SHOW_BACKGROUND)
            && (x >= 8 || mask.contains(Mask::SHOW_BACKGROUND_LEFT));
        if !bg_visible {
            bg_palette = 0;
            bg_pattern = 0;
        }

        // First opaque in-range sprite wins the sprite slot.
        let sprite_visible =
            mask.contains(Mask::SHOW_SPRITES) && (x >= 8 || mask.contains(Mask::SHOW_SPRITES_LEFT));
        let mut sprite_pattern = 0;
        let mut sprite_palette = 0;
        let mut sprite_behind = false;
        let mut sprite_is_zero = false;
        if sprite_visible {
            for sprite in &self.sprite_line.sprites {
                if let Some(pattern) = sprite.pattern_at(x as u8) {
                    if pattern != 0 {
                        sprite_pattern = pattern;
                        sprite_palette = sprite.palette;
                        sprite_behind = sprite.behind_background;
                        sprite_is_zero = sprite.is_sprite0;
                        break;
                    }
                }
            }
        }

        if bg_pattern != 0 && sprite_pattern != 0 && sprite_is_zero && x != 255 {
            self.registers.status.insert(Status::SPRITE_ZERO_HIT);
        }

        let palette_addr = match (bg_pattern, sprite_pattern) {
            (0, 0) => ppu_mem::PALETTE_BASE,
            (0, _) => ppu_mem::PALETTE_BASE + 0x10 + ((sprite_palette << 2) | sprite_pattern) as u16,
            (_, 0) => ppu_mem::PALETTE_BASE + ((bg_palette << 2) | bg_pattern) as u16,
            (_, _) => {
                if sprite_behind {
                    ppu_mem::PALETTE_BASE + ((bg_palette << 2) | bg_pattern) as u16
                } else {
                    ppu_mem::PALETTE_BASE + 0x10 + ((sprite_palette << 2) | sprite_pattern) as u16
                }
            }
        };

        let mut color = self.palette_ram.read(palette_addr);
        if mask.contains(Mask::GRAYSCALE) {
            color &= 0x30;
        }
        self.framebuffer[y * SCREEN_WIDTH + x] = SYSTEM_PALETTE[color as usize];
    }

    fn advance_dot(&mut self) {
        self.cycle += 1;
        if self.cycle >= DOTS_PER_SCANLINE {
            self.cycle = 0;
            self.scanline += 1;
            if self.scanline > LAST_SCANLINE {
                self.scanline = PRERENDER_SCANLINE;
            }
        }
        // The pre-render line closes the frame; counting happens when it
        // hands off to scanline 0.
        if self.scanline == 0 && self.cycle == 0 {
            self.frame = self.frame.wrapping_add(1);
            self.odd_frame = !self.odd_frame;
        }
    }

    /// Recomputes the NMI line level and latches rising edges.
    fn update_nmi_output(&mut self, prev: bool) {
        let level = self.registers.status.contains(Status::VERTICAL_BLANK)
            && self.registers.control.nmi_enabled();
        self.nmi_output = level;
        if level && !prev {
            self.nmi_pending = true;
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ppu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ppu")
            .field("cycle", &self.cycle)
            .field("scanline", &self.scanline)
            .field("frame", &self.frame)
            .field("odd_frame", &self.odd_frame)
            .field("registers", &self.registers)
            .finish()
    }
}
