use bitflags::bitflags;

bitflags! {
    /// PPU status register (`$2002`). Only the top three bits are driven;
    /// the rest float with the data-bus latch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// More than eight sprites were in range on a scanline.
        const SPRITE_OVERFLOW = 0b0010_0000;
        /// An opaque sprite-0 pixel overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 0b0100_0000;
        /// The PPU is in the vertical blanking interval.
        const VERTICAL_BLANK = 0b1000_0000;
    }
}
