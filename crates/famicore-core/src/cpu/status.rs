use bitflags::bitflags;

bitflags! {
    /// The 8-bit processor status register (P).
    ///
    /// Bit layout:
    /// ```text
    /// 7 6 5 4 3 2 1 0
    /// N V U B D I Z C
    /// ```
    /// Bits 4 (B) and 5 (U) only exist on the stack: pushes via `BRK`/`PHP`
    /// set B, hardware interrupt pushes clear it, and U always reads as 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        /// Carry flag (C): carry out of bit 7, or no borrow on subtraction.
        const CARRY     = 0b0000_0001;
        /// Zero flag (Z): result of the last operation was zero.
        const ZERO      = 0b0000_0010;
        /// Interrupt Disable flag (I): maskable IRQs are suppressed.
        const INTERRUPT = 0b0000_0100;
        /// Decimal Mode flag (D): `ADC`/`SBC` operate on BCD operands.
        const DECIMAL   = 0b0000_1000;
        /// Break flag (B): distinguishes `BRK`/`PHP` pushes from hardware.
        const BREAK     = 0b0001_0000;
        /// Unused bit, always 1 when the register is pushed.
        const UNUSED    = 0b0010_0000;
        /// Overflow flag (V): signed arithmetic overflow.
        const OVERFLOW  = 0b0100_0000;
        /// Negative flag (N): bit 7 of the last result.
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Power-up state: I and U set.
    pub fn new() -> Self {
        Status::INTERRUPT | Status::UNUSED
    }

    /// Set or clear the Zero flag based on a value.
    #[inline]
    pub fn update_zero(&mut self, value: u8) {
        self.set(Status::ZERO, value == 0);
    }

    /// Set or clear the Negative flag based on bit 7 of a value.
    #[inline]
    pub fn update_negative(&mut self, value: u8) {
        self.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Update Z and N from a result value.
    #[inline]
    pub fn set_zn(&mut self, value: u8) {
        self.update_zero(value);
        self.update_negative(value);
    }

    #[inline]
    pub fn set_c(&mut self, value: bool) {
        self.set(Status::CARRY, value);
    }

    #[inline]
    pub fn set_v(&mut self, value: bool) {
        self.set(Status::OVERFLOW, value);
    }

    /// Register image pushed to the stack.
    ///
    /// U is forced high; B is set for `BRK`/`PHP` pushes and cleared for
    /// hardware interrupt pushes.
    #[inline]
    pub fn pushed(self, software: bool) -> u8 {
        let mut value = self | Status::UNUSED;
        value.set(Status::BREAK, software);
        value.bits()
    }

    /// Restores the register from a stack image: B is discarded, U forced.
    #[inline]
    pub fn pulled(value: u8) -> Self {
        let mut status = Status::from_bits_retain(value);
        status.remove(Status::BREAK);
        status.insert(Status::UNUSED);
        status
    }

    #[inline]
    pub fn c(self) -> bool {
        self.contains(Status::CARRY)
    }

    #[inline]
    pub fn z(self) -> bool {
        self.contains(Status::ZERO)
    }

    #[inline]
    pub fn i(self) -> bool {
        self.contains(Status::INTERRUPT)
    }

    #[inline]
    pub fn d(self) -> bool {
        self.contains(Status::DECIMAL)
    }

    #[inline]
    pub fn v(self) -> bool {
        self.contains(Status::OVERFLOW)
    }

    #[inline]
    pub fn n(self) -> bool {
        self.contains(Status::NEGATIVE)
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
