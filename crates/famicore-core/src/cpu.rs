//! 6502 CPU core.
//!
//! An instruction-accurate interpreter: each [`Cpu::step`] fetches one opcode,
//! dispatches through the 256-entry [`lookup::LOOKUP_TABLE`], executes the
//! operation, and returns the number of clock cycles consumed, including
//! branch penalties, page-cross penalties for read ops, and the OAM DMA
//! stall when the instruction triggered one. Interrupts (edge-latched NMI,
//! level-sampled IRQ) are taken between instructions.

use tracing::debug;

use crate::{
    bus::cpu::CpuBus,
    cpu::{
        addressing::{Addressing, Operand},
        cycle::CYCLE_TABLE,
        instruction::Instruction,
        lookup::LOOKUP_TABLE,
        status::Status,
    },
    memory::cpu as cpu_mem,
};

pub mod addressing;
pub mod cycle;
pub mod instruction;
pub mod lookup;
pub mod status;
pub mod trace;

/// Cycles consumed per `step` while the CPU is wedged on a JAM opcode. The
/// hardware stops driving the bus entirely; charging time here keeps the
/// PPU/APU advancing so the host can observe the frozen `PC`.
const JAM_STEP_CYCLES: u32 = 2;

/// Cycles consumed by an interrupt entry sequence.
const INTERRUPT_CYCLES: u32 = 7;

/// Lightweight CPU register snapshot used for tracing/debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuSnapshot {
    pub pc: u16,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub p: u8,
}

/// The 2A03's 6502 core (decimal mode fully functional).
#[derive(Debug, Clone)]
pub struct Cpu {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    /// Stack pointer, implicitly prefixed with `$01` to form the stack page.
    pub s: u8,
    pub pc: u16,
    pub p: Status,

    /// Edge-latched NMI request, consumed at the next instruction boundary.
    nmi_pending: bool,
    /// Set once a JAM opcode executes; `PC` no longer advances.
    jammed: bool,
    /// Total CPU cycles executed since power-on.
    cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status::new(),
            nmi_pending: false,
            jammed: false,
            cycles: 0,
        }
    }

    /// Reset sequence: registers to power-up state, `PC` from `$FFFC/$FFFD`.
    pub fn reset(&mut self, bus: &mut CpuBus<'_>) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.s = 0xFD;
        self.p = Status::new();
        self.nmi_pending = false;
        self.jammed = false;
        self.cycles = 0;
        self.pc = bus.read_word(cpu_mem::RESET_VECTOR);
    }

    /// Latches an NMI edge raised by the PPU.
    pub fn signal_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Whether a JAM opcode has wedged the core.
    pub fn jammed(&self) -> bool {
        self.jammed
    }

    /// Total CPU cycles executed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Snapshot of the current registers for tracing/debugging.
    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            s: self.s,
            p: self.p.bits(),
        }
    }

    /// Executes one instruction (or services one interrupt) and returns the
    /// cycles consumed, including any OAM DMA stall.
    pub fn step(&mut self, bus: &mut CpuBus<'_>) -> u32 {
        if self.jammed {
            self.cycles += JAM_STEP_CYCLES as u64;
            return JAM_STEP_CYCLES;
        }

        if self.nmi_pending {
            self.nmi_pending = false;
            return self.interrupt(bus, cpu_mem::NMI_VECTOR);
        }
        if !self.p.i() && bus.irq_line() {
            return self.interrupt(bus, cpu_mem::IRQ_VECTOR);
        }

        let start_cycle = self.cycles;
        let opcode = self.fetch_byte(bus);
        let entry = LOOKUP_TABLE[opcode as usize];
        let operand = entry.addressing.resolve(self, bus);
        let branch_taken = self.execute(entry.instruction, entry.addressing, operand, bus);

        let mut total = CYCLE_TABLE[opcode as usize].total(operand.page_crossed, branch_taken);
        if let Some(page) = bus.take_oam_dma() {
            total += self.oam_dma(bus, page, start_cycle);
        }

        self.cycles += total as u64;
        total
    }

    /// Hardware interrupt entry: push `PC` and `P` (B clear), set I, load the
    /// vector.
    fn interrupt(&mut self, bus: &mut CpuBus<'_>, vector: u16) -> u32 {
        self.push_word(bus, self.pc);
        self.push(bus, self.p.pushed(false));
        self.p.insert(Status::INTERRUPT);
        self.pc = bus.read_word(vector);
        self.cycles += INTERRUPT_CYCLES as u64;
        INTERRUPT_CYCLES
    }

    /// Copies 256 bytes from `$NN00-$NNFF` into OAM and reports the stall:
    /// 513 cycles, plus one more when the instruction started on an odd
    /// CPU cycle.
    fn oam_dma(&mut self, bus: &mut CpuBus<'_>, page: u8, start_cycle: u64) -> u32 {
        let base = (page as u16) << 8;
        for offset in 0u16..=0xFF {
            let value = bus.read(base | offset);
            bus.write_oam_data(value);
        }
        513 + (start_cycle & 1) as u32
    }

    // -------------------------------------------------------------------
    // Fetch and stack helpers
    // -------------------------------------------------------------------

    #[inline]
    pub(crate) fn fetch_byte(&mut self, bus: &mut CpuBus<'_>) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    #[inline]
    pub(crate) fn fetch_word(&mut self, bus: &mut CpuBus<'_>) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push(&mut self, bus: &mut CpuBus<'_>, value: u8) {
        bus.write(cpu_mem::STACK_PAGE_START | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }

    #[inline]
    fn pop(&mut self, bus: &mut CpuBus<'_>) -> u8 {
        self.s = self.s.wrapping_add(1);
        bus.read(cpu_mem::STACK_PAGE_START | self.s as u16)
    }

    #[inline]
    fn push_word(&mut self, bus: &mut CpuBus<'_>, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    #[inline]
    fn pop_word(&mut self, bus: &mut CpuBus<'_>) -> u16 {
        let lo = self.pop(bus) as u16;
        let hi = self.pop(bus) as u16;
        (hi << 8) | lo
    }

    // -------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------

    /// Runs one operation. Returns `true` when a branch was taken (the cycle
    /// table needs the outcome).
    fn execute(
        &mut self,
        instruction: Instruction,
        addressing: Addressing,
        operand: Operand,
        bus: &mut CpuBus<'_>,
    ) -> bool {
        use Instruction::*;

        match instruction {
            // ---------------- loads ----------------
            LDA => {
                self.a = self.load(bus, addressing, operand);
                self.p.set_zn(self.a);
            }
            LDX => {
                self.x = self.load(bus, addressing, operand);
                self.p.set_zn(self.x);
            }
            LDY => {
                self.y = self.load(bus, addressing, operand);
                self.p.set_zn(self.y);
            }
            LAX => {
                let value = self.load(bus, addressing, operand);
                self.a = value;
                self.x = value;
                self.p.set_zn(value);
            }
            LXA => {
                // Unstable: the magic constant is bus-noise dependent on
                // hardware; 0xFF makes this behave as LAX #imm.
                let value = (self.a | 0xFF) & self.load(bus, addressing, operand);
                self.a = value;
                self.x = value;
                self.p.set_zn(value);
            }
            LAS => {
                let value = self.load(bus, addressing, operand) & self.s;
                self.a = value;
                self.x = value;
                self.s = value;
                self.p.set_zn(value);
            }

            // ---------------- stores ----------------
            STA => bus.write(operand.addr, self.a),
            STX => bus.write(operand.addr, self.x),
            STY => bus.write(operand.addr, self.y),
            SAX => bus.write(operand.addr, self.a & self.x),
            SHA => self.glitch_store(bus, operand, self.a & self.x),
            SHX => self.glitch_store(bus, operand, self.x),
            SHY => self.glitch_store(bus, operand, self.y),
            SHS => {
                self.s = self.a & self.x;
                self.glitch_store(bus, operand, self.s);
            }

            // ---------------- transfers ----------------
            TAX => {
                self.x = self.a;
                self.p.set_zn(self.x);
            }
            TAY => {
                self.y = self.a;
                self.p.set_zn(self.y);
            }
            TSX => {
                self.x = self.s;
                self.p.set_zn(self.x);
            }
            TXA => {
                self.a = self.x;
                self.p.set_zn(self.a);
            }
            TXS => self.s = self.x,
            TYA => {
                self.a = self.y;
                self.p.set_zn(self.a);
            }

            // ---------------- stack ----------------
            PHA => self.push(bus, self.a),
            PHP => self.push(bus, self.p.pushed(true)),
            PLA => {
                self.a = self.pop(bus);
                self.p.set_zn(self.a);
            }
            PLP => {
                let value = self.pop(bus);
                self.p = Status::pulled(value);
            }

            // ---------------- shifts ----------------
            ASL => self.read_modify_write(bus, addressing, operand, Self::asl),
            LSR => self.read_modify_write(bus, addressing, operand, Self::lsr),
            ROL => self.read_modify_write(bus, addressing, operand, Self::rol),
            ROR => self.read_modify_write(bus, addressing, operand, Self::ror),

            // ---------------- logic ----------------
            AND => {
                self.a &= self.load(bus, addressing, operand);
                self.p.set_zn(self.a);
            }
            ORA => {
                self.a |= self.load(bus, addressing, operand);
                self.p.set_zn(self.a);
            }
            EOR => {
                self.a ^= self.load(bus, addressing, operand);
                self.p.set_zn(self.a);
            }
            BIT => {
                let value = self.load(bus, addressing, operand);
                self.p.update_zero(self.a & value);
                self.p.update_negative(value);
                self.p.set_v(value & 0x40 != 0);
            }

            // ---------------- arithmetic ----------------
            ADC => {
                let value = self.load(bus, addressing, operand);
                self.adc(value);
            }
            SBC => {
                let value = self.load(bus, addressing, operand);
                self.sbc(value);
            }
            CMP => {
                let value = self.load(bus, addressing, operand);
                self.compare(self.a, value);
            }
            CPX => {
                let value = self.load(bus, addressing, operand);
                self.compare(self.x, value);
            }
            CPY => {
                let value = self.load(bus, addressing, operand);
                self.compare(self.y, value);
            }
            ANC => {
                self.a &= self.load(bus, addressing, operand);
                self.p.set_zn(self.a);
                self.p.set_c(self.p.n());
            }
            ASR => {
                self.a &= self.load(bus, addressing, operand);
                self.a = self.lsr(self.a);
            }
            ARR => {
                // AND, then rotate right; C and V come from bits 6 and 5 of
                // the rotated result rather than the shifted-out bit.
                let value = self.load(bus, addressing, operand);
                let and = self.a & value;
                let rotated = (and >> 1) | ((self.p.c() as u8) << 7);
                self.a = rotated;
                self.p.set_zn(rotated);
                self.p.set_c(rotated & 0x40 != 0);
                self.p.set_v(((rotated >> 6) ^ (rotated >> 5)) & 1 != 0);
            }
            SBX => {
                let value = self.load(bus, addressing, operand);
                let masked = self.a & self.x;
                self.p.set_c(masked >= value);
                self.x = masked.wrapping_sub(value);
                self.p.set_zn(self.x);
            }
            XAA => {
                // Unstable: 0xEE is the widely observed magic constant.
                let value = self.load(bus, addressing, operand);
                self.a = (self.a | 0xEE) & self.x & value;
                self.p.set_zn(self.a);
            }

            // ---------------- combined read-modify-writes ----------------
            DCP => {
                let value = bus.read(operand.addr).wrapping_sub(1);
                bus.write(operand.addr, value);
                self.compare(self.a, value);
            }
            ISC => {
                let value = bus.read(operand.addr).wrapping_add(1);
                bus.write(operand.addr, value);
                self.sbc(value);
            }
            SLO => {
                let value = bus.read(operand.addr);
                let shifted = self.asl(value);
                bus.write(operand.addr, shifted);
                self.a |= shifted;
                self.p.set_zn(self.a);
            }
            RLA => {
                let value = bus.read(operand.addr);
                let rotated = self.rol(value);
                bus.write(operand.addr, rotated);
                self.a &= rotated;
                self.p.set_zn(self.a);
            }
            SRE => {
                let value = bus.read(operand.addr);
                let shifted = self.lsr(value);
                bus.write(operand.addr, shifted);
                self.a ^= shifted;
                self.p.set_zn(self.a);
            }
            RRA => {
                let value = bus.read(operand.addr);
                let rotated = self.ror(value);
                bus.write(operand.addr, rotated);
                self.adc(rotated);
            }

            // ---------------- increments / decrements ----------------
            INC => {
                let value = bus.read(operand.addr).wrapping_add(1);
                bus.write(operand.addr, value);
                self.p.set_zn(value);
            }
            DEC => {
                let value = bus.read(operand.addr).wrapping_sub(1);
                bus.write(operand.addr, value);
                self.p.set_zn(value);
            }
            INX => {
                self.x = self.x.wrapping_add(1);
                self.p.set_zn(self.x);
            }
            INY => {
                self.y = self.y.wrapping_add(1);
                self.p.set_zn(self.y);
            }
            DEX => {
                self.x = self.x.wrapping_sub(1);
                self.p.set_zn(self.x);
            }
            DEY => {
                self.y = self.y.wrapping_sub(1);
                self.p.set_zn(self.y);
            }

            // ---------------- control flow ----------------
            BRK => {
                // BRK pushes the address of the byte after its padding byte
                // and the status image with B set.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                self.push(bus, self.p.pushed(true));
                self.p.insert(Status::INTERRUPT);
                self.pc = bus.read_word(cpu_mem::IRQ_VECTOR);
            }
            JMP => self.pc = operand.addr,
            JSR => {
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = operand.addr;
            }
            RTS => self.pc = self.pop_word(bus).wrapping_add(1),
            RTI => {
                let status = self.pop(bus);
                self.p = Status::pulled(status);
                self.pc = self.pop_word(bus);
            }

            // ---------------- branches ----------------
            BCC => return self.branch(operand, !self.p.c()),
            BCS => return self.branch(operand, self.p.c()),
            BNE => return self.branch(operand, !self.p.z()),
            BEQ => return self.branch(operand, self.p.z()),
            BPL => return self.branch(operand, !self.p.n()),
            BMI => return self.branch(operand, self.p.n()),
            BVC => return self.branch(operand, !self.p.v()),
            BVS => return self.branch(operand, self.p.v()),

            // ---------------- flag operations ----------------
            CLC => self.p.remove(Status::CARRY),
            SEC => self.p.insert(Status::CARRY),
            CLI => self.p.remove(Status::INTERRUPT),
            SEI => self.p.insert(Status::INTERRUPT),
            CLV => self.p.remove(Status::OVERFLOW),
            CLD => self.p.remove(Status::DECIMAL),
            SED => self.p.insert(Status::DECIMAL),

            // ---------------- kill ----------------
            JAM => {
                // Rewind to the opcode byte: the core hangs here forever.
                self.pc = self.pc.wrapping_sub(1);
                if !self.jammed {
                    debug!(pc = format_args!("{:#06X}", self.pc), "CPU jammed");
                }
                self.jammed = true;
            }

            // ---------------- no-ops ----------------
            NOP => {
                // The multi-byte NOPs still perform their operand read.
                if !matches!(addressing, Addressing::Implied) {
                    let _ = self.load(bus, addressing, operand);
                }
            }
        }

        false
    }

    /// Reads the operand value for a read-class instruction.
    #[inline]
    fn load(&mut self, bus: &mut CpuBus<'_>, addressing: Addressing, operand: Operand) -> u8 {
        match addressing {
            Addressing::Accumulator => self.a,
            _ => bus.read(operand.addr),
        }
    }

    /// Applies a shift/rotate to the accumulator or a memory operand.
    fn read_modify_write(
        &mut self,
        bus: &mut CpuBus<'_>,
        addressing: Addressing,
        operand: Operand,
        op: fn(&mut Self, u8) -> u8,
    ) {
        if matches!(addressing, Addressing::Accumulator) {
            self.a = op(self, self.a);
        } else {
            let value = bus.read(operand.addr);
            let result = op(self, value);
            bus.write(operand.addr, result);
        }
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.p.set_c(value & 0x80 != 0);
        let result = value << 1;
        self.p.set_zn(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.p.set_c(value & 0x01 != 0);
        let result = value >> 1;
        self.p.set_zn(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.p.c() as u8;
        self.p.set_c(value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.p.set_zn(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.p.c() as u8) << 7;
        self.p.set_c(value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.p.set_zn(result);
        result
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.p.set_c(register >= value);
        self.p.set_zn(register.wrapping_sub(value));
    }

    /// Add with carry, honoring decimal mode with the NMOS quirks: Z derives
    /// from the binary sum while N and V derive from the first-stage BCD
    /// intermediate (before the high-nibble fixup).
    fn adc(&mut self, value: u8) {
        let carry = self.p.c() as u16;
        let binary = self.a as u16 + value as u16 + carry;

        if self.p.d() {
            self.p.update_zero((binary & 0xFF) as u8);

            let mut lo = (self.a & 0x0F) as u16 + (value & 0x0F) as u16 + carry;
            let mut hi = (self.a >> 4) as u16 + (value >> 4) as u16;
            if lo > 0x09 {
                lo += 0x06;
            }
            if lo > 0x0F {
                hi += 1;
            }

            let intermediate = (((hi & 0x0F) << 4) | (lo & 0x0F)) as u8;
            self.p.update_negative(intermediate);
            self.p
                .set_v((!(self.a ^ value) & (self.a ^ intermediate) & 0x80) != 0);

            if hi > 0x09 {
                hi += 0x06;
            }
            self.p.set_c(hi > 0x0F);
            self.a = (((hi & 0x0F) << 4) | (lo & 0x0F)) as u8;
        } else {
            let result = binary as u8;
            self.p.set_c(binary > 0xFF);
            self.p
                .set_v((!(self.a ^ value) & (self.a ^ result) & 0x80) != 0);
            self.a = result;
            self.p.set_zn(result);
        }
    }

    /// Subtract with borrow. On the NMOS part every flag derives from the
    /// binary difference; decimal mode only fixes up the stored result.
    fn sbc(&mut self, value: u8) {
        let borrow = !self.p.c() as i16;
        let binary = self.a as i16 - value as i16 - borrow;
        let result = binary as u8;

        self.p.set_c(binary >= 0);
        self.p
            .set_v(((self.a ^ value) & (self.a ^ result) & 0x80) != 0);
        self.p.set_zn(result);

        if self.p.d() {
            let mut lo = (self.a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow;
            let mut hi = (self.a >> 4) as i16 - (value >> 4) as i16;
            if lo < 0 {
                lo -= 0x06;
                hi -= 1;
            }
            if hi < 0 {
                hi -= 0x06;
            }
            self.a = (((hi as u8) & 0x0F) << 4) | ((lo as u8) & 0x0F);
        } else {
            self.a = result;
        }
    }

    /// The SHx "address glitch" stores: the written value is
    /// `register & (BaseHigh + 1)`, and a page cross corrupts the target's
    /// high byte to `EffectiveHigh & StoredValue`.
    fn glitch_store(&mut self, bus: &mut CpuBus<'_>, operand: Operand, register: u8) {
        let base_hi = (operand.base >> 8) as u8;
        let value = register & base_hi.wrapping_add(1);
        let addr = if operand.page_crossed {
            let hi = ((operand.addr >> 8) as u8) & value;
            ((hi as u16) << 8) | (operand.addr & 0x00FF)
        } else {
            operand.addr
        };
        bus.write(addr, value);
    }

    fn branch(&mut self, operand: Operand, condition: bool) -> bool {
        if condition {
            self.pc = operand.addr;
        }
        condition
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::test_support::{cpu_with_program, run_one, system_bus};

    #[test]
    fn reset_loads_vector_and_power_up_state() {
        let (cpu, _nes) = cpu_with_program(&[0xEA]);
        assert_eq!(cpu.pc, 0x8000);
        assert_eq!(cpu.s, 0xFD);
        assert_eq!(cpu.p.bits(), 0x24);
    }

    #[test]
    fn lda_immediate_sets_flags_and_costs_two_cycles() {
        let (mut cpu, mut nes) = cpu_with_program(&[0xA9, 0x00, 0xA9, 0x80]);
        assert_eq!(run_one(&mut cpu, &mut nes), 2);
        assert!(cpu.p.z());
        run_one(&mut cpu, &mut nes);
        assert!(cpu.p.n() && !cpu.p.z());
        assert_eq!(cpu.a, 0x80);
    }

    #[test]
    fn page_cross_penalty_applies_to_reads_only() {
        // LDA $80FF,X with X=1 crosses into $8100.
        let (mut cpu, mut nes) = cpu_with_program(&[0xBD, 0xFF, 0x80, 0x9D, 0xFF, 0x80]);
        cpu.x = 1;
        assert_eq!(run_one(&mut cpu, &mut nes), 5, "LDA abs,X pays the cross");
        assert_eq!(run_one(&mut cpu, &mut nes), 5, "STA abs,X is always 5");
    }

    #[test]
    fn branch_cycles_follow_taken_and_cross_rules() {
        // BNE forward (taken, same page), then BEQ (not taken).
        let (mut cpu, mut nes) = cpu_with_program(&[0xD0, 0x02, 0xEA, 0xEA, 0xF0, 0x00]);
        cpu.p.remove(Status::ZERO);
        assert_eq!(run_one(&mut cpu, &mut nes), 3);
        assert_eq!(cpu.pc, 0x8004);
        assert_eq!(run_one(&mut cpu, &mut nes), 2);
    }

    #[test]
    fn branch_page_cross_costs_four() {
        // A taken BNE at $80FC whose target lands on the next page.
        let mut program = vec![0xEA; 0xFC];
        program.extend([0xD0, 0x04]); // BNE +4 -> $8102
        let (mut cpu, mut nes) = cpu_with_program(&program);
        cpu.pc = 0x80FC;
        cpu.p.remove(Status::ZERO);
        assert_eq!(run_one(&mut cpu, &mut nes), 4);
        assert_eq!(cpu.pc, 0x8102);
    }

    #[test]
    fn stack_round_trips() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0xA9, 0x5A, // LDA #$5A
            0x48, // PHA
            0xA9, 0x00, // LDA #$00
            0x68, // PLA
        ]);
        for _ in 0..4 {
            run_one(&mut cpu, &mut nes);
        }
        assert_eq!(cpu.a, 0x5A);
        assert_eq!(cpu.s, 0xFD);
    }

    #[test]
    fn php_plp_round_trips_observable_flags() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x08, 0x28]);
        cpu.p = Status::from_bits_retain(0xC3) | Status::UNUSED;
        let before = cpu.p;
        run_one(&mut cpu, &mut nes);
        cpu.p = Status::new();
        run_one(&mut cpu, &mut nes);
        // Bits 4-5 are not observable through the round-trip.
        assert_eq!(cpu.p.bits() & 0xCF, before.bits() & 0xCF);
    }

    #[test]
    fn jsr_rts_nest_correctly() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0x20, 0x10, 0x80, // JSR $8010
            0xEA,
        ]);
        assert_eq!(run_one(&mut cpu, &mut nes), 6);
        assert_eq!(cpu.pc, 0x8010);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x8010, 0x60); // RTS
        }
        assert_eq!(run_one(&mut cpu, &mut nes), 6);
        assert_eq!(cpu.pc, 0x8003);
    }

    #[test]
    fn brk_pushes_break_frame_and_vectors() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x00, 0xFF]);
        {
            let mut bus = system_bus(&mut nes);
            // IRQ/BRK vector inside RAM so we can land somewhere readable.
            // The vector lives in ROM; read it back instead of patching.
            let _ = bus.read_word(cpu_mem::IRQ_VECTOR);
        }
        let s_before = cpu.s;
        run_one(&mut cpu, &mut nes);
        assert!(cpu.p.i());
        assert_eq!(cpu.s, s_before.wrapping_sub(3));
        let mut bus = system_bus(&mut nes);
        let pushed_p = bus.read(0x0100 | s_before.wrapping_sub(2) as u16);
        assert_eq!(pushed_p & 0x30, 0x30, "BRK pushes B and U set");
        let pushed_pc = bus.read_word(0x0100 | s_before.wrapping_sub(1) as u16);
        assert_eq!(pushed_pc, 0x8002, "BRK skips its padding byte");
    }

    #[test]
    fn nmi_pushes_hardware_frame() {
        let (mut cpu, mut nes) = cpu_with_program(&[0xEA]);
        let s_before = cpu.s;
        cpu.signal_nmi();
        let cycles = run_one(&mut cpu, &mut nes);
        assert_eq!(cycles, 7);
        let mut bus = system_bus(&mut nes);
        let pushed_p = bus.read(0x0100 | s_before.wrapping_sub(2) as u16);
        assert_eq!(pushed_p & 0x30, 0x20, "hardware push clears B, sets U");
        assert!(cpu.p.i());
    }

    #[test]
    fn irq_respects_interrupt_disable() {
        let (mut cpu, mut nes) = cpu_with_program(&[0xEA, 0xEA]);
        // Assert the APU frame IRQ line by configuring mode 0 w/o inhibit and
        // forcing the flag through a long run; simpler: drive the line via
        // the mapper-free APU by writing $4017 = 0 then stepping enough.
        // Here we only verify the I-flag gate using the bus level directly.
        cpu.p.insert(Status::INTERRUPT);
        let pc_before = cpu.pc;
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.pc, pc_before + 1, "NOP executed, no interrupt taken");
    }

    #[test]
    fn adc_binary_flag_matrix() {
        let cases = [
            // a, operand, carry_in, result, c, v, z, n
            (0x50u8, 0x10u8, false, 0x60u8, false, false, false, false),
            (0x50, 0x50, false, 0xA0, false, true, false, true),
            (0xD0, 0x90, false, 0x60, true, true, false, false),
            (0xFF, 0x01, false, 0x00, true, false, true, false),
            (0x7F, 0x00, true, 0x80, false, true, false, true),
        ];
        for (a, m, carry, result, c, v, z, n) in cases {
            let (mut cpu, mut nes) = cpu_with_program(&[0x69, m]);
            cpu.a = a;
            cpu.p.set_c(carry);
            run_one(&mut cpu, &mut nes);
            assert_eq!(cpu.a, result, "A {a:#04X} + {m:#04X}");
            assert_eq!(cpu.p.c(), c, "carry for {a:#04X}+{m:#04X}");
            assert_eq!(cpu.p.v(), v, "overflow for {a:#04X}+{m:#04X}");
            assert_eq!(cpu.p.z(), z, "zero for {a:#04X}+{m:#04X}");
            assert_eq!(cpu.p.n(), n, "negative for {a:#04X}+{m:#04X}");
        }
    }

    #[test]
    fn sbc_binary_flag_matrix() {
        let cases = [
            // a, operand, carry_in, result, c, v
            (0x50u8, 0x10u8, true, 0x40u8, true, false),
            (0x50, 0xB0, true, 0xA0, false, true),
            (0x00, 0x01, true, 0xFF, false, false),
            (0x80, 0x01, true, 0x7F, true, true),
        ];
        for (a, m, carry, result, c, v) in cases {
            let (mut cpu, mut nes) = cpu_with_program(&[0xE9, m]);
            cpu.a = a;
            cpu.p.set_c(carry);
            run_one(&mut cpu, &mut nes);
            assert_eq!(cpu.a, result, "A {a:#04X} - {m:#04X}");
            assert_eq!(cpu.p.c(), c, "carry for {a:#04X}-{m:#04X}");
            assert_eq!(cpu.p.v(), v, "overflow for {a:#04X}-{m:#04X}");
        }
    }

    #[test]
    fn adc_decimal_mode_vectors() {
        // (a, operand, carry_in) -> (result, carry_out)
        let cases = [
            (0x09u8, 0x01u8, false, 0x10u8, false),
            (0x50, 0x50, false, 0x00, true),
            (0x99, 0x01, false, 0x00, true),
            (0x58, 0x46, true, 0x05, true),
            (0x12, 0x34, false, 0x46, false),
        ];
        for (a, m, carry, result, carry_out) in cases {
            let (mut cpu, mut nes) = cpu_with_program(&[0x69, m]);
            cpu.a = a;
            cpu.p.insert(Status::DECIMAL);
            cpu.p.set_c(carry);
            run_one(&mut cpu, &mut nes);
            assert_eq!(cpu.a, result, "BCD {a:#04X} + {m:#04X}");
            assert_eq!(cpu.p.c(), carry_out, "BCD carry {a:#04X}+{m:#04X}");
        }
    }

    #[test]
    fn adc_decimal_z_comes_from_binary_sum() {
        // 0x99 + 0x01 = BCD 0x00 with carry, but the binary sum 0x9A is
        // nonzero, so Z stays clear.
        let (mut cpu, mut nes) = cpu_with_program(&[0x69, 0x01]);
        cpu.a = 0x99;
        cpu.p.insert(Status::DECIMAL);
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0x00);
        assert!(!cpu.p.z(), "Z derives from the pre-fixup binary sum");

        // 0xFF + 0x01 has a zero binary sum, so Z is set even though the
        // BCD result is not zero.
        let (mut cpu, mut nes) = cpu_with_program(&[0x69, 0x01]);
        cpu.a = 0xFF;
        cpu.p.insert(Status::DECIMAL);
        run_one(&mut cpu, &mut nes);
        assert!(cpu.p.z());
    }

    #[test]
    fn sbc_decimal_mode_vectors() {
        let cases = [
            (0x10u8, 0x01u8, true, 0x09u8, true),
            (0x00, 0x01, true, 0x99, false),
            (0x46, 0x12, true, 0x34, true),
            (0x50, 0x25, false, 0x24, true),
        ];
        for (a, m, carry, result, carry_out) in cases {
            let (mut cpu, mut nes) = cpu_with_program(&[0xE9, m]);
            cpu.a = a;
            cpu.p.insert(Status::DECIMAL);
            cpu.p.set_c(carry);
            run_one(&mut cpu, &mut nes);
            assert_eq!(cpu.a, result, "BCD {a:#04X} - {m:#04X}");
            assert_eq!(cpu.p.c(), carry_out, "BCD borrow {a:#04X}-{m:#04X}");
        }
    }

    #[test]
    fn undocumented_lax_and_sax() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0xA7, 0x10, // LAX $10
            0x87, 0x11, // SAX $11
        ]);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x0010, 0x5F);
        }
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0x5F);
        assert_eq!(cpu.x, 0x5F);

        cpu.a = 0xF0;
        cpu.x = 0x3C;
        run_one(&mut cpu, &mut nes);
        let mut bus = system_bus(&mut nes);
        assert_eq!(bus.read(0x0011), 0x30);
    }

    #[test]
    fn undocumented_dcp_isc_slo() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0xC7, 0x10, // DCP $10
            0xE7, 0x11, // ISC $11
            0x07, 0x12, // SLO $12
        ]);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x0010, 0x41);
            bus.write(0x0011, 0x0F);
            bus.write(0x0012, 0x81);
        }
        cpu.a = 0x40;
        run_one(&mut cpu, &mut nes);
        {
            let mut bus = system_bus(&mut nes);
            assert_eq!(bus.read(0x0010), 0x40);
        }
        assert!(cpu.p.z() && cpu.p.c(), "DCP compared A against 0x40");

        cpu.a = 0x20;
        cpu.p.set_c(true);
        run_one(&mut cpu, &mut nes);
        {
            let mut bus = system_bus(&mut nes);
            assert_eq!(bus.read(0x0011), 0x10);
        }
        assert_eq!(cpu.a, 0x10, "ISC subtracted the incremented value");

        cpu.a = 0x0C;
        run_one(&mut cpu, &mut nes);
        let mut bus = system_bus(&mut nes);
        assert_eq!(bus.read(0x0012), 0x02);
        assert!(cpu.p.c(), "SLO shifted bit 7 into carry");
        assert_eq!(cpu.a, 0x0E);
    }

    #[test]
    fn arr_derives_carry_and_overflow_from_result_bits() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x6B, 0xFF]);
        cpu.a = 0xC0;
        cpu.p.set_c(true);
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0xE0);
        assert!(cpu.p.c(), "C mirrors bit 6 of the result");
        assert!(!cpu.p.v(), "V is bit6 ^ bit5");
    }

    #[test]
    fn sbx_masks_a_and_x_before_subtracting() {
        let (mut cpu, mut nes) = cpu_with_program(&[0xCB, 0x02]);
        cpu.a = 0x0F;
        cpu.x = 0x35;
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.x, 0x03);
        assert!(cpu.p.c());
    }

    #[test]
    fn shx_stores_masked_value_and_corrupts_address_on_cross() {
        // SHX $00FF,Y with Y=2 crosses into page 1: value = X & (0x00+1).
        let (mut cpu, mut nes) = cpu_with_program(&[0x9E, 0xFF, 0x00]);
        cpu.x = 0xFF;
        cpu.y = 0x02;
        run_one(&mut cpu, &mut nes);
        let mut bus = system_bus(&mut nes);
        // value = 0xFF & 0x01 = 0x01; high byte corrupted to 0x01 & 0x01.
        assert_eq!(bus.read(0x0101), 0x01);
    }

    #[test]
    fn shy_without_cross_uses_plain_address() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x9C, 0x10, 0x01]);
        cpu.y = 0xFF;
        cpu.x = 0x02;
        run_one(&mut cpu, &mut nes);
        let mut bus = system_bus(&mut nes);
        assert_eq!(bus.read(0x0112), 0xFF & 0x02);
    }

    #[test]
    fn jam_freezes_pc_but_time_advances() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x02]);
        let pc = cpu.pc;
        let first = run_one(&mut cpu, &mut nes);
        assert!(first > 0);
        assert!(cpu.jammed());
        assert_eq!(cpu.pc, pc);

        let cycles_before = cpu.cycles();
        assert_eq!(run_one(&mut cpu, &mut nes), JAM_STEP_CYCLES);
        assert_eq!(cpu.pc, pc);
        assert!(cpu.cycles() > cycles_before);
    }

    #[test]
    fn oam_dma_charges_513_or_514_by_start_parity() {
        // STA $4014 with A = 2: base cost 4, DMA adds 513 (even start).
        let (mut cpu, mut nes) = cpu_with_program(&[
            0x8D, 0x14, 0x40, // STA $4014
            0x8D, 0x14, 0x40, // again, now from an odd start cycle
        ]);
        cpu.a = 0x02;
        assert_eq!(cpu.cycles() % 2, 0);
        assert_eq!(run_one(&mut cpu, &mut nes), 4 + 513);

        // Total is now odd; the next DMA pays the extra alignment cycle.
        assert_eq!(cpu.cycles() % 2, 1);
        assert_eq!(run_one(&mut cpu, &mut nes), 4 + 514);
    }

    #[test]
    fn oam_dma_copies_a_full_page() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x8D, 0x14, 0x40]);
        {
            let mut bus = system_bus(&mut nes);
            for i in 0..256u16 {
                bus.write(0x0200 + i, i as u8);
            }
        }
        cpu.a = 0x02;
        run_one(&mut cpu, &mut nes);
        assert_eq!(nes.ppu.oam()[0x00], 0x00);
        assert_eq!(nes.ppu.oam()[0x7F], 0x7F);
        assert_eq!(nes.ppu.oam()[0xFF], 0xFF);
    }

    #[test]
    fn nmi_vector_and_rti_round_trip() {
        let (mut cpu, mut nes) = cpu_with_program(&[0xEA, 0xEA]);
        {
            let mut bus = system_bus(&mut nes);
            // The test ROM's NMI vector is $0000; park an RTI there.
            bus.write(0x0000, 0x40);
        }
        let pc_before = cpu.pc;
        let p_before = cpu.p;
        cpu.signal_nmi();
        run_one(&mut cpu, &mut nes); // take the NMI
        assert_eq!(cpu.pc, 0x0000);

        run_one(&mut cpu, &mut nes); // RTI
        assert_eq!(cpu.pc, pc_before);
        assert_eq!(cpu.p.bits() & 0xCF, p_before.bits() & 0xCF);
    }

    #[test]
    fn jmp_indirect_follows_the_page_wrap_bug() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x6C, 0xFF, 0x02]);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x02FF, 0x34);
            bus.write(0x0200, 0x12); // wrapped high byte
            bus.write(0x0300, 0x56); // the byte a fixed CPU would use
        }
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.pc, 0x1234);
    }

    #[test]
    fn compare_flag_matrix() {
        let cases = [
            // a, operand, c, z, n
            (0x40u8, 0x3Fu8, true, false, false),
            (0x40, 0x40, true, true, false),
            (0x40, 0x41, false, false, true),
            (0x00, 0xFF, false, false, false),
        ];
        for (a, m, c, z, n) in cases {
            let (mut cpu, mut nes) = cpu_with_program(&[0xC9, m]);
            cpu.a = a;
            run_one(&mut cpu, &mut nes);
            assert_eq!(cpu.p.c(), c, "C for {a:#04X} cmp {m:#04X}");
            assert_eq!(cpu.p.z(), z, "Z for {a:#04X} cmp {m:#04X}");
            assert_eq!(cpu.p.n(), n, "N for {a:#04X} cmp {m:#04X}");
        }
    }

    #[test]
    fn bit_pulls_n_and_v_from_memory() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x24, 0x10]);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x0010, 0xC0);
        }
        cpu.a = 0x3F; // no overlap with $C0
        run_one(&mut cpu, &mut nes);
        assert!(cpu.p.z(), "A & M == 0");
        assert!(cpu.p.n(), "N copies bit 7 of memory");
        assert!(cpu.p.v(), "V copies bit 6 of memory");
    }

    #[test]
    fn undocumented_rla_sre_rra() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0x27, 0x10, // RLA $10
            0x47, 0x11, // SRE $11
            0x67, 0x12, // RRA $12
        ]);
        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x0010, 0x80);
            bus.write(0x0011, 0x03);
            bus.write(0x0012, 0x02);
        }

        cpu.a = 0xFF;
        cpu.p.set_c(true);
        run_one(&mut cpu, &mut nes); // mem -> $01 (rol w/ carry), A &= $01
        {
            let mut bus = system_bus(&mut nes);
            assert_eq!(bus.read(0x0010), 0x01);
        }
        assert_eq!(cpu.a, 0x01);
        assert!(cpu.p.c(), "old bit 7 went to carry");

        cpu.a = 0x00;
        run_one(&mut cpu, &mut nes); // mem -> $01 (lsr), A ^= $01
        assert_eq!(cpu.a, 0x01);
        assert!(cpu.p.c(), "old bit 0 went to carry");

        cpu.a = 0x10;
        run_one(&mut cpu, &mut nes); // mem -> $81 (ror w/ carry), A += $81
        {
            let mut bus = system_bus(&mut nes);
            assert_eq!(bus.read(0x0012), 0x81);
        }
        assert_eq!(cpu.a, 0x91, "RRA adds the rotated value");
    }

    #[test]
    fn undocumented_anc_asr_las() {
        let (mut cpu, mut nes) = cpu_with_program(&[
            0x0B, 0xF0, // ANC #$F0
            0x4B, 0x03, // ALR #$03
            0xBB, 0x20, 0x00, // LAS $0020,Y
        ]);
        cpu.a = 0xF3;
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0xF0);
        assert!(cpu.p.c(), "ANC copies N into C");

        cpu.a = 0x03;
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0x01, "AND then LSR");
        assert!(cpu.p.c(), "shifted-out bit lands in carry");

        {
            let mut bus = system_bus(&mut nes);
            bus.write(0x0020, 0xF5);
        }
        cpu.y = 0;
        cpu.s = 0x5A;
        run_one(&mut cpu, &mut nes);
        assert_eq!(cpu.a, 0x50);
        assert_eq!(cpu.x, 0x50);
        assert_eq!(cpu.s, 0x50, "LAS folds memory into S as well");
    }

    #[test]
    fn stack_pointer_stays_in_page_one() {
        let (mut cpu, mut nes) = cpu_with_program(&[0x48; 64]); // PHA x64
        cpu.s = 0x10;
        for _ in 0..40 {
            run_one(&mut cpu, &mut nes);
        }
        // Wraps within the page rather than escaping it.
        assert!(cpu.s <= 0xFF);
        let mut bus = system_bus(&mut nes);
        let _ = bus.read(0x0100 | cpu.s as u16);
    }
}
