//! Instruction tracing and disassembly helpers.
//!
//! Produces log lines in the de-facto community format:
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5     A:00 X:00 Y:00 P:24 SP:FD
//! ```
//!
//! which makes execution traces directly diffable against reference logs.

use std::fmt;

use crate::cpu::{CpuSnapshot, addressing::Addressing, instruction::Instruction, lookup::LOOKUP_TABLE};

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ISC and SHS circulate under several names; print the common ones.
        let name = match self {
            Instruction::ISC => "ISB",
            Instruction::SHS => "TAS",
            Instruction::ASR => "ALR",
            Instruction::SBX => "AXS",
            other => return write!(f, "{other:?}"),
        };
        f.write_str(name)
    }
}

/// Decoded metadata for one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeMeta {
    pub instruction: Instruction,
    pub addressing: Addressing,
    /// Total instruction length in bytes, including the opcode.
    pub len: u16,
}

/// Returns the operation, addressing mode, and byte length for an opcode.
pub fn opcode_meta(opcode: u8) -> OpcodeMeta {
    let entry = LOOKUP_TABLE[opcode as usize];
    OpcodeMeta {
        instruction: entry.instruction,
        addressing: entry.addressing,
        len: 1 + entry.addressing.operand_len(),
    }
}

/// One fully formatted trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine {
    pub snapshot: CpuSnapshot,
    pub opcode: u8,
    /// Operand bytes following the opcode (only `len - 1` are meaningful).
    pub operands: [u8; 2],
}

impl TraceLine {
    /// Builds a trace record from a register snapshot and the three bytes at
    /// `PC` (opcode plus up to two operands).
    pub fn new(snapshot: CpuSnapshot, bytes: [u8; 3]) -> Self {
        Self {
            snapshot,
            opcode: bytes[0],
            operands: [bytes[1], bytes[2]],
        }
    }

    fn operand_text(&self) -> String {
        let meta = opcode_meta(self.opcode);
        let [lo, hi] = self.operands;
        let word = u16::from_le_bytes([lo, hi]);
        match meta.addressing {
            Addressing::Implied => String::new(),
            Addressing::Accumulator => "A".into(),
            Addressing::Immediate => format!("#${lo:02X}"),
            Addressing::ZeroPage => format!("${lo:02X}"),
            Addressing::ZeroPageX => format!("${lo:02X},X"),
            Addressing::ZeroPageY => format!("${lo:02X},Y"),
            Addressing::Absolute => format!("${word:04X}"),
            Addressing::AbsoluteX => format!("${word:04X},X"),
            Addressing::AbsoluteY => format!("${word:04X},Y"),
            Addressing::Indirect => format!("(${word:04X})"),
            Addressing::IndirectX => format!("(${lo:02X},X)"),
            Addressing::IndirectY => format!("(${lo:02X}),Y"),
            Addressing::Relative => {
                // Branch targets print absolutely, as reference logs do.
                let target = self
                    .snapshot
                    .pc
                    .wrapping_add(2)
                    .wrapping_add(lo as i8 as u16);
                format!("${target:04X}")
            }
        }
    }
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = opcode_meta(self.opcode);
        let s = self.snapshot;

        let mut bytes = format!("{:02X}", self.opcode);
        for i in 0..(meta.len - 1) as usize {
            bytes.push_str(&format!(" {:02X}", self.operands[i]));
        }

        write!(
            f,
            "{:04X}  {:<8}  {} {:<12} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            s.pc,
            bytes,
            meta.instruction,
            self.operand_text(),
            s.a,
            s.x,
            s.y,
            s.p,
            s.s,
        )
    }
}
