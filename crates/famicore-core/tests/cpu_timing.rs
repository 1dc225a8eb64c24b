//! Cycle-count conformance tests for the documented instruction set.
//!
//! Expected values come from the MOS 6502 datasheet timing tables, not from
//! the emulator's own tables, so a transcription slip in either place shows
//! up as a failure here.

use famicore_core::{Nes, cartridge::Cartridge};

/// Builds a console whose ROM holds `program` at `$8000`.
fn nes_with_program(program: &[u8]) -> Nes {
    let mut rom = vec![
        b'N', b'E', b'S', 0x1A, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ];
    let mut bank = vec![0u8; 16 * 1024];
    bank[..program.len()].copy_from_slice(program);
    bank[0x3FFC] = 0x00;
    bank[0x3FFD] = 0x80;
    rom.extend(bank);
    Nes::new(Cartridge::new(&rom).expect("test cartridge"))
}

/// Runs a single instruction and returns its cycle count.
fn time_one(program: &[u8], setup: impl FnOnce(&mut Nes)) -> u32 {
    let mut nes = nes_with_program(program);
    setup(&mut nes);
    nes.step_instruction()
}

#[test]
fn load_instruction_timings() {
    let cases: &[(&[u8], u32, &str)] = &[
        (&[0xA9, 0x00], 2, "LDA #imm"),
        (&[0xA5, 0x10], 3, "LDA zp"),
        (&[0xB5, 0x10], 4, "LDA zp,X"),
        (&[0xAD, 0x00, 0x03], 4, "LDA abs"),
        (&[0xBD, 0x00, 0x03], 4, "LDA abs,X (no cross)"),
        (&[0xB9, 0x00, 0x03], 4, "LDA abs,Y (no cross)"),
        (&[0xA1, 0x10], 6, "LDA (zp,X)"),
        (&[0xB1, 0x10], 5, "LDA (zp),Y (no cross)"),
        (&[0xA2, 0x00], 2, "LDX #imm"),
        (&[0xB6, 0x10], 4, "LDX zp,Y"),
        (&[0xA0, 0x00], 2, "LDY #imm"),
    ];
    for &(program, expected, what) in cases {
        assert_eq!(time_one(program, |_| ()), expected, "{what}");
    }
}

#[test]
fn store_instruction_timings_never_vary_with_crossing() {
    let cases: &[(&[u8], u32, &str)] = &[
        (&[0x85, 0x10], 3, "STA zp"),
        (&[0x95, 0x10], 4, "STA zp,X"),
        (&[0x8D, 0x00, 0x03], 4, "STA abs"),
        (&[0x9D, 0xFF, 0x03], 5, "STA abs,X"),
        (&[0x99, 0xFF, 0x03], 5, "STA abs,Y"),
        (&[0x81, 0x10], 6, "STA (zp,X)"),
        (&[0x91, 0x10], 6, "STA (zp),Y"),
        (&[0x86, 0x10], 3, "STX zp"),
        (&[0x84, 0x10], 3, "STY zp"),
    ];
    for &(program, expected, what) in cases {
        // Index far enough to cross pages; stores must not care.
        assert_eq!(
            time_one(program, |nes| {
                nes.cpu.x = 0xFF;
                nes.cpu.y = 0xFF;
            }),
            expected,
            "{what}"
        );
    }
}

#[test]
fn page_cross_penalties_for_reads() {
    // LDA $03FF,X with X=1 crosses into $0400.
    assert_eq!(
        time_one(&[0xBD, 0xFF, 0x03], |nes| nes.cpu.x = 1),
        5,
        "LDA abs,X crossing"
    );
    assert_eq!(
        time_one(&[0xB9, 0xFF, 0x03], |nes| nes.cpu.y = 1),
        5,
        "LDA abs,Y crossing"
    );
    // (zp),Y crossing: seed the $10 pointer with $03FF, then add Y=1.
    let mut nes = nes_with_program(&[
        0xA9, 0xFF, 0x85, 0x10, // LDA #$FF / STA $10
        0xA9, 0x03, 0x85, 0x11, // LDA #$03 / STA $11
        0xA0, 0x01, // LDY #$01
        0xB1, 0x10, // LDA ($10),Y -> $0400
    ]);
    for _ in 0..5 {
        nes.step_instruction();
    }
    assert_eq!(nes.step_instruction(), 6, "LDA (zp),Y crossing");
}

#[test]
fn rmw_and_shift_timings() {
    let cases: &[(&[u8], u32, &str)] = &[
        (&[0x0A], 2, "ASL A"),
        (&[0x06, 0x10], 5, "ASL zp"),
        (&[0x16, 0x10], 6, "ASL zp,X"),
        (&[0x0E, 0x00, 0x03], 6, "ASL abs"),
        (&[0x1E, 0xFF, 0x03], 7, "ASL abs,X (fixed, even crossing)"),
        (&[0xE6, 0x10], 5, "INC zp"),
        (&[0xEE, 0x00, 0x03], 6, "INC abs"),
        (&[0xC6, 0x10], 5, "DEC zp"),
    ];
    for &(program, expected, what) in cases {
        assert_eq!(
            time_one(program, |nes| nes.cpu.x = 0xFF),
            expected,
            "{what}"
        );
    }
}

#[test]
fn stack_and_flow_timings() {
    let cases: &[(&[u8], u32, &str)] = &[
        (&[0x48], 3, "PHA"),
        (&[0x08], 3, "PHP"),
        (&[0x68], 4, "PLA"),
        (&[0x28], 4, "PLP"),
        (&[0x4C, 0x00, 0x80], 3, "JMP abs"),
        (&[0x6C, 0x00, 0x03], 5, "JMP (ind)"),
        (&[0x20, 0x00, 0x80], 6, "JSR"),
        (&[0x00, 0x00], 7, "BRK"),
        (&[0xEA], 2, "NOP"),
        (&[0xE8], 2, "INX"),
        (&[0xAA], 2, "TAX"),
        (&[0x18], 2, "CLC"),
    ];
    for &(program, expected, what) in cases {
        assert_eq!(time_one(program, |_| ()), expected, "{what}");
    }
}

#[test]
fn rts_and_rti_cost_six() {
    // JSR straight into an RTS.
    let mut nes = nes_with_program(&[0x20, 0x05, 0x80, 0xEA, 0xEA, 0x60]);
    assert_eq!(nes.step_instruction(), 6, "JSR");
    assert_eq!(nes.step_instruction(), 6, "RTS");

    // RTI from a stack frame built by push instructions.
    let mut nes = nes_with_program(&[
        0xA9, 0x80, 0x48, // LDA #$80 / PHA  (PCH)
        0xA9, 0x06, 0x48, // LDA #$06 / PHA  (PCL -> $8006)
        0xA9, 0x24, 0x48, // LDA #$24 / PHA  (P)
        0x40, // RTI
    ]);
    for _ in 0..6 {
        nes.step_instruction();
    }
    assert_eq!(nes.step_instruction(), 6, "RTI");
    assert_eq!(nes.cpu.pc, 0x8006);
}

#[test]
fn branch_timings_cover_all_three_outcomes() {
    // Not taken: 2 cycles.
    assert_eq!(
        time_one(&[0xD0, 0x10], |nes| nes.cpu.p.insert(
            famicore_core::cpu::status::Status::ZERO
        )),
        2,
        "BNE not taken"
    );
    // Taken, same page: 3 cycles.
    assert_eq!(time_one(&[0xD0, 0x10], |_| ()), 3, "BNE taken");
    // Taken with page cross: 4 cycles (branch backwards past $8000).
    assert_eq!(time_one(&[0xD0, 0x80], |_| ()), 4, "BNE taken, crossing");
}

#[test]
fn undocumented_rmw_combos_match_their_documented_cousins() {
    // SLO/RLA/SRE/RRA/DCP/ISC take RMW timing, one cycle over the read op.
    let cases: &[(&[u8], u32, &str)] = &[
        (&[0x07, 0x10], 5, "SLO zp"),
        (&[0x27, 0x10], 5, "RLA zp"),
        (&[0x47, 0x10], 5, "SRE zp"),
        (&[0x67, 0x10], 5, "RRA zp"),
        (&[0xC7, 0x10], 5, "DCP zp"),
        (&[0xE7, 0x10], 5, "ISC zp"),
        (&[0x1F, 0xFF, 0x03], 7, "SLO abs,X (fixed)"),
        (&[0xDB, 0xFF, 0x03], 7, "DCP abs,Y (fixed)"),
        (&[0xA7, 0x10], 3, "LAX zp reads like LDA zp"),
        (&[0x87, 0x10], 3, "SAX zp stores like STA zp"),
    ];
    for &(program, expected, what) in cases {
        assert_eq!(
            time_one(program, |nes| {
                nes.cpu.x = 0xFF;
                nes.cpu.y = 0xFF;
            }),
            expected,
            "{what}"
        );
    }
}

#[test]
fn interrupt_entry_costs_seven() {
    let mut nes = nes_with_program(&[0xEA, 0xEA]);
    nes.cpu.signal_nmi();
    assert_eq!(nes.step_instruction(), 7);
}
