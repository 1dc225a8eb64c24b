/// Base cycle cost of an opcode, tagged with how indexing affects it.
///
/// `Normal` entries are fixed-cost (stores and read-modify-writes already
/// include the indexing cycle). `Cross` entries pay one extra cycle when the
/// effective address crosses a page. `Branch` entries pay one cycle when the
/// branch is taken and another when the target crosses a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cycle {
    Normal(u8),
    Cross(u8),
    Branch(u8),
}

const fn n(cycle: u8) -> Cycle {
    Cycle::Normal(cycle)
}

const fn c(cycle: u8) -> Cycle {
    Cycle::Cross(cycle)
}

const fn b(cycle: u8) -> Cycle {
    Cycle::Branch(cycle)
}

impl Cycle {
    pub const fn base(self) -> u32 {
        match self {
            Cycle::Normal(cycle) | Cycle::Cross(cycle) | Cycle::Branch(cycle) => cycle as u32,
        }
    }

    /// Total cost given the page-cross and branch-taken outcomes.
    pub const fn total(self, page_crossed: bool, branch_taken: bool) -> u32 {
        let mut total = self.base();
        match self {
            Cycle::Normal(_) => {}
            Cycle::Cross(_) => {
                if page_crossed {
                    total += 1;
                }
            }
            Cycle::Branch(_) => {
                if branch_taken {
                    total += 1;
                    if page_crossed {
                        total += 1;
                    }
                }
            }
        }
        total
    }
}

/// Base cycles for all 256 opcodes.
///
/// JAM opcodes are listed at 2 cycles: the hardware wedges its bus cycle
/// forever, but the emulator must keep PPU/APU time flowing while `PC` stays
/// frozen so the host can detect the hang.
#[rustfmt::skip]
pub static CYCLE_TABLE: [Cycle; 256] = [
    n(7), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(3), n(2), n(2), n(2), n(3), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(6), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(4), n(2), n(2), n(2), n(5), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), n(6), n(2), n(6), n(4), n(4), n(4), n(4), n(2), n(5), n(2), n(5), n(5), n(5), n(5), n(5),
    n(2), n(6), n(2), n(6), n(3), n(3), n(3), n(3), n(2), n(2), n(2), n(2), n(4), n(4), n(4), n(4),
    b(2), c(5), n(2), c(5), n(4), n(4), n(4), n(4), n(2), c(4), n(2), c(4), c(4), c(4), c(4), c(4),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
    n(2), n(6), n(2), n(8), n(3), n(3), n(5), n(5), n(2), n(2), n(2), n(2), n(4), n(4), n(6), n(6),
    b(2), c(5), n(2), n(8), n(4), n(4), n(6), n(6), n(2), c(4), n(2), n(7), c(4), c(4), n(7), n(7),
];
