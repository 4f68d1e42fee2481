use std::fmt;

use crate::TbResult;

/// Pins of the multiplier's clocked interface. The clock itself is not a pin
/// here; it is owned by the scheduler and exposed through [`crate::trigger::Clock`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    Rst,
    OperandA,
    OperandB,
    Opcode,
    Start,
    Done,
    Result,
}

impl Signal {
    pub const COUNT: usize = 7;

    pub const ALL: [Signal; Signal::COUNT] = [
        Signal::Rst,
        Signal::OperandA,
        Signal::OperandB,
        Signal::Opcode,
        Signal::Start,
        Signal::Done,
        Signal::Result,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::Rst => "rst",
            Signal::OperandA => "mc",
            Signal::OperandB => "mp",
            Signal::Opcode => "op",
            Signal::Start => "start",
            Signal::Done => "done",
            Signal::Result => "p",
        }
    }

    pub fn width(self) -> u32 {
        match self {
            Signal::Rst | Signal::Start | Signal::Done => 1,
            Signal::OperandA | Signal::OperandB => 32,
            Signal::Opcode => 3,
            Signal::Result => 64,
        }
    }

    /// Inputs of the circuit, i.e. the signals the testbench is allowed to drive.
    pub fn is_driven(self) -> bool {
        !matches!(self, Signal::Done | Signal::Result)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn mask(self, value: u64) -> u64 {
        match self.width() {
            64 => value,
            w => value & ((1u64 << w) - 1),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Level-sampled access to the circuit's signals.
///
/// `get_value` returns `None` for undriven or indeterminate values. Writes are
/// inertial: a value set while handling edge N becomes visible once edge N has
/// been fully processed, so every reader sees the same values for a given edge.
pub trait SimIf {
    fn get_value(&self, sig: Signal) -> Option<u64>;
    fn set_value(&self, sig: Signal, value: u64) -> TbResult<()>;
}

/// Read a bus as an integer, turning X/Z into 0.
#[inline]
pub fn get_int(sim: &dyn SimIf, sig: Signal) -> u64 {
    sim.get_value(sig).unwrap_or(0)
}
