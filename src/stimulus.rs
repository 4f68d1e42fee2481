//! Operand generation policies and the command sequences built from them.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::transaction::{Command, Operation};

/// Produces the operand pair for the next command.
pub trait OperandGen {
    fn generate_operands(&mut self) -> (u32, u32);
}

/// Uniformly random 32-bit operands from a seeded generator.
pub struct RandomOperands {
    rng: StdRng,
}

impl RandomOperands {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl OperandGen for RandomOperands {
    fn generate_operands(&mut self) -> (u32, u32) {
        (self.rng.gen(), self.rng.gen())
    }
}

/// Always the same operand pair.
pub struct FixedOperands(pub u32, pub u32);

impl FixedOperands {
    /// Largest positive signed operands.
    pub fn max() -> Self {
        FixedOperands(0x7fff_ffff, 0x7fff_ffff)
    }

    /// Most negative signed operands.
    pub fn min() -> Self {
        FixedOperands(0x8000_0000, 0x8000_0000)
    }
}

impl OperandGen for FixedOperands {
    fn generate_operands(&mut self) -> (u32, u32) {
        (self.0, self.1)
    }
}

/// Lazily issues every legal operation `iterations` times, drawing operands
/// from `gen` for each command.
pub struct OpSequence {
    gen: Box<dyn OperandGen>,
    remaining: u32,
    next_op: usize,
}

impl OpSequence {
    pub fn new(gen: Box<dyn OperandGen>, iterations: u32) -> Self {
        Self {
            gen,
            remaining: iterations,
            next_op: Operation::ALL.len(),
        }
    }
}

impl Iterator for OpSequence {
    type Item = Command;

    fn next(&mut self) -> Option<Command> {
        loop {
            if let Some(op) = Operation::ALL.get(self.next_op).copied() {
                self.next_op += 1;
                let (a, b) = self.gen.generate_operands();
                return Some(Command::new(a, b, op));
            }
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            self.next_op = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_is_reproducible() {
        let mut a = RandomOperands::new(42);
        let mut b = RandomOperands::new(42);
        for _ in 0..16 {
            assert_eq!(a.generate_operands(), b.generate_operands());
        }
    }

    #[test]
    fn sequence_covers_every_operation_per_iteration() {
        let cmds: Vec<_> = OpSequence::new(Box::new(FixedOperands::min()), 3).collect();
        assert_eq!(cmds.len(), 3 * Operation::ALL.len());
        assert!(cmds
            .iter()
            .all(|c| c.operand_a == 0x8000_0000 && c.operand_b == 0x8000_0000));
        for op in Operation::ALL {
            assert!(cmds.iter().any(|c| c.operation == op));
        }
    }

    #[test]
    fn zero_iterations_is_empty() {
        assert_eq!(OpSequence::new(Box::new(FixedOperands::max()), 0).count(), 0);
    }
}
