use std::fmt;

use crate::{TbError, TbResult};

/// Legal operations of the multiplier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u64)]
pub enum Operation {
    Mul = 1,
}

impl Operation {
    pub const ALL: [Operation; 1] = [Operation::Mul];

    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> TbResult<Self> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.code() == code)
            .ok_or(TbError::IllegalOpcode(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::Mul => "MUL",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stimulus item handed to the driver. Operands are raw 32-bit bus values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub operand_a: u32,
    pub operand_b: u32,
    pub operation: Operation,
}

impl Command {
    pub fn new(operand_a: u32, operand_b: u32, operation: Operation) -> Self {
        Self {
            operand_a,
            operand_b,
            operation,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08x} {} 0x{:08x}",
            self.operand_a, self.operation, self.operand_b
        )
    }
}

/// A command as sampled from the pins when `start` rose. The opcode is kept
/// raw; turning it into an [`Operation`] is the checker's job.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObservedCommand {
    pub edge: u64,
    pub operand_a: u32,
    pub operand_b: u32,
    pub opcode: u64,
}

impl ObservedCommand {
    pub fn command(&self) -> TbResult<Command> {
        Ok(Command::new(
            self.operand_a,
            self.operand_b,
            Operation::from_code(self.opcode)?,
        ))
    }
}

/// What the result observer reports for the oldest outstanding operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResultEvent {
    /// `done` rose; `value` is the result bus read as a signed 64-bit integer.
    Completed { edge: u64, value: i64 },
    /// No `done` within the configured bound after the command was issued.
    TimedOut { issued_at: u64, waited: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trip() {
        assert_eq!(Operation::from_code(1).unwrap(), Operation::Mul);
        assert_eq!(Operation::Mul.code(), 1);
    }

    #[test]
    fn illegal_opcode_is_rejected() {
        assert!(matches!(Operation::from_code(0), Err(TbError::IllegalOpcode(0))));
        assert!(matches!(Operation::from_code(5), Err(TbError::IllegalOpcode(5))));
    }

    #[test]
    fn command_display() {
        let cmd = Command::new(16, 0xffff_ffff, Operation::Mul);
        assert_eq!(cmd.to_string(), "0x00000010 MUL 0xffffffff");
    }

    #[test]
    fn observed_command_with_bad_opcode() {
        let obs = ObservedCommand {
            edge: 3,
            operand_a: 1,
            operand_b: 2,
            opcode: 6,
        };
        assert!(obs.command().is_err());
    }
}
