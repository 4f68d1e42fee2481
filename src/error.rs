//! Harness error type.
//!
//! Per-operation failures (mismatches, timeouts) are recorded by the
//! scoreboard as data and never surface here. `TbError` covers the structural
//! problems that abort a run or a setup step.

use crate::sim_if::Signal;

pub type TbResult<T> = Result<T, TbError>;

#[derive(Debug, thiserror::Error)]
pub enum TbError {
    /// The reference model was handed an opcode outside the legal set.
    #[error("contract violation: illegal opcode {0:#x}")]
    IllegalOpcode(u64),

    /// The testbench tried to drive a signal owned by the circuit.
    #[error("signal '{0}' is read-only")]
    ReadOnlySignal(Signal),

    /// The command channel was closed while a producer was still sending.
    #[error("command channel closed")]
    ChannelClosed,

    /// Background tasks were started twice on the same bus-functional model.
    #[error("bus-functional model tasks already started")]
    AlreadyStarted,

    /// A spawned task was dropped before it produced a result.
    #[error("task '{0}' was dropped before completion")]
    TaskDropped(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write report: {0}")]
    Report(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_opcode_display() {
        let e = TbError::IllegalOpcode(7);
        assert_eq!(e.to_string(), "contract violation: illegal opcode 0x7");
    }

    #[test]
    fn read_only_display() {
        let e = TbError::ReadOnlySignal(Signal::Done);
        assert_eq!(e.to_string(), "signal 'done' is read-only");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let e: TbError = io.into();
        assert!(e.to_string().starts_with("failed to read configuration:"));
    }
}
