#![allow(unreachable_code)]

use futures_channel::mpsc::Receiver;
use log::{debug, warn};
use std::rc::Rc;

use crate::sim_if::{get_int, Signal, SimIf};
use crate::transaction::Command;
use crate::trigger::Clock;
use crate::{TaskResult, TbObj, TbResult, Val};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// start is low and no operation is outstanding.
    Idle,
    /// start was raised on this edge.
    Issued,
    /// An issued operation has not signalled done yet, or done is still high.
    Waiting,
}

/// Counters the driver shares with whoever waits for the run to drain.
#[derive(Debug, Default)]
pub struct DriverStats {
    /// Commands producers have handed to the command channel.
    pub offered: u64,
    /// Commands put on the pins.
    pub issued: u64,
}

/// Drives commands from the command channel onto the pins using the
/// start/done handshake. `start` is a single-edge strobe; a new command is
/// only taken once the previous one has signalled `done` and `done` has
/// dropped again, or once it has been given up on after `timeout` edges.
pub struct Driver {
    bus: Rc<dyn SimIf>,
    clock: Clock,
    commands: Receiver<Command>,
    timeout: Option<u64>,
    outstanding: bool,
    issued_at: u64,
    stats: TbObj<DriverStats>,
}

impl Driver {
    pub fn new(
        bus: Rc<dyn SimIf>,
        clock: Clock,
        commands: Receiver<Command>,
        timeout: Option<u64>,
        stats: TbObj<DriverStats>,
    ) -> Self {
        Self {
            bus,
            clock,
            commands,
            timeout,
            outstanding: false,
            issued_at: 0,
            stats,
        }
    }

    fn drive_idle(&self) -> TbResult<()> {
        let bus = self.bus.as_ref();
        bus.set_value(Signal::Start, 0)?;
        bus.set_value(Signal::OperandA, 0)?;
        bus.set_value(Signal::OperandB, 0)?;
        bus.set_value(Signal::Opcode, 0)
    }

    fn drive_command(&self, cmd: &Command) -> TbResult<()> {
        let bus = self.bus.as_ref();
        bus.set_value(Signal::OperandA, cmd.operand_a as u64)?;
        bus.set_value(Signal::OperandB, cmd.operand_b as u64)?;
        bus.set_value(Signal::Opcode, cmd.operation.code())?;
        bus.set_value(Signal::Start, 1)
    }

    /// One clock edge of the handshake.
    pub fn on_edge(&mut self, edge: u64) -> TbResult<DriverState> {
        let st = get_int(self.bus.as_ref(), Signal::Start);
        let dn = get_int(self.bus.as_ref(), Signal::Done);
        if dn == 1 {
            self.outstanding = false;
        }
        // The result observer sees `start` one edge after it is driven and
        // reports the timeout `timeout` edges later; release on that edge.
        if let (true, Some(bound)) = (self.outstanding, self.timeout) {
            if edge.saturating_sub(self.issued_at) > bound {
                warn!(
                    "edge {}: giving up on operation issued at edge {}",
                    edge, self.issued_at
                );
                self.outstanding = false;
            }
        }

        if st == 1 {
            // single-cycle strobe
            self.bus.set_value(Signal::Start, 0)?;
            return Ok(DriverState::Waiting);
        }
        if dn == 1 || self.outstanding {
            return Ok(DriverState::Waiting);
        }

        match self.commands.try_next() {
            Ok(Some(cmd)) => {
                debug!("edge {}: driving {}", edge, cmd);
                self.drive_command(&cmd)?;
                self.outstanding = true;
                self.issued_at = edge;
                self.stats.get_mut().issued += 1;
                Ok(DriverState::Issued)
            }
            // empty or closed: keep the pins quiet and the clock running
            _ => {
                self.drive_idle()?;
                Ok(DriverState::Idle)
            }
        }
    }

    pub async fn run(mut self) -> TaskResult {
        self.drive_idle()?;
        loop {
            let edge = self.clock.rising_edge().await;
            self.on_edge(edge)?;
        }
        Ok(Val::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{CircuitOutputs, PinBus};
    use crate::transaction::Operation;
    use futures_channel::mpsc;

    struct Fixture {
        pins: PinBus,
        driver: Driver,
        tx: mpsc::Sender<Command>,
        stats: TbObj<DriverStats>,
    }

    fn fixture() -> Fixture {
        fixture_with_timeout(None)
    }

    fn fixture_with_timeout(timeout: Option<u64>) -> Fixture {
        let pins = PinBus::new();
        let (tx, rx) = mpsc::channel(0);
        let stats = TbObj::new(DriverStats::default());
        let driver = Driver::new(
            Rc::new(pins.clone()),
            Clock::new(),
            rx,
            timeout,
            stats.clone(),
        );
        Fixture {
            pins,
            driver,
            tx,
            stats,
        }
    }

    fn done(pins: &PinBus, level: u64) {
        pins.apply_outputs(CircuitOutputs {
            done: Some(level),
            result: Some(0),
        });
    }

    fn edge(f: &mut Fixture, n: u64) -> DriverState {
        let state = f.driver.on_edge(n).unwrap();
        f.pins.commit();
        state
    }

    #[test]
    fn idles_without_commands() {
        let mut f = fixture();
        for n in 1..5 {
            assert_eq!(edge(&mut f, n), DriverState::Idle);
        }
        assert_eq!(f.pins.get_value(Signal::Start), Some(0));
        assert_eq!(f.pins.get_value(Signal::OperandA), Some(0));
    }

    #[test]
    fn full_handshake() {
        let mut f = fixture();
        f.tx.try_send(Command::new(16, 16, Operation::Mul)).unwrap();
        assert_eq!(edge(&mut f, 1), DriverState::Issued);
        assert_eq!(f.pins.get_value(Signal::Start), Some(1));
        assert_eq!(f.pins.get_value(Signal::OperandA), Some(16));
        assert_eq!(f.pins.get_value(Signal::Opcode), Some(1));

        // start drops on the very next edge
        assert_eq!(edge(&mut f, 2), DriverState::Waiting);
        assert_eq!(f.pins.get_value(Signal::Start), Some(0));

        // second command queued while the first is still running
        f.tx.try_send(Command::new(2, 3, Operation::Mul)).unwrap();
        assert_eq!(edge(&mut f, 3), DriverState::Waiting);
        assert_eq!(edge(&mut f, 4), DriverState::Waiting);
        assert_eq!(f.pins.get_value(Signal::OperandA), Some(16));

        done(&f.pins, 1);
        assert_eq!(edge(&mut f, 5), DriverState::Waiting);
        done(&f.pins, 0);
        assert_eq!(edge(&mut f, 6), DriverState::Issued);
        assert_eq!(f.pins.get_value(Signal::OperandA), Some(2));
        assert_eq!(f.stats.get().issued, 2);
    }

    #[test]
    fn waits_for_wide_done_to_drop() {
        let mut f = fixture();
        f.tx.try_send(Command::new(1, 1, Operation::Mul)).unwrap();
        edge(&mut f, 1);
        edge(&mut f, 2);
        f.tx.try_send(Command::new(5, 5, Operation::Mul)).unwrap();
        done(&f.pins, 1);
        for n in 3..6 {
            assert_eq!(edge(&mut f, n), DriverState::Waiting);
        }
        done(&f.pins, 0);
        assert_eq!(edge(&mut f, 6), DriverState::Issued);
    }

    #[test]
    fn stalled_operation_is_released_after_timeout() {
        let mut f = fixture_with_timeout(Some(3));
        f.tx.try_send(Command::new(1, 1, Operation::Mul)).unwrap();
        assert_eq!(edge(&mut f, 1), DriverState::Issued);
        f.tx.try_send(Command::new(7, 7, Operation::Mul)).unwrap();
        for n in 2..5 {
            assert_eq!(edge(&mut f, n), DriverState::Waiting);
        }
        // same edge the result observer reports the timeout
        assert_eq!(edge(&mut f, 5), DriverState::Issued);
        assert_eq!(f.pins.get_value(Signal::OperandA), Some(7));
        assert_eq!(f.stats.get().issued, 2);
    }

    #[test]
    fn without_timeout_stall_is_permanent() {
        let mut f = fixture();
        f.tx.try_send(Command::new(1, 1, Operation::Mul)).unwrap();
        edge(&mut f, 1);
        f.tx.try_send(Command::new(7, 7, Operation::Mul)).unwrap();
        for n in 2..200 {
            assert_eq!(edge(&mut f, n), DriverState::Waiting);
        }
    }

    #[test]
    fn closed_channel_idles() {
        let mut f = fixture();
        f.tx.close_channel();
        assert_eq!(edge(&mut f, 1), DriverState::Idle);
    }
}
