//! Minimal clocked scheduler standing in for an HDL simulator.
//!
//! One call to [`Sim::step`] is one rising clock edge:
//! 1. tasks waiting on the edge are woken and run until all of them suspend,
//!    reading the values committed before the edge;
//! 2. the circuit samples the committed inputs and produces its new outputs;
//! 3. outputs are committed, then the writes the tasks made in (1).
//!
//! Every task therefore sees the same values for a given edge, and a value
//! driven at edge N is sampled by the circuit at edge N+1.

use log::trace;
use once_cell::unsync::OnceCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Instant;

use crate::executor::{Executor, JoinHandle, Spawner};
use crate::sim_if::{get_int, Signal, SimIf};
use crate::trigger::Clock;
use crate::{TaskResult, TbError, TbObj, TbResult};

/// Input pins as seen by the circuit at a clock edge (X/Z read as 0).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitInputs {
    pub rst: u64,
    pub operand_a: u64,
    pub operand_b: u64,
    pub opcode: u64,
    pub start: u64,
}

/// Output pins after a clock edge. `None` leaves a pin undriven.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CircuitOutputs {
    pub done: Option<u64>,
    pub result: Option<u64>,
}

/// The circuit under test, evaluated once per rising edge.
pub trait Circuit {
    fn clock_edge(&mut self, inputs: &CircuitInputs) -> CircuitOutputs;
}

struct PinState {
    values: [Option<u64>; Signal::COUNT],
    pending: Vec<(Signal, u64)>,
}

/// Pin bank shared by the scheduler and the testbench tasks.
#[derive(Clone)]
pub struct PinBus(TbObj<PinState>);

impl PinBus {
    pub fn new() -> Self {
        PinBus(TbObj::new(PinState {
            values: [None; Signal::COUNT],
            pending: Vec::new(),
        }))
    }

    pub(crate) fn inputs(&self) -> CircuitInputs {
        CircuitInputs {
            rst: get_int(self, Signal::Rst),
            operand_a: get_int(self, Signal::OperandA),
            operand_b: get_int(self, Signal::OperandB),
            opcode: get_int(self, Signal::Opcode),
            start: get_int(self, Signal::Start),
        }
    }

    pub(crate) fn apply_outputs(&self, outputs: CircuitOutputs) {
        self.0.with_mut(|p| {
            p.values[Signal::Done.index()] = outputs.done.map(|v| Signal::Done.mask(v));
            p.values[Signal::Result.index()] = outputs.result;
        });
    }

    /// Makes pending testbench writes visible, in the order they were made.
    pub fn commit(&self) {
        self.0.with_mut(|p| {
            for (sig, value) in std::mem::take(&mut p.pending) {
                p.values[sig.index()] = Some(value);
            }
        });
    }
}

impl Default for PinBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimIf for PinBus {
    fn get_value(&self, sig: Signal) -> Option<u64> {
        self.0.get().values[sig.index()]
    }

    fn set_value(&self, sig: Signal, value: u64) -> TbResult<()> {
        if !sig.is_driven() {
            return Err(TbError::ReadOnlySignal(sig));
        }
        self.0.get_mut().pending.push((sig, sig.mask(value)));
        Ok(())
    }
}

/// Outcome of [`Sim::run_until`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The stop condition held after `cycles` edges.
    Stopped { cycles: u64 },
    /// The edge budget ran out first.
    BudgetExhausted { cycles: u64 },
}

pub struct Sim {
    executor: Executor,
    clock: Clock,
    bus: PinBus,
    circuit: Box<dyn Circuit>,
    started: OnceCell<Instant>,
}

impl Sim {
    pub fn new(circuit: Box<dyn Circuit>) -> Self {
        Self {
            executor: Executor::new(),
            clock: Clock::new(),
            bus: PinBus::new(),
            circuit,
            started: OnceCell::new(),
        }
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }

    pub fn bus(&self) -> Rc<dyn SimIf> {
        Rc::new(self.bus.clone())
    }

    pub fn spawner(&self) -> Spawner {
        self.executor.spawner()
    }

    pub fn spawn(
        &self,
        name: &str,
        future: impl Future<Output = TaskResult> + 'static,
    ) -> JoinHandle {
        self.executor.spawner().spawn(name, future)
    }

    pub fn cycles(&self) -> u64 {
        self.clock.edge()
    }

    /// Seconds of wall-clock time since the first edge.
    pub fn elapsed_secs(&self) -> f64 {
        self.started
            .get()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Runs tasks that are ready before any edge (time zero) and commits
    /// their writes.
    pub fn settle(&mut self) {
        self.executor.run_once();
        self.bus.commit();
    }

    /// Advances one rising edge. Returns the edge index.
    pub fn step(&mut self) -> u64 {
        self.started.get_or_init(Instant::now);
        let edge = self.clock.advance();
        self.executor.run_once();
        let inputs = self.bus.inputs();
        let outputs = self.circuit.clock_edge(&inputs);
        trace!("edge {}: {:?} -> {:?}", edge, inputs, outputs);
        self.bus.apply_outputs(outputs);
        self.bus.commit();
        edge
    }

    /// Steps until `stop` returns true (checked after every edge) or until
    /// `max_cycles` edges have elapsed in total.
    pub fn run_until(&mut self, max_cycles: u64, mut stop: impl FnMut(&Sim) -> bool) -> RunStatus {
        self.settle();
        while self.cycles() < max_cycles {
            self.step();
            if stop(self) {
                return RunStatus::Stopped {
                    cycles: self.cycles(),
                };
            }
        }
        RunStatus::BudgetExhausted {
            cycles: self.cycles(),
        }
    }

    pub fn live_tasks(&self) -> usize {
        self.executor.live_tasks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Val;

    // Registers `start` into `done` and the A operand into the result.
    struct Echo;

    impl Circuit for Echo {
        fn clock_edge(&mut self, inputs: &CircuitInputs) -> CircuitOutputs {
            CircuitOutputs {
                done: Some(inputs.start),
                result: Some(inputs.operand_a),
            }
        }
    }

    #[test]
    fn outputs_are_read_only() {
        let bus = PinBus::new();
        assert!(matches!(
            bus.set_value(Signal::Result, 1),
            Err(TbError::ReadOnlySignal(Signal::Result))
        ));
        assert!(bus.set_value(Signal::Start, 1).is_ok());
    }

    #[test]
    fn writes_are_deferred_until_commit() {
        let bus = PinBus::new();
        assert_eq!(bus.get_value(Signal::OperandA), None);
        bus.set_value(Signal::OperandA, 0x1_0000_0005).unwrap();
        bus.set_value(Signal::OperandA, 7).unwrap();
        assert_eq!(get_int(&bus, Signal::OperandA), 0);
        bus.commit();
        assert_eq!(bus.get_value(Signal::OperandA), Some(7));
    }

    #[test]
    fn circuit_samples_previous_edge_writes() {
        let mut sim = Sim::new(Box::new(Echo));
        let bus = sim.bus();
        let clock = sim.clock();
        let seen = TbObj::new(Vec::new());
        {
            let seen = seen.clone();
            sim.spawn("drive", async move {
                bus.set_value(Signal::Start, 0)?;
                for edge in 1..=4u64 {
                    clock.rising_edge().await;
                    seen.get_mut().push(get_int(bus.as_ref(), Signal::Done));
                    bus.set_value(Signal::Start, (edge == 1) as u64)?;
                }
                Ok(Val::None)
            });
        }
        let status = sim.run_until(10, |s| s.live_tasks() == 0);
        assert_eq!(status, RunStatus::Stopped { cycles: 4 });
        // start=1 written at edge 1, sampled by the circuit at edge 2,
        // done visible to the task at edge 3
        assert_eq!(*seen.get(), vec![0, 0, 1, 0]);
    }

    #[test]
    fn budget_is_enforced() {
        let mut sim = Sim::new(Box::new(Echo));
        assert_eq!(
            sim.run_until(25, |_| false),
            RunStatus::BudgetExhausted { cycles: 25 }
        );
    }
}
