//! Behavioral model of a sequential 32x32 signed multiplier with a
//! start/done handshake, used to exercise the harness without an HDL
//! simulator.

use std::collections::VecDeque;

use crate::model::to_signed;
use crate::sim::{Circuit, CircuitInputs, CircuitOutputs};
use crate::transaction::Operation;

/// Defects that can be injected into [`SeqMultiplier`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Multiplies the operands as unsigned numbers.
    UnsignedProduct,
    /// Only the low 32 bits of the product are produced (sign-extended).
    Truncate32,
    /// Accepts the first command and never asserts `done`.
    Hang,
    /// Pulses `done` twice for every operation.
    DoubleDone,
}

#[derive(Debug)]
struct Job {
    a: u32,
    b: u32,
    opcode: u64,
    remaining: u32,
}

#[derive(Debug)]
pub struct SeqMultiplier {
    latency: u32,
    done_width: u32,
    fault: Option<Fault>,
    job: Option<Job>,
    // done values for the coming edges
    pulses: VecDeque<bool>,
    result: Option<u64>,
    completed: u64,
}

impl SeqMultiplier {
    /// `latency` is the number of edges between sampling `start` and
    /// asserting `done` (at least 1).
    pub fn new(latency: u32) -> Self {
        Self {
            latency: latency.max(1),
            done_width: 1,
            fault: None,
            job: None,
            pulses: VecDeque::new(),
            result: None,
            completed: 0,
        }
    }

    /// Number of edges `done` stays high per completion.
    pub fn with_done_width(mut self, width: u32) -> Self {
        self.done_width = width.max(1);
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    fn compute(&self, job: &Job) -> i64 {
        if Operation::from_code(job.opcode).is_err() {
            return 0;
        }
        let product = to_signed(job.a) as i64 * to_signed(job.b) as i64;
        match self.fault {
            Some(Fault::UnsignedProduct) => (job.a as u64 * job.b as u64) as i64,
            Some(Fault::Truncate32) => product as i32 as i64,
            _ => product,
        }
    }

    fn schedule_done(&mut self) {
        let width = self.done_width as usize;
        self.pulses.extend(std::iter::repeat(true).take(width));
        if self.fault == Some(Fault::DoubleDone) {
            self.pulses.push_back(false);
            self.pulses.extend(std::iter::repeat(true).take(width));
        }
    }
}

impl Circuit for SeqMultiplier {
    fn clock_edge(&mut self, inputs: &CircuitInputs) -> CircuitOutputs {
        if inputs.rst == 1 {
            self.job = None;
            self.pulses.clear();
            self.result = Some(0);
            return CircuitOutputs {
                done: Some(0),
                result: self.result,
            };
        }

        let mut finished = None;
        if let Some(job) = self.job.as_mut() {
            if self.fault != Some(Fault::Hang) {
                job.remaining -= 1;
                if job.remaining == 0 {
                    finished = self.job.take();
                }
            }
        } else if inputs.start == 1 {
            self.job = Some(Job {
                a: inputs.operand_a as u32,
                b: inputs.operand_b as u32,
                opcode: inputs.opcode,
                remaining: self.latency,
            });
        }

        if let Some(job) = finished {
            self.result = Some(self.compute(&job) as u64);
            self.completed += 1;
            self.schedule_done();
        }

        let done = self.pulses.pop_front().unwrap_or(false);
        CircuitOutputs {
            done: Some(done as u64),
            result: self.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> CircuitInputs {
        CircuitInputs::default()
    }

    fn start(a: u32, b: u32) -> CircuitInputs {
        CircuitInputs {
            operand_a: a as u64,
            operand_b: b as u64,
            opcode: 1,
            start: 1,
            ..Default::default()
        }
    }

    fn run(dut: &mut SeqMultiplier, a: u32, b: u32, edges: usize) -> Vec<CircuitOutputs> {
        let mut out = vec![dut.clock_edge(&start(a, b))];
        for _ in 1..edges {
            out.push(dut.clock_edge(&idle()));
        }
        out
    }

    #[test]
    fn done_after_latency() {
        let mut dut = SeqMultiplier::new(3);
        let out = run(&mut dut, 0xffff_ffff, 5, 6);
        let done: Vec<_> = out.iter().map(|o| o.done.unwrap()).collect();
        assert_eq!(done, vec![0, 0, 0, 1, 0, 0]);
        assert_eq!(out[3].result, Some((-5i64) as u64));
        assert_eq!(dut.completed(), 1);
    }

    #[test]
    fn wide_done_pulse() {
        let mut dut = SeqMultiplier::new(1).with_done_width(3);
        let out = run(&mut dut, 2, 3, 6);
        let done: Vec<_> = out.iter().map(|o| o.done.unwrap()).collect();
        assert_eq!(done, vec![0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn start_ignored_while_busy() {
        let mut dut = SeqMultiplier::new(4);
        dut.clock_edge(&start(2, 2));
        dut.clock_edge(&start(9, 9));
        dut.clock_edge(&idle());
        dut.clock_edge(&idle());
        let out = dut.clock_edge(&idle());
        assert_eq!(out.done, Some(1));
        assert_eq!(out.result, Some(4));
    }

    #[test]
    fn reset_clears_state() {
        let mut dut = SeqMultiplier::new(2);
        dut.clock_edge(&start(2, 2));
        let out = dut.clock_edge(&CircuitInputs {
            rst: 1,
            ..Default::default()
        });
        assert_eq!(out, CircuitOutputs { done: Some(0), result: Some(0) });
        let out = run(&mut dut, 0, 0, 4);
        assert_eq!(out.iter().filter(|o| o.done == Some(1)).count(), 1);
    }

    #[test]
    fn faults() {
        let mut dut = SeqMultiplier::new(1).with_fault(Fault::UnsignedProduct);
        let out = run(&mut dut, 0xffff_ffff, 1, 2);
        assert_eq!(out[1].result, Some(0xffff_ffff));

        let mut dut = SeqMultiplier::new(1).with_fault(Fault::Truncate32);
        let out = run(&mut dut, 0x10000, 0x10000, 2);
        assert_eq!(out[1].result, Some(0));

        let mut dut = SeqMultiplier::new(1).with_fault(Fault::Hang);
        let out = run(&mut dut, 1, 1, 20);
        assert!(out.iter().all(|o| o.done == Some(0)));

        let mut dut = SeqMultiplier::new(1).with_fault(Fault::DoubleDone);
        let out = run(&mut dut, 1, 1, 5);
        let done: Vec<_> = out.iter().map(|o| o.done.unwrap()).collect();
        assert_eq!(done, vec![0, 1, 0, 1, 0]);
    }
}
