//! Edge-synchronized observers.
//!
//! Both observers are built from the same pieces: an [`EdgeDetector`] fed with
//! the level of a strobe every clock edge, a typed capture of the bus values
//! that belong to the strobe, and an [`AnalysisPort`] fanning the captured
//! transaction out to any number of unbounded queues.

#![allow(unreachable_code)]

use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::{debug, warn};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::sim_if::{get_int, Signal, SimIf};
use crate::transaction::{ObservedCommand, ResultEvent};
use crate::trigger::Clock;
use crate::{TaskResult, Val};

/// Rising-edge detection on a level-sampled strobe.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    prev: u64,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self { prev: 0 }
    }

    /// Feed the current level; true on a 0 -> 1 transition.
    pub fn rising(&mut self, level: u64) -> bool {
        let rose = self.prev == 0 && level == 1;
        self.prev = level;
        rose
    }
}

/// Broadcasts transactions to every connected queue.
pub struct AnalysisPort<T: Clone> {
    subscribers: Vec<UnboundedSender<T>>,
}

impl<T: Clone> AnalysisPort<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    pub fn connect(&mut self) -> UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn write(&self, data: T) {
        for sub in self.subscribers.iter() {
            // a dropped subscriber simply stops listening
            let _ = sub.unbounded_send(data.clone());
        }
    }
}

impl<T: Clone> Default for AnalysisPort<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Captures operands and opcode whenever `start` rises.
pub struct CommandMonitor {
    bus: Rc<dyn SimIf>,
    clock: Clock,
    start: EdgeDetector,
    port: AnalysisPort<ObservedCommand>,
}

impl CommandMonitor {
    pub fn new(bus: Rc<dyn SimIf>, clock: Clock, port: AnalysisPort<ObservedCommand>) -> Self {
        Self {
            bus,
            clock,
            start: EdgeDetector::new(),
            port,
        }
    }

    pub fn sample(&mut self, edge: u64) -> Option<ObservedCommand> {
        let bus = self.bus.as_ref();
        if !self.start.rising(get_int(bus, Signal::Start)) {
            return None;
        }
        Some(ObservedCommand {
            edge,
            operand_a: get_int(bus, Signal::OperandA) as u32,
            operand_b: get_int(bus, Signal::OperandB) as u32,
            opcode: get_int(bus, Signal::Opcode),
        })
    }

    pub async fn run(mut self) -> TaskResult {
        loop {
            let edge = self.clock.rising_edge().await;
            if let Some(cmd) = self.sample(edge) {
                debug!("edge {}: MONITORED command {:?}", edge, cmd);
                self.port.write(cmd);
            }
        }
        Ok(Val::None)
    }
}

/// Captures the result bus whenever `done` rises, and reports operations
/// that did not complete within `timeout` edges of being issued.
pub struct ResultMonitor {
    bus: Rc<dyn SimIf>,
    clock: Clock,
    done: EdgeDetector,
    issue: EdgeDetector,
    timeout: Option<u64>,
    // edges at which the operations still waiting for `done` were issued
    in_flight: VecDeque<u64>,
    port: AnalysisPort<ResultEvent>,
}

impl ResultMonitor {
    pub fn new(
        bus: Rc<dyn SimIf>,
        clock: Clock,
        timeout: Option<u64>,
        port: AnalysisPort<ResultEvent>,
    ) -> Self {
        Self {
            bus,
            clock,
            done: EdgeDetector::new(),
            issue: EdgeDetector::new(),
            timeout,
            in_flight: VecDeque::new(),
            port,
        }
    }

    pub fn sample(&mut self, edge: u64) -> Option<ResultEvent> {
        let bus = self.bus.as_ref();
        if self.issue.rising(get_int(bus, Signal::Start)) {
            self.in_flight.push_back(edge);
        }
        if self.done.rising(get_int(bus, Signal::Done)) {
            self.in_flight.pop_front();
            return Some(ResultEvent::Completed {
                edge,
                value: get_int(bus, Signal::Result) as i64,
            });
        }
        let bound = self.timeout?;
        let issued_at = *self.in_flight.front()?;
        let waited = edge - issued_at;
        if waited >= bound {
            self.in_flight.pop_front();
            return Some(ResultEvent::TimedOut { issued_at, waited });
        }
        None
    }

    pub async fn run(mut self) -> TaskResult {
        loop {
            let edge = self.clock.rising_edge().await;
            match self.sample(edge) {
                Some(ev @ ResultEvent::Completed { .. }) => {
                    debug!("edge {}: MONITORED result {:?}", edge, ev);
                    self.port.write(ev);
                }
                Some(ev @ ResultEvent::TimedOut { issued_at, waited }) => {
                    warn!(
                        "edge {}: no done for operation issued at edge {} after {} edges",
                        edge, issued_at, waited
                    );
                    self.port.write(ev);
                }
                None => {}
            }
        }
        Ok(Val::None)
    }
}
