use futures::StreamExt;
use futures_channel::mpsc::UnboundedReceiver;
use log::{error, info};
use std::collections::VecDeque;

use crate::model::predict;
use crate::transaction::{Command, ObservedCommand, ResultEvent};
use crate::{TaskResult, TbObj, TbResult, Val};

/// Outcome of checking one command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Passed { actual: i64 },
    Mismatch { expected: i64, actual: i64 },
    Timeout { issued_at: u64, waited: u64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CheckRecord {
    pub index: u64,
    pub command: Command,
    pub outcome: Outcome,
}

impl CheckRecord {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed { .. })
    }
}

struct ScoreboardInner {
    cmd_q: VecDeque<ObservedCommand>,
    commands: UnboundedReceiver<ObservedCommand>,
    records: Vec<CheckRecord>,
    // results that arrived with no command to pair them with
    orphans: Vec<ResultEvent>,
}

/// Pairs every result with the oldest unmatched command and checks it
/// against the reference model.
#[derive(Clone)]
pub struct Scoreboard(TbObj<ScoreboardInner>);

impl Scoreboard {
    pub fn new(commands: UnboundedReceiver<ObservedCommand>) -> Self {
        Self(TbObj::new(ScoreboardInner {
            cmd_q: VecDeque::new(),
            commands,
            records: Vec::new(),
            orphans: Vec::new(),
        }))
    }

    // moves everything the command observer has produced so far into cmd_q
    fn pull_commands(inner: &mut ScoreboardInner) {
        while let Ok(Some(cmd)) = inner.commands.try_next() {
            inner.cmd_q.push_back(cmd);
        }
    }

    /// Checks one result event. A result without a pending command is
    /// recorded as a protocol violation; an opcode outside the legal set
    /// is a contract violation and returned as an error.
    pub fn check(&self, event: ResultEvent) -> TbResult<()> {
        let mut inner = self.0.get_mut();
        Self::pull_commands(&mut inner);
        let observed = match inner.cmd_q.pop_front() {
            Some(cmd) => cmd,
            None => {
                match event {
                    ResultEvent::Completed { edge, value } => error!(
                        "edge {}: CRITICAL: result {} (0x{:016x}) had no command",
                        edge, value, value
                    ),
                    ResultEvent::TimedOut { issued_at, .. } => error!(
                        "CRITICAL: timeout for operation issued at edge {} had no command",
                        issued_at
                    ),
                }
                inner.orphans.push(event);
                return Ok(());
            }
        };
        let command = observed.command()?;
        let index = inner.records.len() as u64;
        let outcome = match event {
            ResultEvent::Completed { edge, value } => {
                let expected = predict(command.operand_a, command.operand_b, command.operation);
                if expected == value {
                    info!("edge {}: PASSED: {} = {}", edge, command, value);
                    Outcome::Passed { actual: value }
                } else {
                    error!(
                        "edge {}: FAILED: {} = {} expected {}",
                        edge, command, value, expected
                    );
                    Outcome::Mismatch {
                        expected,
                        actual: value,
                    }
                }
            }
            ResultEvent::TimedOut { issued_at, waited } => {
                error!(
                    "FAILED: {} issued at edge {} timed out after {} edges",
                    command, issued_at, waited
                );
                Outcome::Timeout { issued_at, waited }
            }
        };
        inner.records.push(CheckRecord {
            index,
            command,
            outcome,
        });
        Ok(())
    }

    pub async fn run(self, mut results: UnboundedReceiver<ResultEvent>) -> TaskResult {
        while let Some(event) = results.next().await {
            self.check(event)?;
        }
        Ok(Val::Int(self.0.get().records.len() as i64))
    }

    /// Commands paired with a result or a timeout so far.
    pub fn resolved(&self) -> u64 {
        self.0.get().records.len() as u64
    }

    pub fn protocol_violations(&self) -> usize {
        self.0.get().orphans.len()
    }

    pub fn records(&self) -> Vec<CheckRecord> {
        self.0.get().records.clone()
    }

    pub fn orphans(&self) -> Vec<ResultEvent> {
        self.0.get().orphans.clone()
    }

    /// Observed commands that never got a result. Call at end of run.
    pub fn unmatched(&self) -> Vec<ObservedCommand> {
        let mut inner = self.0.get_mut();
        Self::pull_commands(&mut inner);
        inner.cmd_q.iter().copied().collect()
    }
}
