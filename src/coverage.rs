use fasthash::sea;
use futures::StreamExt;
use futures_channel::mpsc::UnboundedReceiver;
use log::{error, info};
use std::collections::HashMap;

use crate::transaction::{ObservedCommand, Operation};
use crate::{TaskResult, TbObj, Val};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageReport {
    /// Hit count per legal operation, in enumeration order.
    pub hits: Vec<(Operation, u64)>,
    /// Legal operations never exercised.
    pub missed: Vec<Operation>,
}

impl CoverageReport {
    pub fn closed(&self) -> bool {
        self.missed.is_empty()
    }
}

// Hit count per operation. Sampled every command, so keyed with SeaHash
// rather than SipHash.
type Bins = HashMap<Operation, u64, sea::Hash64>;

/// Functional coverage over the opcodes seen on the command pins.
#[derive(Clone)]
pub struct Coverage(TbObj<Bins>);

impl Coverage {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Coverage(TbObj::new(HashMap::with_hasher(sea::Hash64)))
    }

    /// Illegal opcodes are not coverage; the scoreboard rejects them.
    pub fn sample(&self, cmd: &ObservedCommand) {
        if let Ok(op) = Operation::from_code(cmd.opcode) {
            *self.0.get_mut().entry(op).or_insert(0) += 1;
        }
    }

    pub async fn run(self, mut commands: UnboundedReceiver<ObservedCommand>) -> TaskResult {
        while let Some(cmd) = commands.next().await {
            self.sample(&cmd);
        }
        Ok(Val::Int(self.0.get().len() as i64))
    }

    pub fn missing(&self) -> Vec<Operation> {
        let bins = self.0.get();
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| !bins.contains_key(op))
            .collect()
    }

    pub fn report(&self) -> CoverageReport {
        let bins = self.0.get();
        let hits = Operation::ALL
            .iter()
            .map(|op| (*op, bins.get(op).copied().unwrap_or(0)))
            .collect();
        drop(bins);
        let missed = self.missing();
        if missed.is_empty() {
            info!("Covered all operations");
        } else {
            error!("Functional coverage error. Missed: {:?}", missed);
        }
        CoverageReport { hits, missed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(opcode: u64) -> ObservedCommand {
        ObservedCommand {
            edge: 0,
            operand_a: 0,
            operand_b: 0,
            opcode,
        }
    }

    #[test]
    fn empty_run_misses_everything() {
        let cov = Coverage::new();
        let report = cov.report();
        assert!(!report.closed());
        assert_eq!(report.missed, Operation::ALL.to_vec());
    }

    #[test]
    fn closure_after_every_operation() {
        let cov = Coverage::new();
        for op in Operation::ALL {
            cov.sample(&cmd(op.code()));
        }
        cov.sample(&cmd(Operation::Mul.code()));
        let report = cov.report();
        assert!(report.closed());
        assert_eq!(report.hits, vec![(Operation::Mul, 2)]);
    }

    #[test]
    fn illegal_opcodes_do_not_count() {
        let cov = Coverage::new();
        cov.sample(&cmd(0));
        cov.sample(&cmd(6));
        assert_eq!(cov.missing(), vec![Operation::Mul]);
    }
}
