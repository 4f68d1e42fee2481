//! Wires the components of one verification run together and runs it to
//! completion.

use log::{error, info};

use crate::bfm::Bfm;
use crate::config::HarnessConfig;
use crate::coverage::Coverage;
use crate::report::TestReport;
use crate::scoreboard::Scoreboard;
use crate::sim::{Circuit, RunStatus, Sim};
use crate::stimulus::{OpSequence, OperandGen};
use crate::transaction::Command;
use crate::{TaskResult, TbObj, TbResult, Val};

pub struct Testbench {
    name: String,
    config: HarnessConfig,
}

impl Testbench {
    pub fn new(name: &str, config: HarnessConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs every legal operation `config.iterations` times with operands
    /// drawn from `gen`.
    pub fn run_stimulus(
        &self,
        circuit: Box<dyn Circuit>,
        gen: Box<dyn OperandGen>,
    ) -> TbResult<TestReport> {
        self.run(circuit, OpSequence::new(gen, self.config.iterations))
    }

    /// Resets `circuit`, sends `commands` through the driver in order and
    /// checks every result. Returns `Err` only on a contract violation or an
    /// infrastructure failure; failed checks end up in the report.
    ///
    /// `commands` must be finite: whatever is left of it when the run stops
    /// early is counted as unissued.
    pub fn run<I>(&self, circuit: Box<dyn Circuit>, commands: I) -> TbResult<TestReport>
    where
        I: IntoIterator<Item = Command>,
        I::IntoIter: 'static,
    {
        self.config.validate()?;
        info!("TEST {}: starting", self.name);

        let mut sim = Sim::new(circuit);
        let mut bfm = Bfm::new(&sim, &self.config);
        let scoreboard = Scoreboard::new(bfm.connect_commands()?);
        let coverage = Coverage::new();
        sim.spawn("coverage", coverage.clone().run(bfm.connect_commands()?));
        let mut checker = sim.spawn("scoreboard", scoreboard.clone().run(bfm.connect_results()?));
        let stats = bfm.stats();
        let stimulus = TbObj::new(commands.into_iter());
        let mut test = sim.spawn(
            &self.name,
            run_sequence(
                bfm,
                scoreboard.clone(),
                stimulus.clone(),
                self.config.drain_cycles,
            ),
        );

        let mut finished = None;
        let mut fatal = None;
        let status = sim.run_until(self.config.max_cycles, |_| {
            if let Some(Err(e)) = checker.try_join() {
                fatal = Some(e);
                return true;
            }
            if scoreboard.protocol_violations() > 0 {
                return true;
            }
            finished = test.try_join();
            finished.is_some()
        });

        if let Some(e) = fatal {
            error!("TEST {}: aborted: {}", self.name, e);
            return Err(e);
        }
        if let Some(Err(e)) = finished {
            error!("TEST {}: aborted: {}", self.name, e);
            return Err(e);
        }

        // still in the command slot, plus never taken from the source
        let unissued = {
            let stats = stats.get();
            stats.offered - stats.issued
        } + stimulus.get_mut().by_ref().count() as u64;

        let report = TestReport {
            name: self.name.clone(),
            records: scoreboard.records(),
            orphans: scoreboard.orphans(),
            abandoned: scoreboard.unmatched(),
            unissued,
            coverage: coverage.report(),
            cycles: sim.cycles(),
            wall_secs: sim.elapsed_secs(),
            budget_exhausted: matches!(status, RunStatus::BudgetExhausted { .. }),
        };
        report.log_summary();
        Ok(report)
    }
}

// Test body: reset, feed every command, wait until each issued command has
// been resolved, then let a few quiet edges pass to catch stray strobes.
async fn run_sequence<I: Iterator<Item = Command>>(
    mut bfm: Bfm,
    scoreboard: Scoreboard,
    commands: TbObj<I>,
    drain_cycles: u64,
) -> TaskResult {
    bfm.reset().await?;
    bfm.start_tasks()?;
    let mut sent = 0;
    loop {
        let next = commands.get_mut().next();
        let cmd = match next {
            Some(cmd) => cmd,
            None => break,
        };
        bfm.send_op(cmd).await?;
        sent += 1;
    }
    while scoreboard.resolved() < bfm.issued() {
        bfm.clock().rising_edge().await;
    }
    bfm.clock().clock_cycles(drain_cycles).await;
    Ok(Val::Int(sent))
}
