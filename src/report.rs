//! End-of-run verdicts and the summary table.

use log::{error, info};
use num_format::{Locale, ToFormattedString};
use prettytable::{Cell, Row, Table};

use crate::coverage::CoverageReport;
use crate::scoreboard::{CheckRecord, Outcome};
use crate::transaction::{ObservedCommand, ResultEvent};

/// Everything observed during one test run.
#[derive(Clone, Debug)]
pub struct TestReport {
    pub name: String,
    pub records: Vec<CheckRecord>,
    /// Results that arrived with no command to pair them with.
    pub orphans: Vec<ResultEvent>,
    /// Commands observed on the pins that never got a result.
    pub abandoned: Vec<ObservedCommand>,
    /// Stimulus that never reached the pins: left in the command slot or
    /// never taken from the source when the run stopped.
    pub unissued: u64,
    pub coverage: CoverageReport,
    pub cycles: u64,
    pub wall_secs: f64,
    /// The run hit `max_cycles` before the test finished.
    pub budget_exhausted: bool,
}

impl TestReport {
    pub fn passed_count(&self) -> usize {
        self.records.iter().filter(|r| r.passed()).count()
    }

    pub fn mismatch_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Mismatch { .. }))
            .count()
    }

    pub fn timeout_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Timeout { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.len() - self.passed_count()
    }

    pub fn passed(&self) -> bool {
        self.failures().is_empty()
    }

    /// Every reason the run failed, most severe first.
    pub fn failures(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.orphans.is_empty() {
            reasons.push(format!(
                "protocol violation: {} result(s) without a command",
                self.orphans.len()
            ));
        }
        if self.failed_count() > 0 {
            reasons.push(format!(
                "{} of {} checks failed ({} mismatches, {} timeouts)",
                self.failed_count(),
                self.records.len(),
                self.mismatch_count(),
                self.timeout_count()
            ));
        }
        if self.budget_exhausted {
            reasons.push(format!("run did not finish within {} cycles", self.cycles));
        }
        if !self.abandoned.is_empty() {
            reasons.push(format!(
                "{} command(s) never produced a result",
                self.abandoned.len()
            ));
        }
        if self.unissued > 0 {
            reasons.push(format!("{} command(s) never issued", self.unissued));
        }
        if !self.coverage.closed() {
            let missed: Vec<_> = self.coverage.missed.iter().map(|op| op.name()).collect();
            reasons.push(format!("coverage not closed, missed {}", missed.join(", ")));
        }
        reasons
    }

    /// All failure reasons on one line, `None` for a passing run.
    pub fn failure(&self) -> Option<String> {
        let reasons = self.failures();
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }

    pub fn log_summary(&self) {
        let cycles = self.cycles.to_formatted_string(&Locale::en);
        let speed = if self.wall_secs > 0.0 {
            ((self.cycles as f64 / self.wall_secs) as u64).to_formatted_string(&Locale::en)
        } else {
            "-".to_string()
        };
        match self.failure() {
            None => info!(
                "TEST {}: passed, checks={}, cycles={}, time={:.3}s, speed={} cycles/s",
                self.name,
                self.records.len(),
                cycles,
                self.wall_secs,
                speed
            ),
            Some(reason) => error!(
                "TEST {}: failed ({}), cycles={}, time={:.3}s",
                self.name, reason, cycles, self.wall_secs
            ),
        }
    }
}

pub fn summary_table(reports: &[TestReport]) -> Table {
    let titles = [
        "TEST", "RESULT", "CHECKS", "PASSED", "MISMATCH", "TIMEOUT", "UNISSUED", "CYCLES",
        "TIME (s)",
    ];
    let mut table = Table::new();
    table.set_titles(Row::new(titles.iter().map(|t| Cell::new(t)).collect()));
    for r in reports {
        table.add_row(Row::new(vec![
            Cell::new(&r.name),
            Cell::new(if r.passed() { "PASS" } else { "FAIL" }),
            Cell::new(&r.records.len().to_string()),
            Cell::new(&r.passed_count().to_string()),
            Cell::new(&r.mismatch_count().to_string()),
            Cell::new(&r.timeout_count().to_string()),
            Cell::new(&r.unissued.to_string()),
            Cell::new(&r.cycles.to_formatted_string(&Locale::en)),
            Cell::new(&format!("{:.3}", r.wall_secs)),
        ]));
    }
    table
}
