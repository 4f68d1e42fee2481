use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use std::io::Write;
use std::path::Path;

use crate::report::TestReport;
use crate::{TbError, TbResult};

/// Writes one JUnit test suite with a test case per report.
pub fn write_junit<W: Write>(suite: &str, reports: &[TestReport], sink: W) -> TbResult<()> {
    let mut test_cases = Vec::new();

    for r in reports {
        let time = Duration::seconds_f64(r.wall_secs);
        let tc = match r.failure() {
            None => TestCaseBuilder::success(&r.name, time),
            Some(reason) => TestCaseBuilder::failure(&r.name, time, "failure", &reason),
        }
        .build();
        test_cases.push(tc);
    }

    let test_suite = TestSuiteBuilder::new(suite)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    report
        .write_xml(sink)
        .map_err(|e| TbError::Report(e.to_string()))
}

pub fn write_junit_file(
    suite: &str,
    reports: &[TestReport],
    path: impl AsRef<Path>,
) -> TbResult<()> {
    let file = std::fs::File::create(path).map_err(|e| TbError::Report(e.to_string()))?;
    write_junit(suite, reports, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CoverageReport;
    use crate::transaction::Operation;

    fn report(name: &str, missed: Vec<Operation>) -> TestReport {
        TestReport {
            name: name.to_string(),
            records: Vec::new(),
            orphans: Vec::new(),
            abandoned: Vec::new(),
            unissued: 0,
            coverage: CoverageReport {
                hits: Vec::new(),
                missed,
            },
            cycles: 10,
            wall_secs: 0.25,
            budget_exhausted: false,
        }
    }

    #[test]
    fn one_case_per_report() {
        let mut xml = Vec::new();
        let reports = [
            report("max_operands", Vec::new()),
            report("no_stimulus", vec![Operation::Mul]),
        ];
        write_junit("multb", &reports, &mut xml).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains("multb"));
        assert!(xml.contains("max_operands"));
        assert!(xml.contains("no_stimulus"));
        assert_eq!(xml.matches("<failure").count(), 1);
        assert!(xml.contains("coverage not closed"));
    }
}
