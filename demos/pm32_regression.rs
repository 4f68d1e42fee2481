//! Regression over the behavioral multiplier: random operands, then the
//! largest and the most negative signed operands.
//!
//! ```text
//! RUST_LOG=info cargo run --example pm32_regression [config.toml]
//! ```

use multb::prelude::*;

fn main() -> TbResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig {
            iterations: 100,
            ..Default::default()
        },
    };

    let random: Box<dyn OperandGen> = match config.seed {
        Some(seed) => Box::new(RandomOperands::new(seed)),
        None => Box::new(RandomOperands::from_entropy()),
    };
    let tests: Vec<(&str, Box<dyn OperandGen>)> = vec![
        ("random_operands", random),
        ("max_operands", Box::new(FixedOperands::max())),
        ("min_operands", Box::new(FixedOperands::min())),
    ];

    let mut reports = Vec::new();
    for (name, gen) in tests {
        let tb = Testbench::new(name, config.clone());
        reports.push(tb.run_stimulus(Box::new(SeqMultiplier::new(34)), gen)?);
    }

    summary_table(&reports).printstd();
    write_junit_file("pm32", &reports, "results.xml")?;

    if reports.iter().all(|r| r.passed()) {
        Ok(())
    } else {
        std::process::exit(1)
    }
}
