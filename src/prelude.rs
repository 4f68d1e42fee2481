pub use crate::circuit::{Fault, SeqMultiplier};
pub use crate::config::HarnessConfig;
pub use crate::junit::{write_junit, write_junit_file};
pub use crate::report::{summary_table, TestReport};
pub use crate::scoreboard::{CheckRecord, Outcome};
pub use crate::sim::{Circuit, CircuitInputs, CircuitOutputs};
pub use crate::stimulus::{FixedOperands, OpSequence, OperandGen, RandomOperands};
pub use crate::testbench::Testbench;
pub use crate::transaction::{Command, Operation, ResultEvent};
pub use crate::{TaskResult, TbError, TbObj, TbResult, Val};
