//! Transaction-level verification harness for a clocked 32x32 signed
//! multiplier with a start/done handshake.
//!
//! A [`testbench::Testbench`] owns a cycle-stepped [`sim::Sim`] holding the
//! circuit under test. Testbench components run as cooperative tasks that
//! await clock edges:
//! the driver ([`driver::Driver`]) puts commands on the pins, two observers
//! ([`monitor::CommandMonitor`], [`monitor::ResultMonitor`]) turn pin activity
//! back into transactions, and the [`scoreboard::Scoreboard`] and
//! [`coverage::Coverage`] consume them.

pub mod bfm;
pub mod circuit;
pub mod config;
pub mod coverage;
pub mod driver;
mod error;
pub mod executor;
pub mod junit;
pub mod model;
pub mod monitor;
pub mod prelude;
pub mod report;
pub mod scoreboard;
pub mod sim;
pub mod sim_if;
pub mod stimulus;
mod tb_obj;
pub mod testbench;
pub mod transaction;
pub mod trigger;
mod value;

pub use error::{TbError, TbResult};
pub use tb_obj::TbObj;
pub use value::Val;

/// What every spawned task resolves to.
pub type TaskResult = Result<Val, TbError>;
