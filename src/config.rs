//! Run configuration, loadable from TOML.
//!
//! ```toml
//! reset_cycles = 2
//! timeout_cycles = 80
//! max_cycles = 10000
//! drain_cycles = 2
//! iterations = 4
//! seed = 1234
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::{TbError, TbResult};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Edges for which reset is held after time zero.
    pub reset_cycles: u64,
    /// Edges an issued operation may take before it is reported as timed
    /// out. `None` disables the check and leaves stalls to `max_cycles`.
    pub timeout_cycles: Option<u64>,
    /// Hard limit on the length of a run, in edges.
    pub max_cycles: u64,
    /// Extra edges simulated after the last result, to catch stray strobes.
    pub drain_cycles: u64,
    /// How many times every legal operation is issued by a stimulus sequence.
    pub iterations: u32,
    /// Seed for random stimulus; a fresh one is drawn when unset.
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            reset_cycles: 2,
            timeout_cycles: Some(80),
            max_cycles: 10_000,
            drain_cycles: 2,
            iterations: 1,
            seed: None,
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(src: &str) -> TbResult<Self> {
        let config: HarnessConfig =
            toml::from_str(src).map_err(|e| TbError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> TbResult<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> TbResult<()> {
        if self.timeout_cycles == Some(0) {
            return Err(TbError::Config(
                "timeout_cycles must be at least 1".to_string(),
            ));
        }
        if self.max_cycles <= self.reset_cycles {
            return Err(TbError::Config(format!(
                "max_cycles ({}) leaves no room after {} reset cycles",
                self.max_cycles, self.reset_cycles
            )));
        }
        Ok(())
    }
}
