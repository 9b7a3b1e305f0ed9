//! Wait node - compute a bounded delay for the coordinator to honor.
//!
//! The executor never sleeps itself. It reports the delay and the
//! coordinator suspends the run for that long before moving on.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::item::ExecutionItem;

/// Upper bound on a single wait.
pub const MAX_DELAY_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
}

impl WaitUnit {
    fn millis(&self) -> f64 {
        match self {
            WaitUnit::Seconds => 1_000.0,
            WaitUnit::Minutes => 60_000.0,
            WaitUnit::Hours => 3_600_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_amount")]
    pub amount: f64,
    #[serde(default)]
    pub unit: WaitUnit,
}

fn default_amount() -> f64 {
    1.0
}

/// Delay in milliseconds, capped at [`MAX_DELAY_MS`]. Negative or
/// non-finite amounts collapse to zero.
pub fn compute_delay_ms(config: &WaitConfig) -> u64 {
    let raw = config.amount * config.unit.millis();
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    (raw as u64).min(MAX_DELAY_MS)
}

pub fn run(items: &[ExecutionItem], _config: &WaitConfig) -> Result<Vec<ExecutionItem>> {
    Ok(items.to_vec())
}
