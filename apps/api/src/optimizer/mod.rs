// Line capacity optimizer.
// Rows -> per-step capacity model -> phase 1 balancing -> phase 2 bottleneck expansion.
// Pure and synchronous; every phase returns a fresh step collection.

pub mod balancer;
pub mod capacity;
pub mod expander;
pub mod models;
pub mod report;

use anyhow::{ensure, Result};

pub use models::CapacityRow;
pub use report::{optimize_line, LineOptimization, OptimizationResult};

/// Tunables for both optimization phases.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    /// Upper bound on machines added during bottleneck expansion.
    pub max_new_machines: u32,
    /// A step is overloaded above `average * overload_threshold`.
    pub overload_threshold: f64,
    /// Share of an overloaded step's excess moved per transfer.
    pub transfer_fraction: f64,
    /// Expansion stops once output reaches `average * early_stop_fraction`.
    pub early_stop_fraction: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_new_machines: 2,
            overload_threshold: 1.1,
            transfer_fraction: 0.2,
            early_stop_fraction: 0.95,
        }
    }
}

impl OptimizerSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.overload_threshold.is_finite() && self.overload_threshold >= 1.0,
            "OVERLOAD_THRESHOLD must be >= 1.0"
        );
        ensure!(
            self.transfer_fraction > 0.0 && self.transfer_fraction <= 1.0,
            "TRANSFER_FRACTION must be in (0, 1]"
        );
        ensure!(
            self.early_stop_fraction > 0.0 && self.early_stop_fraction <= 1.0,
            "EARLY_STOP_FRACTION must be in (0, 1]"
        );
        Ok(())
    }
}
