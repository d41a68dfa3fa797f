use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::OptimizeError;
use crate::optimizer::balancer::{balance, Transfer};
use crate::optimizer::capacity::build_steps;
use crate::optimizer::expander::expand;
use crate::optimizer::models::{
    average_capacity, bottleneck, system_output, CapacityRow, OptimizationAction, ProcessStep,
};
use crate::optimizer::OptimizerSettings;

/// Full outcome of one optimization run, before wire formatting.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub before: Vec<ProcessStep>,
    pub after: Vec<ProcessStep>,
    pub average: f64,
    pub current_output: f64,
    pub optimized_output: f64,
    /// `None` when the line produced nothing before optimization.
    pub improvement_pct: Option<f64>,
    pub transfers: Vec<Transfer>,
    pub actions: Vec<OptimizationAction>,
    pub machines_added: u32,
    pub max_new_machines: u32,
}

/// Runs the capacity model and both phases over raw rows.
pub fn optimize_line(
    rows: &[CapacityRow],
    settings: &OptimizerSettings,
) -> Result<OptimizationResult, OptimizeError> {
    let before = build_steps(rows)?;
    let current_output = system_output(&before);

    let (balanced, average, transfers) = match balance(&before, settings) {
        Ok(outcome) => (outcome.steps, outcome.average, outcome.transfers),
        Err(OptimizeError::DegenerateInput { steps }) => {
            warn!("Skipping line balancing: only {steps} process step(s)");
            (before.clone(), average_capacity(&before), Vec::new())
        }
        Err(e) => return Err(e),
    };

    for t in &transfers {
        debug!(
            "Moved {:.1}/day from step {} to step {}",
            t.amount, t.from_step, t.to_step
        );
    }

    let expansion = expand(&balanced, average, settings)?;
    let optimized_output = system_output(&expansion.steps);
    let improvement_pct = improvement_percent(current_output, optimized_output);
    if improvement_pct.is_none() {
        warn!("Current output is zero; improvement percent is undefined");
    }

    info!(
        "Optimized {} steps: output {current_output:.1} -> {optimized_output:.1}, {} transfer(s), {} machine(s) added",
        before.len(),
        transfers.len(),
        expansion.machines_added
    );

    Ok(OptimizationResult {
        before,
        after: expansion.steps,
        average,
        current_output,
        optimized_output,
        improvement_pct,
        transfers,
        actions: expansion.actions,
        machines_added: expansion.machines_added,
        max_new_machines: settings.max_new_machines,
    })
}

/// `(optimized - current) / current * 100`, one decimal. Undefined at zero
/// output or when the ratio is not a finite number.
pub fn improvement_percent(current: f64, optimized: f64) -> Option<f64> {
    if current == 0.0 {
        return None;
    }
    Some(round_to(((optimized - current) / current) * 100.0, 1)).filter(|p| p.is_finite())
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ────────────────────────────────────────────────────────────────────────────
// Wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub step_id: i64,
    pub machine_count: u32,
    pub capacity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSnapshot {
    pub bottleneck_step: i64,
    pub steps: Vec<StepSummary>,
}

impl LineSnapshot {
    fn from_steps(steps: &[ProcessStep]) -> Self {
        Self {
            bottleneck_step: bottleneck(steps).map(|s| s.step_id).unwrap_or_default(),
            steps: steps
                .iter()
                .map(|s| StepSummary {
                    step_id: s.step_id,
                    machine_count: s.machine_count,
                    capacity: s.capacity.round() as i64,
                })
                .collect(),
        }
    }
}

/// JSON body describing a line optimization.
#[derive(Debug, Clone, Serialize)]
pub struct LineOptimization {
    pub current_output: i64,
    pub optimized_output: i64,
    pub improvement_percent: Option<f64>,
    pub before_optimization: LineSnapshot,
    pub after_optimization: LineSnapshot,
    pub optimization_actions: Vec<OptimizationAction>,
    pub machine_limit_respected: bool,
}

impl From<&OptimizationResult> for LineOptimization {
    fn from(result: &OptimizationResult) -> Self {
        Self {
            current_output: result.current_output.round() as i64,
            optimized_output: result.optimized_output.round() as i64,
            improvement_percent: result.improvement_pct,
            before_optimization: LineSnapshot::from_steps(&result.before),
            after_optimization: LineSnapshot::from_steps(&result.after),
            optimization_actions: result.actions.clone(),
            machine_limit_respected: result.machines_added <= result.max_new_machines,
        }
    }
}
