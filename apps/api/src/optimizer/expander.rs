use crate::errors::OptimizeError;
use crate::optimizer::models::{bottleneck_index, system_output, OptimizationAction, ProcessStep};
use crate::optimizer::OptimizerSettings;

pub const EXPANSION_ACTION: &str = "Added machine at bottleneck (space constrained optimization)";

#[derive(Debug, Clone)]
pub struct ExpansionOutcome {
    pub steps: Vec<ProcessStep>,
    pub actions: Vec<OptimizationAction>,
    pub machines_added: u32,
}

/// Phase 2: add up to `max_new_machines` machines, one at a time, to the
/// current bottleneck. Each machine contributes the step's average per-machine
/// capacity. Stops after an addition once the line output reaches
/// `reference_average * early_stop_fraction`.
pub fn expand(
    steps: &[ProcessStep],
    reference_average: f64,
    settings: &OptimizerSettings,
) -> Result<ExpansionOutcome, OptimizeError> {
    if let Some(empty) = steps.iter().find(|s| s.machine_count == 0) {
        return Err(OptimizeError::InvariantViolation {
            step_id: empty.step_id,
        });
    }

    let mut expanded = steps.to_vec();
    let mut actions = Vec::new();
    let target = reference_average * settings.early_stop_fraction;

    while (actions.len() as u32) < settings.max_new_machines {
        let Some(i) = bottleneck_index(&expanded) else {
            break;
        };
        let step = &mut expanded[i];
        let gain = step.capacity / f64::from(step.machine_count);
        step.machine_count += 1;
        step.capacity += gain;

        tracing::debug!(
            "Added machine at step {} (+{gain:.1}/day, now {} machines)",
            step.step_id,
            step.machine_count
        );
        actions.push(OptimizationAction {
            step_id: step.step_id,
            description: EXPANSION_ACTION.to_string(),
        });

        if system_output(&expanded) >= target {
            break;
        }
    }

    Ok(ExpansionOutcome {
        steps: expanded,
        machines_added: actions.len() as u32,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step_id: i64, machine_count: u32, capacity: f64) -> ProcessStep {
        ProcessStep {
            step_id,
            machine_count,
            capacity,
        }
    }

    #[test]
    fn test_single_addition_reaches_target() {
        let steps = vec![step(1, 2, 96.0), step(2, 2, 64.0), step(3, 2, 80.0)];
        let outcome = expand(&steps, 80.0, &OptimizerSettings::default()).unwrap();

        assert_eq!(outcome.machines_added, 1);
        assert_eq!(outcome.actions.len(), 1);
        assert_eq!(outcome.actions[0].step_id, 2);
        assert_eq!(outcome.steps[1].machine_count, 3);
        assert!((outcome.steps[1].capacity - 96.0).abs() < 1e-9);
        assert!((system_output(&outcome.steps) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_cap_bounds_additions() {
        let steps = vec![step(1, 1, 1000.0), step(2, 10, 10.0)];
        let settings = OptimizerSettings {
            max_new_machines: 3,
            ..OptimizerSettings::default()
        };
        let outcome = expand(&steps, 505.0, &settings).unwrap();
        assert_eq!(outcome.machines_added, 3);
        assert_eq!(outcome.actions.len(), 3);
        assert!(outcome.actions.iter().all(|a| a.step_id == 2));
        assert_eq!(outcome.steps[1].machine_count, 13);
    }

    #[test]
    fn test_bottleneck_recomputed_after_each_addition() {
        let steps = vec![step(1, 1, 50.0), step(2, 1, 60.0), step(3, 1, 500.0)];
        let outcome = expand(&steps, 200.0, &OptimizerSettings::default()).unwrap();
        let targets: Vec<i64> = outcome.actions.iter().map(|a| a.step_id).collect();
        assert_eq!(targets, vec![1, 2]);
    }

    #[test]
    fn test_zero_cap_adds_nothing() {
        let steps = vec![step(1, 1, 10.0), step(2, 1, 20.0)];
        let settings = OptimizerSettings {
            max_new_machines: 0,
            ..OptimizerSettings::default()
        };
        let outcome = expand(&steps, 15.0, &settings).unwrap();
        assert_eq!(outcome.machines_added, 0);
        assert_eq!(outcome.steps, steps);
    }

    #[test]
    fn test_step_without_machines_is_invariant_violation() {
        let steps = vec![step(1, 2, 10.0), step(4, 0, 0.0)];
        assert_eq!(
            expand(&steps, 5.0, &OptimizerSettings::default()).unwrap_err(),
            OptimizeError::InvariantViolation { step_id: 4 }
        );
    }
}
