use crate::errors::OptimizeError;
use crate::optimizer::models::{average_capacity, bottleneck_index, ProcessStep};
use crate::optimizer::OptimizerSettings;

/// Capacity shifted from an overloaded step to the bottleneck of the moment.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub from_step: i64,
    pub to_step: i64,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    pub steps: Vec<ProcessStep>,
    /// Pre-balancing mean capacity; also the reference for expansion early stop.
    pub average: f64,
    pub transfers: Vec<Transfer>,
}

/// Phase 1: single pass in ascending step order moving part of every
/// overloaded step's excess onto whichever step is the minimum at that moment.
///
/// The overload test uses the fixed pre-pass average while the recipient is
/// looked up again for every transfer. Total capacity is conserved.
pub fn balance(
    steps: &[ProcessStep],
    settings: &OptimizerSettings,
) -> Result<BalanceOutcome, OptimizeError> {
    if steps.len() < 2 {
        return Err(OptimizeError::DegenerateInput { steps: steps.len() });
    }

    let average = average_capacity(steps);
    let mut balanced = steps.to_vec();
    let mut transfers = Vec::new();

    for i in 0..balanced.len() {
        let capacity = balanced[i].capacity;
        if capacity <= average * settings.overload_threshold {
            continue;
        }

        let amount = (capacity - average) * settings.transfer_fraction;
        balanced[i].capacity -= amount;

        let Some(recipient) = bottleneck_index(&balanced) else {
            continue;
        };
        balanced[recipient].capacity += amount;

        transfers.push(Transfer {
            from_step: balanced[i].step_id,
            to_step: balanced[recipient].step_id,
            amount,
        });
    }

    Ok(BalanceOutcome {
        steps: balanced,
        average,
        transfers,
    })
}
