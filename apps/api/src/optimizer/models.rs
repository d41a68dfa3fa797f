use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One raw machine row as handed over by the ingestion layer.
///
/// `process_step` and `base_capacity_per_day` stay loosely typed so that
/// numeric strings coming out of spreadsheets are accepted and anything else
/// is reported against its row index instead of failing body extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapacityRow {
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    #[serde(default)]
    pub process_step: Value,
    #[serde(default)]
    pub base_capacity_per_day: Value,
    #[serde(default)]
    pub health_status: Option<String>,
    /// Externally supplied failure risk, 0 – 100.
    #[serde(default)]
    pub risk_score: Option<f64>,
    /// Externally supplied defect probability, 0.0 – 1.0.
    #[serde(default)]
    pub defect_probability: Option<f64>,
}

/// Aggregate daily capacity of one stage of the line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessStep {
    pub step_id: i64,
    pub machine_count: u32,
    pub capacity: f64,
}

/// Audit record of a single bottleneck expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationAction {
    #[serde(rename = "process_step")]
    pub step_id: i64,
    #[serde(rename = "action")]
    pub description: String,
}

/// The step gating the line: minimum capacity, lowest step_id on ties.
/// Expects `steps` in ascending step_id order.
pub fn bottleneck(steps: &[ProcessStep]) -> Option<&ProcessStep> {
    steps.iter().fold(None, |best: Option<&ProcessStep>, step| match best {
        Some(b) if b.capacity <= step.capacity => Some(b),
        _ => Some(step),
    })
}

/// Index form of [`bottleneck`].
pub fn bottleneck_index(steps: &[ProcessStep]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, step) in steps.iter().enumerate() {
        match best {
            Some(b) if steps[b].capacity <= step.capacity => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Effective line throughput, i.e. the bottleneck's capacity.
pub fn system_output(steps: &[ProcessStep]) -> f64 {
    bottleneck(steps).map(|s| s.capacity).unwrap_or(0.0)
}

pub fn total_capacity(steps: &[ProcessStep]) -> f64 {
    steps.iter().map(|s| s.capacity).sum()
}

pub fn average_capacity(steps: &[ProcessStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    total_capacity(steps) / steps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(step_id: i64, capacity: f64) -> ProcessStep {
        ProcessStep {
            step_id,
            machine_count: 1,
            capacity,
        }
    }

    #[test]
    fn test_bottleneck_prefers_lowest_step_on_tie() {
        let steps = vec![step(1, 90.0), step(2, 50.0), step(3, 50.0)];
        assert_eq!(bottleneck(&steps).map(|s| s.step_id), Some(2));
        assert_eq!(bottleneck_index(&steps), Some(1));
    }

    #[test]
    fn test_system_output_is_minimum_capacity() {
        let steps = vec![step(1, 100.0), step(2, 60.0), step(3, 80.0)];
        assert_eq!(system_output(&steps), 60.0);
        assert!((average_capacity(&steps) - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_line_has_no_bottleneck() {
        assert!(bottleneck(&[]).is_none());
        assert_eq!(system_output(&[]), 0.0);
        assert_eq!(average_capacity(&[]), 0.0);
    }

    #[test]
    fn test_action_serializes_with_wire_names() {
        let action = OptimizationAction {
            step_id: 4,
            description: "added".to_string(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["process_step"], 4);
        assert_eq!(json["action"], "added");
    }
}
