use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::OptimizeError;
use crate::optimizer::models::{CapacityRow, ProcessStep};

/// Capacity multiplier for a declared machine condition.
/// Case-insensitive; absent or unknown statuses count as healthy.
pub fn health_factor(status: Option<&str>) -> f64 {
    match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("warning") => 0.85,
        Some("critical") => 0.6,
        _ => 1.0,
    }
}

/// Groups raw rows by process step and sums health-adjusted capacity.
///
/// Returns steps in ascending `step_id` order. A bad row anywhere, or a line
/// total that no longer fits in an `f64`, rejects the whole batch.
pub fn build_steps(rows: &[CapacityRow]) -> Result<Vec<ProcessStep>, OptimizeError> {
    if rows.is_empty() {
        return Err(OptimizeError::EmptyInput);
    }

    let mut by_step: BTreeMap<i64, ProcessStep> = BTreeMap::new();
    let mut line_total = 0.0_f64;
    for (index, row) in rows.iter().enumerate() {
        let step_id = parse_step_id(&row.process_step).map_err(|reason| {
            OptimizeError::InvalidInput {
                row: index,
                reason: format!("process_step {reason}"),
            }
        })?;
        let base = parse_capacity(&row.base_capacity_per_day).map_err(|reason| {
            OptimizeError::InvalidInput {
                row: index,
                reason: format!("base_capacity_per_day {reason}"),
            }
        })?;

        let entry = by_step.entry(step_id).or_insert(ProcessStep {
            step_id,
            machine_count: 0,
            capacity: 0.0,
        });
        let adjusted = base * health_factor(row.health_status.as_deref());
        entry.machine_count += 1;
        entry.capacity += adjusted;

        // Step capacities never exceed the line total, so one check covers both.
        line_total += adjusted;
        if !line_total.is_finite() {
            return Err(OptimizeError::InvalidInput {
                row: index,
                reason: format!(
                    "base_capacity_per_day overflows the capacity of process step {step_id}"
                ),
            });
        }
    }

    Ok(by_step.into_values().collect())
}

fn as_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Null => Err("is missing".to_string()),
        Value::Number(n) => n.as_f64().ok_or_else(|| "is not a number".to_string()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("is not numeric: {s:?}")),
        other => Err(format!("is not numeric: {other}")),
    }
}

fn parse_step_id(value: &Value) -> Result<i64, String> {
    if let Some(id) = value.as_i64() {
        return Ok(id);
    }
    let n = as_number(value)?;
    if !n.is_finite() || n.fract() != 0.0 || n < i64::MIN as f64 || n >= i64::MAX as f64 {
        return Err(format!("must be an integer, got {n}"));
    }
    Ok(n as i64)
}

fn parse_capacity(value: &Value) -> Result<f64, String> {
    let n = as_number(value)?;
    if !n.is_finite() || n < 0.0 {
        return Err(format!("must be a finite non-negative number, got {n}"));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(step: Value, capacity: Value, status: Option<&str>) -> CapacityRow {
        CapacityRow {
            process_step: step,
            base_capacity_per_day: capacity,
            health_status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_health_factor_is_case_insensitive() {
        assert_eq!(health_factor(Some("Healthy")), 1.0);
        assert_eq!(health_factor(Some("WARNING")), 0.85);
        assert_eq!(health_factor(Some("critical")), 0.6);
        assert_eq!(health_factor(Some("retired")), 1.0);
        assert_eq!(health_factor(None), 1.0);
    }

    #[test]
    fn test_rows_grouped_by_step_in_ascending_order() {
        let rows = vec![
            row(json!(3), json!(40.0), None),
            row(json!(1), json!(100.0), Some("healthy")),
            row(json!(3), json!(100.0), Some("critical")),
            row(json!("1"), json!("20"), Some("warning")),
        ];
        let steps = build_steps(&rows).unwrap();
        assert_eq!(steps.len(), 2);

        assert_eq!(steps[0].step_id, 1);
        assert_eq!(steps[0].machine_count, 2);
        assert!((steps[0].capacity - 117.0).abs() < 1e-9);

        assert_eq!(steps[1].step_id, 3);
        assert_eq!(steps[1].machine_count, 2);
        assert!((steps[1].capacity - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_rows_rejected() {
        assert_eq!(build_steps(&[]), Err(OptimizeError::EmptyInput));
    }

    #[test]
    fn test_missing_step_reports_row_index() {
        let rows = vec![
            row(json!(1), json!(10), None),
            row(Value::Null, json!(10), None),
        ];
        match build_steps(&rows) {
            Err(OptimizeError::InvalidInput { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("process_step"), "reason was {reason}");
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_capacity_rejected() {
        let rows = vec![row(json!(1), json!("lots"), None)];
        assert!(matches!(
            build_steps(&rows),
            Err(OptimizeError::InvalidInput { row: 0, .. })
        ));
    }

    #[test]
    fn test_fractional_step_rejected() {
        let rows = vec![row(json!(1.5), json!(10), None)];
        assert!(matches!(
            build_steps(&rows),
            Err(OptimizeError::InvalidInput { row: 0, .. })
        ));
    }

    #[test]
    fn test_capacity_sum_overflow_rejected() {
        let rows = vec![
            row(json!(1), json!(1e308), None),
            row(json!(1), json!(1e308), None),
        ];
        match build_steps(&rows) {
            Err(OptimizeError::InvalidInput { row, reason }) => {
                assert_eq!(row, 1);
                assert!(reason.contains("overflows"), "reason was {reason}");
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }

        // separate steps overflow the line total just the same
        let rows = vec![
            row(json!(1), json!(1e308), None),
            row(json!(2), json!(1e308), None),
        ];
        assert!(matches!(
            build_steps(&rows),
            Err(OptimizeError::InvalidInput { row: 1, .. })
        ));
    }

    #[test]
    fn test_step_id_at_two_pow_63_rejected() {
        let rows = vec![row(json!(9223372036854775808.0_f64), json!(10), None)];
        assert!(matches!(
            build_steps(&rows),
            Err(OptimizeError::InvalidInput { row: 0, .. })
        ));

        let rows = vec![row(json!("9223372036854775808"), json!(10), None)];
        assert!(build_steps(&rows).is_err());
    }

    #[test]
    fn test_negative_capacity_rejected() {
        let rows = vec![row(json!(1), json!(-5), None)];
        assert!(build_steps(&rows).is_err());
    }
}
