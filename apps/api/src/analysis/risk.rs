//! Per-machine risk assessment — pluggable, trait-based.
//!
//! Risk numbers come from outside the optimizer (pre-trained classifiers,
//! maintenance systems, or the uploaded sheet itself). `AppState` holds an
//! `Arc<dyn RiskScorer>` so the source can be swapped without touching the
//! analysis handler.
//!
//! Default: `DeclaredRiskScorer`, which trusts scores supplied on the rows and
//! falls back to the declared health status when they are missing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::control_room::AnalysisUpdate;
use crate::errors::AppError;
use crate::optimizer::report::round_to;
use crate::optimizer::{CapacityRow, OptimizationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Healthy,
    Warning,
    Critical,
}

impl MachineStatus {
    /// < 40 healthy, < 70 warning, otherwise critical.
    pub fn from_risk(risk_score: f64) -> Self {
        if risk_score < 40.0 {
            MachineStatus::Healthy
        } else if risk_score < 70.0 {
            MachineStatus::Warning
        } else {
            MachineStatus::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineRisk {
    pub machine_id: String,   // row's own id, else M-0001, M-0002, ...
    pub machine_name: String, // row's own name, else "Machine Unit N"
    pub risk_score: f64,         // 0 – 100
    pub defect_probability: f64, // 0.0 – 1.0
    pub status: MachineStatus,
}

#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn assess(&self, rows: &[CapacityRow]) -> Result<Vec<MachineRisk>, AppError>;
}

pub struct DeclaredRiskScorer;

#[async_trait]
impl RiskScorer for DeclaredRiskScorer {
    async fn assess(&self, rows: &[CapacityRow]) -> Result<Vec<MachineRisk>, AppError> {
        Ok(rows
            .iter()
            .enumerate()
            .map(|(index, row)| declared_risk(index, row))
            .collect())
    }
}

/// Id and display name for the machine on row `index` (zero-based).
/// Values supplied on the row win; blanks fall back to the row position.
pub fn machine_identity(index: usize, row: &CapacityRow) -> (String, String) {
    let supplied = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let n = index + 1;
    (
        supplied(&row.machine_id).unwrap_or_else(|| format!("M-{n:04}")),
        supplied(&row.machine_name).unwrap_or_else(|| format!("Machine Unit {n}")),
    )
}

fn declared_risk(index: usize, row: &CapacityRow) -> MachineRisk {
    let (machine_id, machine_name) = machine_identity(index, row);
    let risk_score = row
        .risk_score
        .filter(|r| r.is_finite())
        .unwrap_or_else(|| status_risk(row.health_status.as_deref()))
        .clamp(0.0, 100.0);
    let defect_probability = row
        .defect_probability
        .filter(|p| p.is_finite())
        .unwrap_or(risk_score / 100.0)
        .clamp(0.0, 1.0);

    MachineRisk {
        machine_id,
        machine_name,
        risk_score,
        defect_probability,
        status: MachineStatus::from_risk(risk_score),
    }
}

fn status_risk(status: Option<&str>) -> f64 {
    match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("warning") => 55.0,
        Some("critical") => 85.0,
        _ => 20.0,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactoryHealth {
    pub total_records: usize,
    pub healthy_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub overall_health_score: f64, // healthy share, 0 – 100
    pub machines: Vec<MachineRisk>,
}

pub fn summarize_health(machines: &[MachineRisk]) -> FactoryHealth {
    let count = |status: MachineStatus| machines.iter().filter(|m| m.status == status).count();
    let healthy_count = count(MachineStatus::Healthy);
    let overall_health_score = if machines.is_empty() {
        0.0
    } else {
        round_to(healthy_count as f64 / machines.len() as f64 * 100.0, 1)
    };

    FactoryHealth {
        total_records: machines.len(),
        healthy_count,
        warning_count: count(MachineStatus::Warning),
        critical_count: count(MachineStatus::Critical),
        overall_health_score,
        machines: machines.to_vec(),
    }
}

/// Runtime metrics derived from one completed analysis.
pub fn build_runtime_update(
    machines: &[MachineRisk],
    result: &OptimizationResult,
    completed_at: DateTime<Utc>,
) -> AnalysisUpdate {
    let n = machines.len().max(1) as f64;
    let failure_risk = machines.iter().map(|m| m.risk_score).sum::<f64>() / n;
    let defect_risk = machines
        .iter()
        .map(|m| m.defect_probability * 100.0)
        .sum::<f64>()
        / n;

    AnalysisUpdate {
        machine_count: machines.len() as u64,
        anomaly_count: machines
            .iter()
            .filter(|m| m.status == MachineStatus::Critical)
            .count() as u64,
        failure_risk_pct: failure_risk.round(),
        defect_risk_pct: defect_risk.round(),
        optimization_score: optimization_score(result),
        completed_at,
    }
}

/// How close the optimized line gets to the balanced ideal, 0 – 100.
pub fn optimization_score(result: &OptimizationResult) -> f64 {
    if result.average <= 0.0 {
        return 0.0;
    }
    (result.optimized_output / result.average * 100.0)
        .clamp(0.0, 100.0)
        .round()
}
