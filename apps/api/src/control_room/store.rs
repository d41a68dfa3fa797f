use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Live factory metrics shared between analyses and control-room observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeState {
    pub machine_count: u64,
    pub anomaly_count: u64,
    pub failure_risk_pct: f64,
    pub defect_risk_pct: f64,
    pub optimization_score: f64,
    pub scan_cycle: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// Analysis-derived fields, written as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    pub machine_count: u64,
    pub anomaly_count: u64,
    pub failure_risk_pct: f64,
    pub defect_risk_pct: f64,
    pub optimization_score: f64,
    pub completed_at: DateTime<Utc>,
}

/// Owns the runtime state behind a single lock. Callers only ever get copies.
#[derive(Debug, Default)]
pub struct RuntimeStateStore {
    inner: Mutex<RuntimeState>,
}

impl RuntimeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read_snapshot(&self) -> RuntimeState {
        self.inner.lock().await.clone()
    }

    /// Replaces every analysis-derived field. `scan_cycle` is left alone.
    pub async fn apply_analysis(&self, update: AnalysisUpdate) {
        let mut state = self.inner.lock().await;
        state.machine_count = update.machine_count;
        state.anomaly_count = update.anomaly_count;
        state.failure_risk_pct = update.failure_risk_pct;
        state.defect_risk_pct = update.defect_risk_pct;
        state.optimization_score = update.optimization_score;
        state.last_update = Some(update.completed_at);
    }

    /// Advances the scan cycle by one and returns the resulting state.
    pub async fn tick(&self) -> RuntimeState {
        let mut state = self.inner.lock().await;
        state.scan_cycle += 1;
        state.clone()
    }
}
