use anyhow::anyhow;
use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::risk::{build_runtime_update, summarize_health, FactoryHealth};
use crate::errors::AppError;
use crate::optimizer::{optimize_line, CapacityRow, LineOptimization};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub rows: Vec<CapacityRow>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub factory_health: FactoryHealth,
    pub manufacturing_line_optimization: LineOptimization,
    pub analysis_timestamp: String,
}

/// POST /factory-analysis
pub async fn handle_factory_analysis(
    State(state): State<AppState>,
    Json(req): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    // Optimize first: rejected input must never reach the runtime store.
    let result = optimize_line(&req.rows, &state.config.optimizer)?;
    let machines = state.risk_scorer.assess(&req.rows).await?;
    if machines.len() != req.rows.len() {
        return Err(anyhow!(
            "risk scorer returned {} assessments for {} rows",
            machines.len(),
            req.rows.len()
        )
        .into());
    }

    let completed_at = Utc::now();
    let update = build_runtime_update(&machines, &result, completed_at);
    info!(
        "Analysis complete: {} machines, {} anomalies",
        update.machine_count, update.anomaly_count
    );
    state.runtime.apply_analysis(update).await;

    Ok(Json(AnalysisResponse {
        success: true,
        factory_health: summarize_health(&machines),
        manufacturing_line_optimization: LineOptimization::from(&result),
        analysis_timestamp: completed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    }))
}
