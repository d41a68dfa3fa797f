use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::analysis::risk::RiskScorer;
use crate::config::Config;
use crate::control_room::RuntimeStateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Live factory metrics; written by analyses, read by control-room observers.
    pub runtime: Arc<RuntimeStateStore>,
    /// Pluggable machine risk source. Default: DeclaredRiskScorer.
    pub risk_scorer: Arc<dyn RiskScorer>,
    /// Cancelled on shutdown; every observer stream holds a child token.
    pub shutdown: CancellationToken,
}
