pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers::handle_factory_analysis;
use crate::control_room::handlers::{handle_control_room_ws, handle_snapshot};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/factory-analysis", post(handle_factory_analysis))
        .route("/control-room/snapshot", get(handle_snapshot))
        .route("/ws/control-room", get(handle_control_room_ws))
        .with_state(state)
}
