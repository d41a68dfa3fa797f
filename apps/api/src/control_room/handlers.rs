use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    Json,
};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::control_room::{BroadcastPayload, Broadcaster, StopReason};
use crate::state::AppState;

/// GET /ws/control-room
pub async fn handle_control_room_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_to_observer(socket, state))
}

/// GET /control-room/snapshot
/// Current runtime state in broadcast shape, without advancing the scan cycle.
pub async fn handle_snapshot(State(state): State<AppState>) -> Json<BroadcastPayload> {
    let snapshot = state.runtime.read_snapshot().await;
    Json(BroadcastPayload::from(&snapshot))
}

async fn stream_to_observer(socket: WebSocket, state: AppState) {
    let observer_id = Uuid::new_v4();
    let cancel = state.shutdown.child_token();
    let disconnected = CancellationToken::new();
    info!("Control room observer {observer_id} connected");

    let (mut sender, receiver) = socket.split();
    let reader = tokio::spawn(watch_for_close(receiver, disconnected.clone()));

    let mut broadcaster = Broadcaster::new(state.runtime.clone(), state.config.broadcast_period);
    match broadcaster.run(&mut sender, &disconnected, &cancel).await {
        StopReason::ObserverGone => info!("Control room observer {observer_id} disconnected"),
        StopReason::Cancelled => {
            info!("Control room observer {observer_id} closed for shutdown");
            let _ = sender.close().await;
        }
    }
    reader.abort();
}

/// Drains inbound frames; observers have nothing to say, but a close frame,
/// a read error or the end of the stream all mean the peer is gone.
async fn watch_for_close(mut receiver: SplitStream<WebSocket>, disconnected: CancellationToken) {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Control room read failed: {e}");
                break;
            }
        }
    }
    disconnected.cancel();
}
