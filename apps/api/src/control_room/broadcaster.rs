//! Periodic push of runtime snapshots to one observer.
//!
//! Each connected observer gets its own [`Broadcaster`] running against the
//! shared [`RuntimeStateStore`]. A tick advances the scan cycle, renders a
//! [`BroadcastPayload`] and hands it to the observer's [`SnapshotSink`]. A
//! failed send or a peer-side close ends the loop for that observer only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use chrono::SecondsFormat;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::control_room::store::{RuntimeState, RuntimeStateStore};

pub const LIVE_LOG: &str = "Live monitoring based on latest uploaded dataset";
pub const WAITING_LOG: &str = "Waiting for any CSV upload";

/// Message pushed to observers on every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub machines: u64,
    pub anomalies: u64,
    pub scan_cycle: u64,
    pub failure_risk: f64,
    pub defect_risk: f64,
    pub optimization_score: f64,
    pub last_scan: Option<String>,
    pub log: String,
}

impl From<&RuntimeState> for BroadcastPayload {
    fn from(state: &RuntimeState) -> Self {
        let log = if state.machine_count > 0 {
            LIVE_LOG
        } else {
            WAITING_LOG
        };
        Self {
            machines: state.machine_count,
            anomalies: state.anomaly_count,
            scan_cycle: state.scan_cycle,
            failure_risk: state.failure_risk_pct,
            defect_risk: state.defect_risk_pct,
            optimization_score: state.optimization_score,
            last_scan: state
                .last_update
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true)),
            log: log.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("observer disconnected")]
    Closed,

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Destination for broadcast payloads. One sink per observer.
#[async_trait]
pub trait SnapshotSink: Send {
    async fn send(&mut self, payload: &BroadcastPayload) -> Result<(), SinkError>;
}

/// Write half of a split control-room socket. The read half is drained
/// elsewhere so close frames from the peer are still seen.
#[async_trait]
impl SnapshotSink for SplitSink<WebSocket, Message> {
    async fn send(&mut self, payload: &BroadcastPayload) -> Result<(), SinkError> {
        let text = serde_json::to_string(payload)?;
        SinkExt::send(self, Message::Text(text))
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}

#[async_trait]
impl SnapshotSink for mpsc::Sender<BroadcastPayload> {
    async fn send(&mut self, payload: &BroadcastPayload) -> Result<(), SinkError> {
        mpsc::Sender::send(self, payload.clone())
            .await
            .map_err(|_| SinkError::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcasterState {
    Idle,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ObserverGone,
    Cancelled,
}

pub struct Broadcaster {
    store: Arc<RuntimeStateStore>,
    period: Duration,
    state: BroadcasterState,
}

impl Broadcaster {
    pub fn new(store: Arc<RuntimeStateStore>, period: Duration) -> Self {
        Self {
            store,
            period,
            state: BroadcasterState::Idle,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> BroadcasterState {
        self.state
    }

    /// Streams to `sink` until a send fails, `disconnected` fires (the peer
    /// went away) or `cancel` fires. The first payload goes out immediately;
    /// later ones follow every `period`.
    pub async fn run<S>(
        &mut self,
        sink: &mut S,
        disconnected: &CancellationToken,
        cancel: &CancellationToken,
    ) -> StopReason
    where
        S: SnapshotSink + ?Sized,
    {
        self.state = BroadcasterState::Streaming;

        let reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if disconnected.is_cancelled() {
                break StopReason::ObserverGone;
            }

            let snapshot = self.store.tick().await;
            let payload = BroadcastPayload::from(&snapshot);

            let sent = tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = disconnected.cancelled() => break StopReason::ObserverGone,
                sent = sink.send(&payload) => sent,
            };
            if let Err(e) = sent {
                debug!("Stopping broadcast at scan cycle {}: {e}", payload.scan_cycle);
                break StopReason::ObserverGone;
            }

            tokio::select! {
                _ = cancel.cancelled() => break StopReason::Cancelled,
                _ = disconnected.cancelled() => {
                    debug!("Peer closed after scan cycle {}", payload.scan_cycle);
                    break StopReason::ObserverGone;
                }
                _ = tokio::time::sleep(self.period) => {}
            }
        };

        self.state = BroadcasterState::Idle;
        reason
    }
}
