// Live control room: shared runtime state plus one periodic broadcaster per observer.

pub mod broadcaster;
pub mod handlers;
pub mod store;

pub use broadcaster::{BroadcastPayload, Broadcaster, StopReason};
pub use store::{AnalysisUpdate, RuntimeStateStore};
