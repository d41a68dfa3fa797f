// Factory analysis: optimizer + externally supplied machine risk.
// A successful run is the only writer of the control-room runtime state.

pub mod handlers;
pub mod risk;
