// Alert system: from presence signals to delivered notifications.
//
// Architecture:
// - triggers.rs: Perception frames -> per-condition presence signals
// - engine.rs: Hold-time tracking and cooldown gating per condition
// - cooldown.rs: Time-based suppression of repeated alerts
// - envelope.rs: Confirmed condition + context -> AlertEnvelope
// - dispatcher.rs: Concurrent fan-out to delivery channels
// - channels/: Delivery channel implementations
// - model.rs: Conditions, envelopes, dispatch reports

pub mod channels;
pub mod cooldown;
pub mod dispatcher;
pub mod engine;
pub mod envelope;
pub mod model;
pub mod triggers;
