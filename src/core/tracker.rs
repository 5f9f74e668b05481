use std::time::Duration;

use super::error::SignalError;
use super::model::{ConditionId, Transition};
use super::state::ConditionState;

/// Turns a per-tick presence signal into confirm/clear transitions once the
/// signal has stayed true for the hold duration.
#[derive(Debug, Clone, Copy)]
pub struct HoldTimeTracker {
    condition: ConditionId,
    hold: Duration,
}

impl HoldTimeTracker {
    pub fn new(condition: ConditionId, hold: Duration) -> Self {
        Self { condition, hold }
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Apply one tick. Out-of-order ticks leave `state` untouched.
    pub fn on_tick(
        &self,
        state: &mut ConditionState,
        present: bool,
        now: Duration,
    ) -> Result<Transition, SignalError> {
        if let Some(last) = state.last_tick {
            if now < last {
                return Err(SignalError::OutOfOrder {
                    condition: self.condition,
                    at: now,
                    last,
                });
            }
        }
        state.last_tick = Some(now);

        if !present {
            if !state.currently_present {
                return Ok(Transition::None);
            }
            let was_confirmed = state.confirmed;
            state.clear();
            return Ok(if was_confirmed {
                Transition::Cleared
            } else {
                Transition::None
            });
        }

        if !state.currently_present {
            state.currently_present = true;
            state.present_since = Some(now);
            // Zero hold fires on the very first true tick
            if self.hold.is_zero() {
                state.confirmed = true;
                return Ok(Transition::Confirmed);
            }
            return Ok(Transition::None);
        }

        if state.confirmed {
            return Ok(Transition::None);
        }

        let since = state.present_since.unwrap_or(now);
        if now.saturating_sub(since) >= self.hold {
            state.confirmed = true;
            Ok(Transition::Confirmed)
        } else {
            Ok(Transition::None)
        }
    }
}
