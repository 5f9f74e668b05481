use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Mutable timing state for one condition.
///
/// `present_since` is only set while `currently_present` is true, and
/// `confirmed` resets the moment the signal drops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionState {
    pub currently_present: bool,
    pub present_since: Option<Duration>,
    pub confirmed: bool,
    pub cooldown_until: Option<Duration>,
    /// Last accepted tick, used to reject out-of-order signals
    pub last_tick: Option<Duration>,
    /// The current confirmation was gated out by cooldown
    pub suppressed: bool,
}

impl ConditionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ConditionPhase {
        match (self.currently_present, self.confirmed) {
            (false, _) => ConditionPhase::Idle,
            (true, false) => ConditionPhase::Accumulating,
            (true, true) if self.suppressed => ConditionPhase::CooldownSuppressed,
            (true, true) => ConditionPhase::ConfirmedActive,
        }
    }

    /// Drop back to idle, discarding accumulated time. Cooldown is kept.
    pub fn clear(&mut self) {
        self.currently_present = false;
        self.present_since = None;
        self.confirmed = false;
        self.suppressed = false;
    }
}

/// Driver-level view of where a condition sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionPhase {
    Idle,
    Accumulating,
    ConfirmedActive,
    CooldownSuppressed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_follows_flags() {
        let mut state = ConditionState::new();
        assert_eq!(state.phase(), ConditionPhase::Idle);

        state.currently_present = true;
        state.present_since = Some(Duration::ZERO);
        assert_eq!(state.phase(), ConditionPhase::Accumulating);

        state.confirmed = true;
        assert_eq!(state.phase(), ConditionPhase::ConfirmedActive);

        state.suppressed = true;
        assert_eq!(state.phase(), ConditionPhase::CooldownSuppressed);
    }

    #[test]
    fn test_clear_keeps_cooldown() {
        let mut state = ConditionState {
            currently_present: true,
            present_since: Some(Duration::from_secs(1)),
            confirmed: true,
            cooldown_until: Some(Duration::from_secs(20)),
            last_tick: Some(Duration::from_secs(6)),
            suppressed: false,
        };
        state.clear();
        assert_eq!(state.phase(), ConditionPhase::Idle);
        assert_eq!(state.present_since, None);
        assert_eq!(state.cooldown_until, Some(Duration::from_secs(20)));
        assert_eq!(state.last_tick, Some(Duration::from_secs(6)));
    }
}
