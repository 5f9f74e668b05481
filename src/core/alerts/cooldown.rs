// Per-condition cooldown gate, consulted only on confirmation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::state::ConditionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Emit,
    Suppressed { remaining: Duration },
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownGovernor {
    cooldown: Duration,
}

impl CooldownGovernor {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Emit when no cooldown is running; an emission starts a new window.
    pub fn gate(&self, state: &mut ConditionState, now: Duration) -> GateDecision {
        match state.cooldown_until {
            Some(until) if now < until => {
                state.suppressed = true;
                GateDecision::Suppressed {
                    remaining: until - now,
                }
            }
            _ => {
                // A window past the end of time never reopens
                state.cooldown_until = Some(now.checked_add(self.cooldown).unwrap_or(Duration::MAX));
                state.suppressed = false;
                GateDecision::Emit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_opens_and_starts_window() {
        let governor = CooldownGovernor::new(Duration::from_secs(10));
        let mut state = ConditionState::new();

        assert_eq!(governor.gate(&mut state, Duration::from_secs(5)), GateDecision::Emit);
        assert_eq!(state.cooldown_until, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_gate_suppresses_until_window_ends() {
        let governor = CooldownGovernor::new(Duration::from_secs(10));
        let mut state = ConditionState::new();
        governor.gate(&mut state, Duration::from_secs(5));

        assert_eq!(
            governor.gate(&mut state, Duration::from_secs(14)),
            GateDecision::Suppressed {
                remaining: Duration::from_secs(1)
            }
        );
        assert!(state.suppressed);
        // Suppression does not extend the window
        assert_eq!(state.cooldown_until, Some(Duration::from_secs(15)));

        assert_eq!(governor.gate(&mut state, Duration::from_secs(15)), GateDecision::Emit);
        assert!(!state.suppressed);
        assert_eq!(state.cooldown_until, Some(Duration::from_secs(25)));
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let governor = CooldownGovernor::new(Duration::from_secs_f64(1.844674407370955e19));
        let mut state = ConditionState::new();

        assert_eq!(governor.gate(&mut state, Duration::from_secs(3000)), GateDecision::Emit);
        assert_eq!(state.cooldown_until, Some(Duration::MAX));
        assert!(matches!(
            governor.gate(&mut state, Duration::from_secs(1_000_000)),
            GateDecision::Suppressed { .. }
        ));
    }

    #[test]
    fn test_zero_cooldown_never_suppresses() {
        let governor = CooldownGovernor::new(Duration::ZERO);
        let mut state = ConditionState::new();
        assert_eq!(governor.gate(&mut state, Duration::from_secs(1)), GateDecision::Emit);
        assert_eq!(governor.gate(&mut state, Duration::from_secs(1)), GateDecision::Emit);
    }
}
