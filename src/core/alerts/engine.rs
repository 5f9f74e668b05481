// Alert engine - runs each condition's hold-time tracker and cooldown gate.
//
// Every condition owns its own slot behind its own lock, so ticks for one
// condition never wait on another.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::cooldown::{CooldownGovernor, GateDecision};
use super::model::Condition;
use crate::core::error::SignalError;
use crate::core::model::{ConditionId, RawSignal, Transition};
use crate::core::state::{ConditionPhase, ConditionState};
use crate::core::tracker::HoldTimeTracker;

struct ConditionSlot {
    tracker: HoldTimeTracker,
    governor: CooldownGovernor,
    state: ConditionState,
}

/// Result of feeding one signal through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub condition: ConditionId,
    pub transition: Transition,
    /// Set only for confirmations
    pub gate: Option<GateDecision>,
}

impl Evaluation {
    pub fn should_dispatch(&self) -> bool {
        self.gate == Some(GateDecision::Emit)
    }
}

pub struct AlertEngine {
    slots: HashMap<ConditionId, Mutex<ConditionSlot>>,
}

impl AlertEngine {
    pub fn new(conditions: &[Condition]) -> Self {
        let slots = conditions
            .iter()
            .map(|c| {
                let slot = ConditionSlot {
                    tracker: HoldTimeTracker::new(c.id, c.hold),
                    governor: CooldownGovernor::new(c.cooldown),
                    state: ConditionState::new(),
                };
                (c.id, Mutex::new(slot))
            })
            .collect();
        Self { slots }
    }

    fn slot(&self, condition: ConditionId) -> Result<MutexGuard<'_, ConditionSlot>, SignalError> {
        let slot = self
            .slots
            .get(&condition)
            .ok_or(SignalError::UnknownCondition(condition))?;
        // A panic mid-update cannot leave a slot half-written, keep using it
        Ok(slot.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn conditions(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.slots.keys().copied()
    }

    /// Run one signal through its condition's tracker, then the cooldown gate
    /// when the tracker confirms.
    pub fn evaluate(&self, signal: &RawSignal) -> Result<Evaluation, SignalError> {
        let mut guard = self.slot(signal.condition)?;
        let slot = &mut *guard;

        let transition = slot
            .tracker
            .on_tick(&mut slot.state, signal.present, signal.timestamp)?;

        let gate = match transition {
            Transition::Confirmed => Some(slot.governor.gate(&mut slot.state, signal.timestamp)),
            _ => None,
        };

        Ok(Evaluation {
            condition: signal.condition,
            transition,
            gate,
        })
    }

    pub fn phase(&self, condition: ConditionId) -> Option<ConditionPhase> {
        self.slot(condition).ok().map(|slot| slot.state.phase())
    }

    /// Snapshot of a condition's timing state.
    pub fn state(&self, condition: ConditionId) -> Option<ConditionState> {
        self.slot(condition).ok().map(|slot| slot.state.clone())
    }
}
