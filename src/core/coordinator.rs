// Engine driver: signals in, dispatches out.
//
// `submit` evaluates synchronously under the condition's own lock and, when a
// confirmation passes its cooldown gate, spawns the envelope + dispatch work
// so a slow channel never delays the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use super::alerts::dispatcher::Dispatcher;
use super::alerts::engine::{AlertEngine, Evaluation};
use super::alerts::envelope::EnvelopeBuilder;
use super::alerts::model::DispatchReport;
use super::alerts::triggers::SignalAdapter;
use super::clock::Clock;
use super::error::SignalError;
use super::model::{ConditionId, PerceptionFrame, RawSignal, Transition};
use super::state::ConditionPhase;

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Evaluated(Evaluation),
    Rejected(SignalError),
}

impl TickOutcome {
    pub fn transition(&self) -> Option<Transition> {
        match self {
            Self::Evaluated(evaluation) => Some(evaluation.transition),
            Self::Rejected(_) => None,
        }
    }

    /// True when this tick started an alert dispatch.
    pub fn dispatched(&self) -> bool {
        matches!(self, Self::Evaluated(evaluation) if evaluation.should_dispatch())
    }
}

struct Inner {
    engine: AlertEngine,
    adapter: SignalAdapter,
    envelopes: EnvelopeBuilder,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    reports: Option<UnboundedSender<DispatchReport>>,
    accepting: AtomicBool,
    in_flight: Mutex<JoinSet<()>>,
}

/// Cheap to clone; every producer gets its own handle.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(
        engine: AlertEngine,
        adapter: SignalAdapter,
        envelopes: EnvelopeBuilder,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
        runtime: Handle,
        reports: Option<UnboundedSender<DispatchReport>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                adapter,
                envelopes,
                dispatcher,
                clock,
                runtime,
                reports,
                accepting: AtomicBool::new(true),
                in_flight: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn now(&self) -> std::time::Duration {
        self.inner.clock.now()
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    pub fn phase(&self, condition: ConditionId) -> Option<ConditionPhase> {
        self.inner.engine.phase(condition)
    }

    /// Feed one presence tick. Safe to call from any number of producers.
    pub fn submit(&self, signal: RawSignal) -> TickOutcome {
        if !self.is_accepting() {
            return TickOutcome::Rejected(SignalError::ShuttingDown);
        }

        let evaluation = match self.inner.engine.evaluate(&signal) {
            Ok(evaluation) => evaluation,
            Err(e) => {
                match e {
                    SignalError::UnknownCondition(_) => log::debug!("Ignoring tick: {}", e),
                    _ => log::warn!("Rejected tick: {}", e),
                }
                return TickOutcome::Rejected(e);
            }
        };

        match evaluation.transition {
            Transition::Confirmed => {
                if evaluation.should_dispatch() {
                    log::info!("{} confirmed at {:?}", signal.condition, signal.timestamp);
                    self.spawn_dispatch(signal);
                } else {
                    log::info!(
                        "{} confirmed at {:?} but still cooling down ({:?})",
                        signal.condition,
                        signal.timestamp,
                        evaluation.gate
                    );
                }
            }
            Transition::Cleared => log::debug!("{} cleared at {:?}", signal.condition, signal.timestamp),
            Transition::None => {}
        }

        TickOutcome::Evaluated(evaluation)
    }

    /// Normalize a perception frame at the current clock time and submit
    /// every resulting signal.
    pub fn submit_frame(&self, frame: &PerceptionFrame) -> Vec<TickOutcome> {
        let now = self.inner.clock.now();
        self.inner
            .adapter
            .normalize(frame, now)
            .into_iter()
            .map(|signal| self.submit(signal))
            .collect()
    }

    fn spawn_dispatch(&self, signal: RawSignal) {
        let inner = Arc::clone(&self.inner);
        let work = async move {
            let envelope = inner
                .envelopes
                .assemble(signal.condition, signal.timestamp, signal.detail)
                .await;
            let report = inner.dispatcher.dispatch(Arc::new(envelope)).await;
            if let Some(sink) = &inner.reports {
                if sink.send(report).is_err() {
                    log::debug!("Report receiver dropped");
                }
            }
        };

        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = in_flight.try_join_next() {
            if let Err(e) = finished {
                log::error!("Dispatch task failed: {}", e);
            }
        }
        in_flight.spawn_on(work, &self.inner.runtime);
    }

    /// Stop accepting ticks. Dispatches already started keep running.
    pub fn shutdown(&self) {
        if self.inner.accepting.swap(false, Ordering::SeqCst) {
            log::info!("Coordinator shutting down");
        }
    }

    /// Wait for every in-flight dispatch. Each is bounded by the per-channel
    /// timeout, so this returns in bounded time once `shutdown` was called.
    pub async fn drain(&self) {
        loop {
            let mut batch = {
                let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                std::mem::take(&mut *in_flight)
            };
            if batch.is_empty() {
                break;
            }
            while let Some(finished) = batch.join_next().await {
                if let Err(e) = finished {
                    log::error!("Dispatch task failed: {}", e);
                }
            }
        }
        log::info!("All dispatches drained");
    }
}
