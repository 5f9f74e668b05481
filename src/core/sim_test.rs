#[cfg(test)]
mod sim_tests {
    use crate::core::alerts::channels::store::load_alerts;
    use crate::core::alerts::channels::{ChannelAdapter, StoreChannel};
    use crate::core::alerts::dispatcher::Dispatcher;
    use crate::core::alerts::engine::AlertEngine;
    use crate::core::alerts::envelope::EnvelopeBuilder;
    use crate::core::alerts::model::Condition;
    use crate::core::alerts::triggers::SignalAdapter;
    use crate::core::clock::ManualClock;
    use crate::core::coordinator::Coordinator;
    use crate::core::model::{ConditionId, RawSignal};
    use crate::core::state::ConditionPhase;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simulate_concurrent_pipelines() {
        let dir = tempdir().unwrap();
        let store_path = dir.path().join("alerts.jsonl");

        let conditions = vec![
            Condition::new(ConditionId::Loitering, secs(5), secs(10)),
            Condition::new(ConditionId::Crouch, secs(5), secs(3)),
            Condition::new(ConditionId::PanicKeyword, Duration::ZERO, secs(10)),
        ];
        let store: Arc<dyn ChannelAdapter> = Arc::new(StoreChannel::new(store_path.clone()));
        let (tx, mut reports) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(
            AlertEngine::new(&conditions),
            SignalAdapter::default(),
            EnvelopeBuilder::without_location(&conditions),
            Dispatcher::new(vec![store], secs(2)),
            Arc::new(ManualClock::new()),
            Handle::current(),
            Some(tx),
        );

        // Vision: person stays in zone for 20s -> one loitering alert at 5s,
        // the 15s re-confirmation is never reached because presence is continuous
        let vision = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                for t in 0..=20 {
                    coordinator.submit(RawSignal::new(ConditionId::Loitering, true, secs(t)));
                    tokio::task::yield_now().await;
                }
            })
        };

        // Pose: crouch 0-6s, stand, crouch again 8-14s -> two alerts (cooldown 3s)
        let pose = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                for t in 0..=14 {
                    let crouching = t <= 6 || t >= 8;
                    coordinator.submit(RawSignal::new(ConditionId::Crouch, crouching, secs(t)));
                    tokio::task::yield_now().await;
                }
            })
        };

        // Audio: panic words at 1s and 4s (inside cooldown) and 12s
        let audio = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                for t in [1, 4, 12] {
                    coordinator.submit(RawSignal::new(ConditionId::PanicKeyword, true, secs(t)).with_detail("help"));
                    coordinator.submit(RawSignal::new(ConditionId::PanicKeyword, false, secs(t)));
                    tokio::task::yield_now().await;
                }
            })
        };

        vision.await.unwrap();
        pose.await.unwrap();
        audio.await.unwrap();

        coordinator.shutdown();
        coordinator.drain().await;

        let mut received = Vec::new();
        while let Ok(report) = reports.try_recv() {
            assert_eq!(report.delivered_count(), 1);
            received.push((report.condition, report.timestamp));
        }
        received.sort();

        assert_eq!(
            received,
            vec![
                (ConditionId::Loitering, secs(5)),
                (ConditionId::Crouch, secs(5)),
                (ConditionId::Crouch, secs(13)),
                (ConditionId::PanicKeyword, secs(1)),
                (ConditionId::PanicKeyword, secs(12)),
            ]
        );

        let stored = load_alerts(&store_path).await.unwrap();
        assert_eq!(stored.len(), 5);

        assert_eq!(
            coordinator.phase(ConditionId::Loitering),
            Some(ConditionPhase::ConfirmedActive)
        );
    }
}
