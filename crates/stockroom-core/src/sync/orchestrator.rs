//! Background driver for sweeps: on every reconnect and on a fixed timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{SweepReport, SyncTarget};
use crate::connectivity::Connectivity;

/// Drives every registered synchronizer.
///
/// Targets are swept in registration order, so register referenced entities
/// before the entities that reference them.
pub struct SyncOrchestrator {
    targets: Vec<Arc<dyn SyncTarget>>,
    connectivity: Connectivity,
    interval: Duration,
}

impl SyncOrchestrator {
    pub fn new(connectivity: Connectivity, interval: Duration) -> Self {
        Self {
            targets: Vec::new(),
            connectivity,
            interval,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: Arc<dyn SyncTarget>) -> Self {
        self.targets.push(target);
        self
    }

    /// Refresh every target; failures are logged and skipped
    pub async fn refresh_all(&self) {
        for target in &self.targets {
            if let Err(error) = target.refresh().await {
                tracing::error!("Failed to refresh {}: {}", target.kind(), error);
            }
        }
    }

    /// Sweep every target and combine the reports
    pub async fn sweep_all(&self) -> SweepReport {
        let mut total = SweepReport::default();
        for target in &self.targets {
            match target.sweep().await {
                Ok(report) => total = total.merge(report),
                Err(error) => {
                    tracing::error!("Failed to sweep {}: {}", target.kind(), error);
                }
            }
        }
        total
    }

    /// Spawn the background loop: an initial refresh of every target, then a
    /// sweep after each reconnect and on every interval tick while online.
    ///
    /// The loop stops when the returned handle is shut down or dropped.
    pub fn start(self) -> OrchestratorHandle {
        let (shutdown, stop) = oneshot::channel();
        let task = tokio::spawn(self.run(stop));
        OrchestratorHandle {
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    async fn run(self, mut stop: oneshot::Receiver<()>) {
        // Subscribe before the first refresh so no reconnect is missed
        let mut transitions = self.connectivity.subscribe();
        self.refresh_all().await;

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                event = transitions.next_online() => {
                    if event.is_none() {
                        break;
                    }
                    tracing::info!("Back online, syncing pending changes");
                    self.sweep_all().await;
                }
                _ = ticker.tick() => {
                    if self.connectivity.is_online() {
                        self.sweep_all().await;
                    }
                }
            }
        }
        tracing::debug!("Sync orchestrator stopped");
    }
}

/// Owner of the background loop
pub struct OrchestratorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl OrchestratorHandle {
    /// Stop the loop and wait for any in-flight sweep to finish
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Sync orchestrator ended abnormally: {}", error);
            }
        }
    }
}

impl Drop for OrchestratorHandle {
    fn drop(&mut self) {
        // Dropping the sender wakes the loop, which exits after the current sweep
        self.shutdown.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalStore;
    use crate::models::{Category, Customer};
    use crate::sync::testing::FakeRemote;
    use crate::sync::EntitySynchronizer;

    async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweeps_on_reconnect() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let connectivity = Connectivity::new(false);
        let remote = FakeRemote::<Category>::new();
        let categories = Arc::new(EntitySynchronizer::new(
            store.table::<Category>(),
            Some(remote.clone()),
            connectivity.clone(),
        ));
        categories.create(Category::new("Tea")).await.unwrap();

        let handle = SyncOrchestrator::new(connectivity.clone(), Duration::from_secs(3600))
            .with_target(categories.clone())
            .start();
        assert!(wait_until(|| connectivity.subscriber_count() == 1).await);

        connectivity.set_online(true);

        assert!(wait_until(|| remote.creates() == 1).await);
        handle.shutdown().await;
        assert_eq!(categories.pending().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_periodic_sweep_only_while_online() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let connectivity = Connectivity::new(true);
        let remote = FakeRemote::<Customer>::new();
        remote.set_unreachable(true);
        let customers = Arc::new(EntitySynchronizer::new(
            store.table::<Customer>(),
            Some(remote.clone()),
            connectivity.clone(),
        ));
        customers.create(Customer::new("Ada")).await.unwrap();

        let handle = SyncOrchestrator::new(connectivity.clone(), Duration::from_millis(50))
            .with_target(customers.clone())
            .start();
        // Let the initial refresh fail; only a timer tick can push afterwards
        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(remote.creates(), 0);

        remote.set_unreachable(false);
        assert!(wait_until(|| remote.creates() == 1).await);
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initial_refresh_loads_snapshot() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let connectivity = Connectivity::new(true);
        let remote = FakeRemote::<Category>::new();
        let seeded = remote.seed(Category::new("Spices"));
        let categories = Arc::new(EntitySynchronizer::new(
            store.table::<Category>(),
            Some(remote),
            connectivity.clone(),
        ));

        let handle = SyncOrchestrator::new(connectivity, Duration::from_secs(3600))
            .with_target(categories.clone())
            .start();

        assert!(wait_until(|| categories.items() == vec![seeded.clone()]).await);
        handle.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dropping_handle_releases_subscription() {
        let connectivity = Connectivity::new(false);
        let handle = SyncOrchestrator::new(connectivity.clone(), Duration::from_secs(3600)).start();
        assert!(wait_until(|| connectivity.subscriber_count() == 1).await);

        drop(handle);

        assert!(wait_until(|| connectivity.subscriber_count() == 0).await);
    }
}
