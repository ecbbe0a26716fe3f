//! Periodic scan that triggers deliveries for due subscribers.

use crate::{dispatcher::Dispatcher, registry::Registry};
use alloc::{sync::Arc, vec::Vec};
use chrono::{DateTime, Utc};
use core::time::Duration;
use tokio::{sync::oneshot, task::JoinHandle};

/// Time between two scans of the registry.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5 * 60);

pub struct Scheduler {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    period: Duration,
}

/// Handle to a running [`Scheduler`].
pub struct SchedulerHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops the timer. Deliveries already in flight are not awaited.
    pub async fn shutdown(self) {
        let Self { stop, task } = self;
        // The task may have already exited on its own.
        let _ = stop.send(());
        if let Err(err) = task.await {
            log::error!("scheduler task failed: {err}");
        }
    }
}

impl Scheduler {
    pub fn new(registry: Arc<Registry>, dispatcher: Arc<Dispatcher>, period: Duration) -> Self {
        Self { registry, dispatcher, period }
    }

    /// Walks the registry once. Every due subscriber is rescheduled relative to
    /// `now` before its delivery starts, so a slow or failing delivery never
    /// affects the deadline. Deliveries run as independent tasks.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let mut deliveries = Vec::new();
        for id in self.registry.snapshot() {
            let due = self
                .registry
                .update_if(id, |sub| {
                    if !sub.is_due(now) {
                        return false;
                    }
                    sub.reschedule(now);
                    true
                })
                .await;
            if due != Some(true) {
                continue;
            }

            let dispatcher = Arc::clone(&self.dispatcher);
            deliveries.push(tokio::spawn(async move {
                match dispatcher.deliver(id).await {
                    Ok(receipt) => log::info!("scheduled delivery to {id} succeeded as {}", receipt.token),
                    Err(err) => log::error!("scheduled delivery to {id} failed: {err}"),
                }
            }));
        }

        if !deliveries.is_empty() {
            log::debug!("tick at {now} triggered {} deliveries", deliveries.len());
        }
        deliveries
    }

    /// Runs [`Self::tick`] every period until the handle is shut down. The
    /// first scan happens immediately.
    pub fn spawn(self) -> SchedulerHandle {
        let (stop, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = interval.tick() => {
                        // Deliveries are detached.
                        drop(self.tick(Utc::now()).await);
                    }
                }
            }
            log::info!("scheduler stopped");
        });
        SchedulerHandle { stop, task }
    }
}
