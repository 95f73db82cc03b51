//! Self-rescheduling background tasks.

use guildsync_error::GuildsyncResult;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// A tokio task that runs a tick function on a fixed period until stopped.
///
/// The first tick runs immediately. A failing tick is logged and the task
/// keeps its schedule. Dropping the handle also stops the task.
///
/// # Example
///
/// ```
/// use guildsync_shard::PeriodicTask;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() {
/// let ticks = Arc::new(AtomicU32::new(0));
/// let counter = ticks.clone();
/// let task = PeriodicTask::spawn("counter", Duration::from_millis(10), move || {
///     let counter = counter.clone();
///     async move {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// });
/// tokio::time::sleep(Duration::from_millis(35)).await;
/// task.stop().await;
/// assert!(ticks.load(Ordering::SeqCst) >= 2);
/// # }
/// ```
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `tick` every `period` on the current runtime.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = GuildsyncResult<()>> + Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = tick().await {
                            error!(task = name, error = %e, "Periodic task tick failed");
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!(task = name, "Periodic task loop exited");
        });

        info!(task = name, ?period, "Periodic task started");
        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Task name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal shutdown and wait for the current tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(task = self.name, error = %e, "Periodic task ended abnormally");
        }
        info!(task = self.name, "Periodic task stopped");
    }
}
