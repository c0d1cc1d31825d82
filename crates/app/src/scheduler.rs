//! Shutdown scheduler — a cancellable delayed trigger for a planned
//! shutdown time.
//!
//! One slot: scheduling replaces any pending timer, interrupting clears it.
//! The timer task clears the slot itself when it fires naturally, so a
//! fired schedule leaves no handle behind.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use skyshed_domain::id::ScheduleId;
use skyshed_domain::time::{Timestamp, now};

/// How long [`ShutdownScheduler::interrupt`] waits for the timer task to
/// observe cancellation before abandoning it.
const INTERRUPT_WAIT: Duration = Duration::from_secs(1);

struct Scheduled {
    id: ScheduleId,
    target: Timestamp,
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Single-slot scheduler for a delayed shutdown trigger.
#[derive(Default)]
pub struct ShutdownScheduler {
    slot: Arc<Mutex<Option<Scheduled>>>,
}

impl ShutdownScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` to run once `target` is reached.
    ///
    /// Any previously scheduled trigger is cancelled first. A target in the
    /// past fires immediately.
    pub fn schedule<F, Fut>(&self, target: Timestamp, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let id = ScheduleId::new();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let slot = Arc::clone(&self.slot);

        // Hold the slot across the spawn so a zero-delay timer cannot run
        // before the new entry is stored.
        let mut guard = lock(&self.slot);
        let handle = tokio::spawn(async move {
            let delay = (target - now()).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                () = tokio::time::sleep(delay) => {
                    let ours = {
                        let mut slot = lock(&slot);
                        match slot.as_ref() {
                            Some(current) if current.id == id => {
                                *slot = None;
                                true
                            }
                            _ => false,
                        }
                    };
                    if ours {
                        tracing::info!(%target, "scheduled shutdown time reached");
                        on_fire().await;
                    }
                }
                _ = cancel_rx => {
                    tracing::debug!(%target, "scheduled shutdown cancelled");
                }
            }
        });
        let previous = guard.replace(Scheduled {
            id,
            target,
            cancel: cancel_tx,
            handle,
        });
        drop(guard);

        if let Some(previous) = previous {
            let _ = previous.cancel.send(());
        }
    }

    /// Cancel the pending trigger, if any.
    ///
    /// Waits up to one second for the timer task to observe cancellation;
    /// past that bound the handle is abandoned with a log entry rather than
    /// blocking indefinitely. Best-effort by design.
    pub async fn interrupt(&self) {
        let Some(scheduled) = lock(&self.slot).take() else {
            return;
        };
        let Scheduled { target, cancel, handle, .. } = scheduled;
        let _ = cancel.send(());
        if tokio::time::timeout(INTERRUPT_WAIT, handle).await.is_err() {
            tracing::warn!(
                %target,
                "shutdown timer did not observe cancellation in time, abandoning it"
            );
        }
    }

    /// The pending trigger time, if one is armed.
    #[must_use]
    pub fn scheduled_for(&self) -> Option<Timestamp> {
        lock(&self.slot).as_ref().map(|scheduled| scheduled.target)
    }
}

fn lock(slot: &Mutex<Option<Scheduled>>) -> MutexGuard<'_, Option<Scheduled>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
