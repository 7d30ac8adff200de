//! Resend cooldown timer.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Seconds a user waits between resend requests.
pub const RESEND_COOLDOWN_SECS: u32 = 30;

const TICK: Duration = Duration::from_secs(1);

/// Countdown that decrements once per second until it reaches zero.
///
/// The ticking task is owned by this handle: it stops by itself at zero
/// and is aborted when the handle is cancelled or dropped.
pub struct Cooldown {
    remaining: Arc<watch::Sender<u32>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Cooldown {
    /// Start counting down from `seconds`. Must be called inside a runtime.
    pub fn start(seconds: u32) -> Self {
        let (tx, _rx) = watch::channel(0);
        let cooldown = Self {
            remaining: Arc::new(tx),
            task: Mutex::new(None),
        };
        cooldown.restart(seconds);
        cooldown
    }

    /// Seconds left before a resend is allowed.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.remaining() == 0
    }

    /// Observe every change of the counter.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    /// Whether the ticking task is still alive.
    pub fn is_armed(&self) -> bool {
        self.lock_task()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Reset the counter to `seconds` and re-arm the ticker.
    pub fn restart(&self, seconds: u32) {
        let mut task = self.lock_task();
        if let Some(previous) = task.take() {
            previous.abort();
        }

        self.remaining.send_replace(seconds);
        if seconds == 0 {
            return;
        }

        let remaining = Arc::clone(&self.remaining);
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let mut reached_zero = false;
                remaining.send_modify(|value| {
                    *value = value.saturating_sub(1);
                    reached_zero = *value == 0;
                });

                if reached_zero {
                    debug!("Resend cooldown elapsed");
                    break;
                }
            }
        }));
    }

    /// Stop ticking; the counter keeps its current value.
    pub fn cancel(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        // A poisoned lock only means a panic elsewhere; the handle is still usable.
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Cooldown {
    fn drop(&mut self) {
        self.cancel();
    }
}
