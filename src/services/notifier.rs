use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domains::schedule::{self, TimeLeft};
use crate::interfaces::messenger::Messenger;
use crate::store::ScheduleStore;

/// Handle table for per-user notifier loops, keyed by user id. Starting a
/// notifier for a user always cancels the previous one first, so at most one
/// loop per user is ever live.
#[derive(Default)]
pub struct NotifierRegistry {
    handles: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl NotifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any notifier already registered for the user, then spawns a
    /// fresh loop with the given interval.
    pub async fn start(
        &self,
        user_id: i64,
        interval_minutes: u64,
        store: Arc<ScheduleStore>,
        messenger: Arc<dyn Messenger>,
    ) {
        let mut handles = self.handles.lock().await;
        if let Some(handle) = handles.remove(&user_id) {
            cancel(handle).await;
        }
        let handle = tokio::spawn(notify_loop(user_id, interval_minutes, store, messenger));
        handles.insert(user_id, handle);
    }

    /// Explicit, awaited cancellation. Returns whether a handle was
    /// registered for the user.
    pub async fn cancel(&self, user_id: i64) -> bool {
        let handle = self.handles.lock().await.remove(&user_id);
        match handle {
            Some(handle) => {
                cancel(handle).await;
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self, user_id: i64) -> bool {
        self.handles
            .lock()
            .await
            .get(&user_id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Number of registered handles, finished or not.
    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }

    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().await;
            guard.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            cancel(handle).await;
        }
    }
}

async fn cancel(handle: JoinHandle<()>) {
    handle.abort();
    let _ = handle.await;
}

/// Per-user notifier loop. Each tick re-reads the user's schedule and exits
/// if the record is gone or the reminder is no longer active, then sends the
/// time-left message and sleeps for the configured interval.
async fn notify_loop(
    user_id: i64,
    interval_minutes: u64,
    store: Arc<ScheduleStore>,
    messenger: Arc<dyn Messenger>,
) {
    let interval = Duration::from_secs(interval_minutes.max(1) * 60);
    loop {
        let Some(schedule) = store.get(user_id).await else {
            break;
        };
        if !schedule.reminder_active() {
            break;
        }
        let left = TimeLeft::until(schedule.schedule_time, schedule::now());
        let text = format!("Reminder: {left} left!");
        if let Err(err) = messenger.send_message(user_id, &text).await {
            tracing::warn!(user_id, error = %err, "failed to deliver reminder");
        }
        tokio::time::sleep(interval).await;
    }
}
