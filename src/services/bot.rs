use std::sync::Arc;

use crate::domains::schedule::{self, Reminder, Schedule};
use crate::error::Result;
use crate::interfaces::messenger::Messenger;
use crate::services::notifier::NotifierRegistry;
use crate::store::ScheduleStore;

const USAGE_SET: &str = "Usage: /set <days> <hours>";
const USAGE_REMINDER: &str = "Usage: /reminder <interval_in_minutes>";
const USAGE_RESET: &str = "Usage: /resetrmd <interval_in_minutes>";
const NEED_SCHEDULE: &str = "You need to set a schedule first using /set <days> <hours>.";
const NEED_REMINDER: &str =
    "You need to set a reminder first using /reminder <interval_in_minutes>.";

/// Command surface of the bot. Each handler returns the reply text for the
/// invoking user; bad arguments and precondition violations are answered with
/// usage or guidance strings and leave no state behind. Only storage failures
/// surface as `Err`.
pub struct ReminderBot {
    store: Arc<ScheduleStore>,
    notifiers: NotifierRegistry,
    messenger: Arc<dyn Messenger>,
}

impl ReminderBot {
    pub fn new(store: Arc<ScheduleStore>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            store,
            notifiers: NotifierRegistry::new(),
            messenger,
        }
    }

    pub fn store(&self) -> &Arc<ScheduleStore> {
        &self.store
    }

    pub fn notifiers(&self) -> &NotifierRegistry {
        &self.notifiers
    }

    /// Routes one inbound message. A leading `/` is optional; anything that
    /// is not a known command gets the greeting.
    pub async fn dispatch(&self, user_id: i64, username: &str, text: &str) -> Result<String> {
        let trimmed = text.trim();
        let stripped = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut tokens = stripped.split_whitespace();
        let command = tokens.next().unwrap_or_default();
        let args: Vec<&str> = tokens.collect();

        match command {
            "set" => self.set_schedule(user_id, username, &args).await,
            "reminder" => self.set_reminder(user_id, username, &args).await,
            "start" => self.start_reminder(user_id).await,
            "stop" => self.stop_reminder(user_id).await,
            "delete" => self.delete_schedule(user_id).await,
            "resetrmd" => self.reset_interval(user_id, &args).await,
            _ => Ok(self.greet(username)),
        }
    }

    pub fn greet(&self, username: &str) -> String {
        format!("Hello, {username}!")
    }

    /// `set <days> <hours>`: computes the target time from now and replaces
    /// the user's record wholesale, reminder state included.
    pub async fn set_schedule(&self, user_id: i64, username: &str, args: &[&str]) -> Result<String> {
        let parsed = match args {
            [days, hours] => days.parse::<i64>().ok().zip(hours.parse::<i64>().ok()),
            _ => None,
        };
        let Some((days, hours)) = parsed else {
            return Ok(USAGE_SET.to_string());
        };

        let Some(schedule_time) = schedule::target_from_now(days, hours) else {
            return Ok(USAGE_SET.to_string());
        };
        self.store
            .upsert(Schedule {
                user_id,
                username: username.to_string(),
                schedule_time,
                reminder: None,
            })
            .await?;

        Ok(format!(
            "Schedule set for {username} at {}.\nNow set a reminder using /reminder <interval_in_minutes>.",
            schedule::render(schedule_time)
        ))
    }

    /// `reminder <interval>`: arms a reminder on an existing schedule. The
    /// reminder stays inactive until `start`.
    pub async fn set_reminder(&self, user_id: i64, username: &str, args: &[&str]) -> Result<String> {
        let interval = args
            .first()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|value| *value > 0);
        let Some(interval_minutes) = interval else {
            return Ok(USAGE_REMINDER.to_string());
        };

        let updated = self
            .store
            .update(user_id, |schedule| {
                schedule.reminder = Some(Reminder {
                    active: false,
                    interval_minutes,
                    user_id,
                    username: username.to_string(),
                    schedule_time: schedule.schedule_time,
                });
            })
            .await?;
        if updated.is_none() {
            return Ok(NEED_SCHEDULE.to_string());
        }

        Ok(format!(
            "Reminder set for {username} to repeat every {interval_minutes} minutes."
        ))
    }

    /// `start`: marks the reminder active, persists, and spawns the notifier
    /// loop (cancelling any stale handle for this user first).
    pub async fn start_reminder(&self, user_id: i64) -> Result<String> {
        let Some(current) = self.store.get(user_id).await else {
            return Ok(NEED_SCHEDULE.to_string());
        };
        let Some(reminder) = current.reminder else {
            return Ok(NEED_REMINDER.to_string());
        };
        if reminder.active {
            return Ok("Your reminder is already active.".to_string());
        }

        self.store
            .update(user_id, |schedule| {
                if let Some(reminder) = schedule.reminder.as_mut() {
                    reminder.active = true;
                }
            })
            .await?;
        self.notifiers
            .start(
                user_id,
                reminder.interval_minutes,
                self.store.clone(),
                self.messenger.clone(),
            )
            .await;

        Ok("Starting your reminder!".to_string())
    }

    /// `stop`: marks the reminder inactive, persists, and cancels the
    /// notifier handle.
    pub async fn stop_reminder(&self, user_id: i64) -> Result<String> {
        let active = self
            .store
            .get(user_id)
            .await
            .map(|schedule| schedule.reminder_active())
            .unwrap_or(false);
        if !active {
            return Ok("You don't have an active reminder to stop.".to_string());
        }

        self.store
            .update(user_id, |schedule| {
                if let Some(reminder) = schedule.reminder.as_mut() {
                    reminder.active = false;
                }
            })
            .await?;
        self.notifiers.cancel(user_id).await;

        Ok("Your reminder has been stopped.".to_string())
    }

    /// `resetrmd <interval>`: only valid while the reminder is active.
    /// Persists the new interval, then replaces the running notifier.
    pub async fn reset_interval(&self, user_id: i64, args: &[&str]) -> Result<String> {
        let interval = args
            .first()
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|value| *value > 0);
        let Some(interval_minutes) = interval else {
            return Ok(USAGE_RESET.to_string());
        };

        let active = self
            .store
            .get(user_id)
            .await
            .map(|schedule| schedule.reminder_active())
            .unwrap_or(false);
        if !active {
            return Ok("You need to activate the reminder first using /start.".to_string());
        }

        self.store
            .update(user_id, |schedule| {
                if let Some(reminder) = schedule.reminder.as_mut() {
                    reminder.interval_minutes = interval_minutes;
                }
            })
            .await?;
        self.notifiers
            .start(
                user_id,
                interval_minutes,
                self.store.clone(),
                self.messenger.clone(),
            )
            .await;

        Ok(format!(
            "Your reminder interval has been reset to {interval_minutes} minutes."
        ))
    }

    /// `delete`: removes the record and persists. A running notifier is left
    /// registered on purpose; it finds the record gone on its next tick and
    /// exits on its own.
    pub async fn delete_schedule(&self, user_id: i64) -> Result<String> {
        match self.store.remove(user_id).await? {
            Some(_) => Ok("Your schedule has been deleted.".to_string()),
            None => Ok("You don't have any schedule to delete.".to_string()),
        }
    }

    /// Cancels every notifier. Used on daemon shutdown.
    pub async fn shutdown(&self) {
        self.notifiers.shutdown().await;
    }
}
