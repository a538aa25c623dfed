use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::domains::schedule::Schedule;
use crate::error::{CountdownBotError, Result};

/// Flat-file schedule store: one JSON document mapping user id (as string) to
/// a Schedule. Loaded once at startup, held in memory, and rewritten wholesale
/// after every mutation. A missing file loads as an empty mapping; a malformed
/// file is an error.
///
/// All mutation funnels through the internal mutex, so there is a single
/// writer even under a multi-threaded runtime. Writes are plain overwrites
/// with no temp-file swap; a crash mid-write can corrupt the file.
pub struct ScheduleStore {
    path: PathBuf,
    schedules: Mutex<BTreeMap<String, Schedule>>,
}

impl ScheduleStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;
        let schedules = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| CountdownBotError::Storage(e.to_string()))?;
            serde_json::from_str(&content)
                .map_err(|e| CountdownBotError::Serialization(e.to_string()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            schedules: Mutex::new(schedules),
        })
    }

    pub async fn get(&self, user_id: i64) -> Option<Schedule> {
        self.schedules
            .lock()
            .await
            .get(&user_id.to_string())
            .cloned()
    }

    /// Inserts or replaces the user's record and persists the full mapping.
    pub async fn upsert(&self, schedule: Schedule) -> Result<()> {
        let mut guard = self.schedules.lock().await;
        guard.insert(schedule.user_id.to_string(), schedule);
        self.flush(&guard)
    }

    /// Mutates the user's record in place under the store lock and persists.
    /// Returns the updated record, or `None` (and no write) if the user has
    /// no schedule.
    pub async fn update<F>(&self, user_id: i64, mutate: F) -> Result<Option<Schedule>>
    where
        F: FnOnce(&mut Schedule),
    {
        let mut guard = self.schedules.lock().await;
        let Some(schedule) = guard.get_mut(&user_id.to_string()) else {
            return Ok(None);
        };
        mutate(schedule);
        let updated = schedule.clone();
        self.flush(&guard)?;
        Ok(Some(updated))
    }

    pub async fn remove(&self, user_id: i64) -> Result<Option<Schedule>> {
        let mut guard = self.schedules.lock().await;
        let removed = guard.remove(&user_id.to_string());
        if removed.is_some() {
            self.flush(&guard)?;
        }
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.schedules.lock().await.len()
    }

    fn flush(&self, schedules: &BTreeMap<String, Schedule>) -> Result<()> {
        let rendered = serde_json::to_string_pretty(schedules)
            .map_err(|e| CountdownBotError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, rendered).map_err(|e| CountdownBotError::Storage(e.to_string()))
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CountdownBotError::Storage(e.to_string()))?;
    }
    Ok(())
}
