use chrono::{DateTime, Local, SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::models::activity::ActivityRecord;

const SESSION_PREFIX: &str = "SESSION";
const SUFFIX_LEN: usize = 9;

/// Generates `SESSION_<epochMillis>_<9 base-36 chars>`.
///
/// Uniqueness is probabilistic; collisions only merge analytics groups.
pub fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + (idx - 10)) as char
            }
        })
        .collect();

    format!("{}_{}_{}", SESSION_PREFIX, Utc::now().timestamp_millis(), suffix)
}

/// State for one page lifetime.
///
/// Create exactly one per page load and share it by reference (usually an
/// `Arc`) with the reporter. The id and load time never change; the activity
/// log only grows and is dropped together with the context.
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    page_load_time: DateTime<Local>,
    loaded_at: Instant,
    activities: Mutex<Vec<ActivityRecord>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub page_load_time: DateTime<Local>,
    pub activities: Vec<ActivityRecord>,
}

impl SessionContext {
    pub fn initialize() -> Self {
        let context = Self {
            session_id: generate_session_id(),
            page_load_time: Local::now(),
            loaded_at: Instant::now(),
            activities: Mutex::new(Vec::new()),
        };
        log::info!("Session {} started at {}", context.session_id, context.page_load_time);
        context
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn page_load_time(&self) -> DateTime<Local> {
        self.page_load_time
    }

    /// Seconds since the context was created, from a monotonic clock so
    /// successive readings never decrease.
    pub fn time_from_load(&self) -> f64 {
        self.time_on_page().as_secs_f64()
    }

    pub fn time_on_page(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    /// Appends the record produced by `build`, which receives the seconds
    /// since load and the ISO-8601 timestamp. Both are read while the log is
    /// locked, so insertion order always matches clock order.
    pub(crate) fn append_with<F>(&self, build: F) -> (usize, ActivityRecord)
    where
        F: FnOnce(f64, String) -> ActivityRecord,
    {
        let mut activities = self.lock_activities();
        let record = build(
            self.time_from_load(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        activities.push(record.clone());
        (activities.len(), record)
    }

    /// Snapshot of the activity log in insertion order.
    pub fn activities(&self) -> Vec<ActivityRecord> {
        self.lock_activities().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_activities().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            page_load_time: self.page_load_time,
            activities: self.activities(),
        }
    }

    // A panic while holding the lock cannot leave a half-pushed record, so a
    // poisoned log is still consistent.
    fn lock_activities(&self) -> MutexGuard<'_, Vec<ActivityRecord>> {
        self.activities.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
