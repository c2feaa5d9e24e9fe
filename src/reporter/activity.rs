use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::environment::provider::EnvironmentProvider;
use crate::models::activity::{ActivityDetails, ActivityRecord};
use crate::reporter::transport::{ActivityTransport, HttpTransport};
use crate::session::context::SessionContext;

/// Records activities into the session log and ships each one to the collector.
///
/// `log` is fire-and-forget: the record is appended before `log` returns and
/// the network submission runs as a detached task whose failure only reaches
/// the diagnostic log.
pub struct ActivityReporter<T: ActivityTransport = HttpTransport> {
    context: Arc<SessionContext>,
    environment: Arc<dyn EnvironmentProvider>,
    transport: Arc<T>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: ActivityTransport> ActivityReporter<T> {
    pub fn new(
        context: Arc<SessionContext>,
        environment: Arc<dyn EnvironmentProvider>,
        transport: T,
    ) -> Self {
        Self {
            context,
            environment,
            transport: Arc::new(transport),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn log_action(&self, action: &str) {
        self.log(action, ActivityDetails::new());
    }

    pub fn log(&self, action: &str, details: ActivityDetails) {
        // Environment lookups may be slow; read them before the log is locked.
        let user_agent = self.environment.user_agent();
        let screen_resolution = self.environment.screen_resolution();
        let language = self.environment.locale();

        let (position, record) = self.context.append_with(|time_from_load, timestamp| {
            ActivityRecord {
                action: action.to_string(),
                timestamp,
                time_from_load,
                details,
                session_id: self.context.session_id().to_string(),
                user_agent,
                screen_resolution,
                language,
            }
        });
        log::debug!(
            "Activity #{} recorded: {} at {:.3}s",
            position,
            record.action,
            record.time_from_load
        );

        self.submit_detached(record);
    }

    fn submit_detached(&self, record: ActivityRecord) {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!(
                    "Error logging activity: no async runtime to submit {} ({})",
                    record.action,
                    e
                );
                return;
            }
        };

        let transport = Arc::clone(&self.transport);
        let task = runtime.spawn(async move {
            if let Err(e) = transport.submit(&record).await {
                log::error!("Error logging activity: {:#}", e);
            }
        });

        let mut in_flight = self.lock_in_flight();
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(task);
    }

    /// Number of submissions that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.lock_in_flight()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Waits up to `timeout` for pending submissions. Returns `true` when all
    /// of them finished; anything still running keeps running detached.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let pending: Vec<JoinHandle<()>> = std::mem::take(&mut *self.lock_in_flight());
        if pending.is_empty() {
            return true;
        }

        let count = pending.len();
        let drained = tokio::time::timeout(timeout, async move {
            for handle in pending {
                if let Err(e) = handle.await {
                    log::warn!("Activity submission task ended abnormally: {}", e);
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                log::debug!("Settled {} pending submission(s)", count);
                true
            }
            Err(_) => {
                log::warn!("Gave up waiting for activity submissions after {:?}", timeout);
                false
            }
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
