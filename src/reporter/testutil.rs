//! In-memory transports and a fixed environment for tests.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::environment::provider::{EnvironmentProvider, StaticEnvironment};
use crate::models::activity::ActivityRecord;
use crate::reporter::transport::ActivityTransport;

pub fn test_environment() -> Arc<dyn EnvironmentProvider> {
    Arc::new(StaticEnvironment::new("test-agent/1.0", "1920x1080", "en-US"))
}

/// Keeps every submitted record, optionally after a delay.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    submitted: Arc<Mutex<Vec<ActivityRecord>>>,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<ActivityRecord> {
        self.submitted.lock().unwrap().clone()
    }
}

impl ActivityTransport for RecordingTransport {
    async fn submit(&self, record: &ActivityRecord) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.submitted.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Fails every submission, counting the attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingTransport {
    attempts: Arc<AtomicUsize>,
}

impl FailingTransport {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ActivityTransport for FailingTransport {
    async fn submit(&self, _record: &ActivityRecord) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("simulated network failure")
    }
}
