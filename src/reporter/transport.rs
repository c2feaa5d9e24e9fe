use anyhow::{Context, Result};
use reqwest::Url;
use std::future::Future;

use crate::config::settings::Settings;
use crate::models::activity::ActivityRecord;

/// Delivers a single activity record to the collector.
pub trait ActivityTransport: Send + Sync + 'static {
    fn submit(&self, record: &ActivityRecord) -> impl Future<Output = Result<()>> + Send;
}

/// JSON `POST` to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url, client: reqwest::Client) -> Self {
        Self { client, endpoint }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let endpoint = settings.endpoint_url()?;
        log::info!("Activity records will be sent to {}", endpoint);
        Ok(Self::new(endpoint, client))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ActivityTransport for HttpTransport {
    async fn submit(&self, record: &ActivityRecord) -> Result<()> {
        // `.json()` sets `Content-Type: application/json`
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?;

        let status = response.status();
        response
            .error_for_status()
            .with_context(|| format!("POST {} answered {}", self.endpoint, status))?;

        log::debug!("Delivered {} ({})", record.action, status);
        Ok(())
    }
}
