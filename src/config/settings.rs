use anyhow::{Context, Result};
use reqwest::Url;
use std::env;
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_ENDPOINT_PATH: &str = "/log-activity";
const DEFAULT_REDIRECT_PATH: &str = "/venue-map";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: Url,
    pub endpoint_path: String,
    pub request_timeout: Duration,
    pub redirect_path: String,

    // Environment overrides, detected from the host when unset
    pub user_agent: Option<String>,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
}

impl Settings {
    fn get_env_path() -> Result<std::path::PathBuf> {
        Ok(env::current_dir()?.join(".env"))
    }

    /// Loads `.env` from the working directory (if present), then reads the
    /// process environment.
    pub fn new() -> Result<Self> {
        let env_path = Self::get_env_path()?;
        if dotenvy::from_path(&env_path).is_ok() {
            log::debug!("Loaded settings from {}", env_path.display());
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = non_empty("ACTIVITY_SERVER_URL")
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url = Url::parse(&raw_url)
            .with_context(|| format!("ACTIVITY_SERVER_URL is not a valid URL: {}", raw_url))?;

        let endpoint_path = non_empty("ACTIVITY_ENDPOINT_PATH")
            .map(|p| Self::normalize_path(&p))
            .unwrap_or_else(|| DEFAULT_ENDPOINT_PATH.to_string());

        let request_timeout = match non_empty("ACTIVITY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().with_context(|| {
                    format!(
                        "ACTIVITY_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {}",
                        raw
                    )
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let redirect_path = non_empty("ACTIVITY_REDIRECT_PATH")
            .map(|p| Self::normalize_path(&p))
            .unwrap_or_else(|| DEFAULT_REDIRECT_PATH.to_string());

        let screen_resolution = non_empty("ACTIVITY_SCREEN_RESOLUTION");
        if let Some(ref resolution) = screen_resolution {
            if !Self::is_resolution(resolution) {
                anyhow::bail!(
                    "ACTIVITY_SCREEN_RESOLUTION must look like <width>x<height>, got {}",
                    resolution
                );
            }
        }

        Ok(Self {
            server_url,
            endpoint_path,
            request_timeout,
            redirect_path,
            user_agent: non_empty("ACTIVITY_USER_AGENT"),
            screen_resolution,
            language: non_empty("ACTIVITY_LANGUAGE"),
        })
    }

    /// Full URL the activity records are POSTed to.
    ///
    /// The endpoint path is resolved under the server URL's own path, so
    /// `https://host/api` + `/log-activity` gives `https://host/api/log-activity`.
    pub fn endpoint_url(&self) -> Result<Url> {
        let mut base = self.server_url.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        base.join(self.endpoint_path.trim_start_matches('/'))
            .with_context(|| format!("cannot join {} onto {}", self.endpoint_path, self.server_url))
    }

    fn normalize_path(path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    fn is_resolution(value: &str) -> bool {
        match value.split_once('x') {
            Some((w, h)) => {
                !w.is_empty()
                    && !h.is_empty()
                    && w.chars().all(|c| c.is_ascii_digit())
                    && h.chars().all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }
}
