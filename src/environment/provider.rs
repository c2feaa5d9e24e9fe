use std::env;

use crate::config::settings::Settings;

const FALLBACK_LANGUAGE: &str = "en-US";
const FALLBACK_RESOLUTION: &str = "0x0";

/// Source of the environment metadata attached to every activity record.
pub trait EnvironmentProvider: Send + Sync {
    fn user_agent(&self) -> String;
    /// `<width>x<height>`; pixels when the host has a screen.
    fn screen_resolution(&self) -> String;
    /// BCP-47 style tag such as `en-US`.
    fn locale(&self) -> String;
}

/// Reads the metadata from the running host, with per-field overrides from settings.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    user_agent: Option<String>,
    screen_resolution: Option<String>,
    language: Option<String>,
}

impl HostEnvironment {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            screen_resolution: settings.screen_resolution.clone(),
            language: settings.language.clone(),
        }
    }

    fn default_user_agent() -> String {
        format!(
            "{}/{} ({}; {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env::consts::OS,
            env::consts::ARCH
        )
    }

    // A headless host has no screen: fall back to the terminal size in
    // character cells (columns x rows), not pixels.
    fn detect_resolution() -> String {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => format!("{}x{}", cols, rows),
            Err(e) => {
                log::debug!("Could not read terminal size: {}", e);
                FALLBACK_RESOLUTION.to_string()
            }
        }
    }

    fn detect_locale() -> String {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find_map(|raw| posix_locale_to_tag(&raw))
            .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
    }
}

impl EnvironmentProvider for HostEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(Self::default_user_agent)
    }

    fn screen_resolution(&self) -> String {
        self.screen_resolution.clone().unwrap_or_else(Self::detect_resolution)
    }

    fn locale(&self) -> String {
        self.language.clone().unwrap_or_else(Self::detect_locale)
    }
}

/// Fixed metadata, for tests and embedders that already know their host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEnvironment {
    pub user_agent: String,
    pub screen_resolution: String,
    pub language: String,
}

impl StaticEnvironment {
    pub fn new(user_agent: &str, screen_resolution: &str, language: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            screen_resolution: screen_resolution.to_string(),
            language: language.to_string(),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn screen_resolution(&self) -> String {
        self.screen_resolution.clone()
    }

    fn locale(&self) -> String {
        self.language.clone()
    }
}

/// Converts `en_US.UTF-8` / `de_DE@euro` style values into `en-US` / `de-DE`.
/// `C` and `POSIX` carry no language and yield `None`.
pub fn posix_locale_to_tag(raw: &str) -> Option<String> {
    let base = raw
        .split(['.', '@'])
        .next()
        .unwrap_or("")
        .trim();

    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }

    let mut parts = base.split(['_', '-']);
    let language = parts.next()?.to_ascii_lowercase();
    if !language.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    match parts.next() {
        Some(region) if !region.is_empty() => {
            Some(format!("{}-{}", language, region.to_ascii_uppercase()))
        }
        _ => Some(language),
    }
}
