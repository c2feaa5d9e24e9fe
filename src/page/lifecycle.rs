use serde_json::json;
use std::collections::BTreeSet;

use crate::models::activity::ActivityDetails;
use crate::reporter::activity::ActivityReporter;
use crate::reporter::transport::ActivityTransport;

/// Performs client-side navigation.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// A clicked element: its CSS classes and whether it is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub classes: BTreeSet<String>,
    pub visible: bool,
}

impl Element {
    pub fn with_classes(classes: &[&str]) -> Self {
        Self {
            classes: classes.iter().map(|c| c.to_string()).collect(),
            visible: true,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

/// Wires page lifecycle events to the activity reporter.
pub struct Page<'a, T: ActivityTransport, N: Navigator> {
    reporter: &'a ActivityReporter<T>,
    navigator: N,
    redirect_path: String,
}

impl<'a, T: ActivityTransport, N: Navigator> Page<'a, T, N> {
    pub fn new(
        reporter: &'a ActivityReporter<T>,
        navigator: N,
        redirect_path: impl Into<String>,
    ) -> Self {
        Self {
            reporter,
            navigator,
            redirect_path: redirect_path.into(),
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn on_load(&self, url: &str) {
        self.reporter.log("page_loaded", details(json!({ "url": url })));
    }

    /// Logs `action` and redirects straight away; the redirect never waits on delivery.
    pub fn log_activity_and_navigate(&self, action: &str) {
        self.reporter.log_action(action);
        self.navigator.navigate(&self.redirect_path);
    }

    /// Legacy outside-click handler for overlays. No current flow opens one.
    pub fn on_click(&self, target: &mut Element) {
        if target.has_class("modal") {
            target.visible = false;
            self.reporter.log_action("modal_closed_outside");
        }
    }

    pub fn on_unload(&self) {
        let time_on_page = self.reporter.context().time_on_page().as_secs_f64();
        self.reporter.log("page_unload", details(json!({ "timeOnPage": time_on_page })));
    }
}

fn details(value: serde_json::Value) -> ActivityDetails {
    match value {
        serde_json::Value::Object(map) => map,
        _ => ActivityDetails::new(),
    }
}
