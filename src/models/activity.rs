use serde::{Deserialize, Serialize};

/// Caller-supplied details attached to an activity; always a JSON object.
pub type ActivityDetails = serde_json::Map<String, serde_json::Value>;

/// One logged event with its session and environment metadata.
///
/// Field names serialize in camelCase, which is the body the collecting
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub action: String,
    pub timestamp: String, // ISO-8601, UTC, millisecond precision
    pub time_from_load: f64, // seconds
    pub details: ActivityDetails,
    pub session_id: String,

    // Environment captured at creation time
    pub user_agent: String,
    pub screen_resolution: String,
    pub language: String,
}
