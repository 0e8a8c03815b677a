//! Control channel wire types.
//!
//! Two sources feed the control channel: the application page, which posts
//! `{ "type": ... }` messages, and the remote push service, which delivers a
//! JSON notification payload.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

pub const NOTIFICATION_ICON: &str = "/icons/icon-192x192.png";
pub const NOTIFICATION_BADGE: &str = "/icons/badge-72x72.png";
pub const NOTIFICATION_VIBRATE: [u32; 3] = [100, 50, 100];

/// Action that opens the application when a notification is clicked.
pub const ACTION_EXPLORE: &str = "explore";
pub const ACTION_CLOSE: &str = "close";

/// Message posted by the application to the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting instance without waiting for the active one to go away.
    SkipWaiting,
    /// Delete every cache generation.
    CacheUpdate,
}

impl ControlMessage {
    /// Decode a posted message. Anything without a known `type` is malformed.
    pub fn parse(value: &serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value.clone()).map_err(|e| Error::MalformedControlMessage(e.to_string()))
    }
}

/// Button shown on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationAction {
    fn new(action: &str, title: &str, icon: &str) -> Self {
        Self { action: action.to_string(), title: title.to_string(), icon: Some(icon.to_string()) }
    }
}

/// Actions attached when the push payload carries none.
pub fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction::new(ACTION_EXPLORE, "Voir", "/icons/checkmark.png"),
        NotificationAction::new(ACTION_CLOSE, "Fermer", "/icons/xmark.png"),
    ]
}

/// Payload delivered by the push service. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub actions: Vec<NotificationAction>,
}

impl PushPayload {
    /// Decode raw push data.
    ///
    /// Empty data, non-JSON data and payloads without a non-blank `title`
    /// are all malformed.
    pub fn parse(data: &str) -> Result<Self, Error> {
        if data.trim().is_empty() {
            return Err(Error::MalformedPushPayload("empty payload".into()));
        }

        let payload: Self = serde_json::from_str(data).map_err(|e| Error::MalformedPushPayload(e.to_string()))?;

        if payload.title.trim().is_empty() {
            return Err(Error::MalformedPushPayload("title must not be empty".into()));
        }

        Ok(payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// Notification raised on the platform's notification surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: Option<String>,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn from_payload(payload: PushPayload, arrived_at: DateTime<Utc>) -> Self {
        let actions = if payload.actions.is_empty() { default_actions() } else { payload.actions };

        Self {
            title: payload.title,
            body: payload.body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
            vibrate: NOTIFICATION_VIBRATE.to_vec(),
            data: NotificationData { date_of_arrival: arrived_at.timestamp_millis(), primary_key: 1 },
            actions,
        }
    }
}
