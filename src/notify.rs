//! Notification injection
//!
//! After every tool call the gateway polls the backend for unread
//! notifications and prepends them to the tool's text. Polling consumes the
//! notifications on the backend side. A failed poll never fails the call.

use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::backend::Backend;
use crate::render::views::{NotificationsView, decode};

pub const NOTIFICATIONS_PATH: &str = "/notifications/pending";
const HEADER: &str = "=== NOTIFICATIONS ===";

#[derive(Clone)]
pub struct NotificationInjector {
    backend: Arc<dyn Backend>,
}

impl NotificationInjector {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Poll once and format the unread notifications, if any
    pub async fn fetch_and_format(&self, session_id: Option<&str>) -> Option<String> {
        let data = match self.backend.get(NOTIFICATIONS_PATH, &Vec::new(), session_id).await {
            Ok(data) => data,
            Err(e) => {
                debug!("Notification poll failed: {}", e);
                return None;
            }
        };

        let view: NotificationsView = decode(&data);
        let notifications = view.notifications.unwrap_or_default();
        if notifications.is_empty() {
            return None;
        }

        let mut lines = vec![HEADER.to_string()];
        lines.extend(
            notifications
                .iter()
                .map(|n| format!("- {}", notification_text(n))),
        );
        lines.push(String::new());
        Some(lines.join("\n"))
    }

    /// Prepend pending notifications to `text`
    pub async fn with_notifications(&self, text: String, session_id: Option<&str>) -> String {
        match self.fetch_and_format(session_id).await {
            Some(header) => header + &text,
            None => text,
        }
    }
}

/// Display text of one notification; odd shapes are shown as JSON
fn notification_text(item: &Value) -> String {
    let content = match item {
        Value::Object(fields) => fields.get("content").unwrap_or(&Value::Null),
        other => other,
    };
    match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Debug for NotificationInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationInjector").finish_non_exhaustive()
    }
}
