//! Push notifications, notification clicks and background sync.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sync tag that triggers background work.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Where a click on the `view` action leads.
pub const VIEW_URL: &str = "/";

/// Payload of a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the site notification for a push, with `view` and `dismiss` actions.
    pub fn from_push(payload: PushPayload, icon: &str) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon: icon.to_string(),
            badge: icon.to_string(),
            actions: vec![
                NotificationAction { action: "view".into(), title: "View".into(), icon: Some(icon.to_string()) },
                NotificationAction { action: "dismiss".into(), title: "Dismiss".into(), icon: None },
            ],
        }
    }
}

/// Result of a notification click. The notification is always closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClickOutcome {
    pub closed: bool,
    /// Window opened or focused, if any.
    pub open_window: Option<String>,
}

pub fn notification_click(action: &str) -> ClickOutcome {
    let open_window = (action == "view").then(|| VIEW_URL.to_string());
    ClickOutcome { closed: true, open_window }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_push() {
        let payload = PushPayload { title: "New release".into(), body: "v2 is out".into() };
        let notification = Notification::from_push(payload, "/struct/images/favicon.svg");
        assert_eq!(notification.title, "New release");
        assert_eq!(notification.badge, "/struct/images/favicon.svg");
        let actions: Vec<_> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["view", "dismiss"]);
        assert!(notification.actions[1].icon.is_none());
    }

    #[test]
    fn test_payload_body_defaults() {
        let payload: PushPayload = serde_json::from_str(r#"{"title":"Hi"}"#).unwrap();
        assert_eq!(payload.body, "");
    }

    #[test]
    fn test_click_actions() {
        assert_eq!(notification_click("view"), ClickOutcome { closed: true, open_window: Some("/".into()) });
        assert_eq!(notification_click("dismiss"), ClickOutcome { closed: true, open_window: None });
        assert_eq!(notification_click(""), ClickOutcome { closed: true, open_window: None });
    }
}
