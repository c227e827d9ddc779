//! offline_push tool implementation.
//!
//! Turns a push payload into the notification the site would show.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use shellcache_client::{PushPayload, Registration};
use shellcache_core::Error;

use super::json_result;

/// Implementation of the offline_push tool.
pub fn push_impl(registration: &Registration, payload: PushPayload) -> Result<CallToolResult, McpError> {
    if payload.title.trim().is_empty() {
        return Err(Error::InvalidInput("title cannot be empty".into()).into());
    }
    json_result(&registration.push(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, registration, site};

    #[tokio::test]
    async fn test_push_notification() {
        let reg = registration(site()).await;
        let payload = PushPayload { title: "Release".into(), body: "v2 is out".into() };

        let value = output(&push_impl(&reg, payload).unwrap());
        assert_eq!(value["title"], "Release");
        assert_eq!(value["icon"], "/struct/images/favicon.svg");
        assert_eq!(value["actions"][0]["action"], "view");
        assert_eq!(value["actions"][1]["title"], "Dismiss");
    }

    #[tokio::test]
    async fn test_push_requires_title() {
        let reg = registration(site()).await;
        let payload = PushPayload { title: " ".into(), body: String::new() };
        assert!(push_impl(&reg, payload).is_err());
    }
}
