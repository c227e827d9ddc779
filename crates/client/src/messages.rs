//! Control messages posted by pages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lifecycle::{ActivateReport, UpdateReport};

/// A message keyed by its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate the waiting version now.
    SkipWaiting,
    /// Re-fetch the primary manifest.
    UpdateCache,
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Read a message from arbitrary JSON. Anything without a string `type`
    /// is not a control message.
    pub fn parse(data: &Value) -> Option<Self> {
        data.get("type")?.as_str()?;
        serde_json::from_value(data.clone()).ok()
    }
}

/// What handling a message did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MessageOutcome {
    Activated { report: ActivateReport },
    /// SKIP_WAITING with no version waiting.
    NothingWaiting,
    Updated { report: UpdateReport },
    /// The update failed; cached entries were left untouched.
    UpdateFailed { error: String },
    Ignored,
}
