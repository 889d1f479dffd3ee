//! Uniform dispatch result and its tree rendering.
//!
//! ```text
//! Delivered                          Rejected
//! Folder "Result"                    Error "Cancel"
//! └── Folder "Messages"              ├── Code    hook-malformed | hook-unrecognizable
//!     ├── Folder "1"                 ├── Source  hookrelay
//!     │   ├── String "Channel"       └── Message <abort reason>
//!     │   └── String "Message"
//!     └── Folder "2" ...
//! ```
use serde::Serialize;

use crate::context::Notification;
use ingest::Entry;

/// Source tag attached to every rejected result.
pub const RESULT_SOURCE: &str = "hookrelay";

/// Outcome of one dispatch that did not crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum HookResult {
    Delivered(Vec<Notification>),
    Rejected {
        code: String,
        source: String,
        message: String,
    },
}

impl HookResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, HookResult::Delivered(_))
    }

    /// Delivered notifications; empty for rejected results.
    pub fn notifications(&self) -> &[Notification] {
        match self {
            HookResult::Delivered(list) => list,
            HookResult::Rejected { .. } => &[],
        }
    }

    /// Label used for logs and metrics.
    pub fn outcome(&self) -> &str {
        match self {
            HookResult::Delivered(_) => "delivered",
            HookResult::Rejected { code, .. } => code,
        }
    }

    /// Renders the tree form returned to the host.
    pub fn to_entry(&self) -> Entry {
        match self {
            HookResult::Rejected {
                code,
                source,
                message,
            } => Entry::error("Cancel", code.as_str(), source.as_str(), message.as_str()),
            HookResult::Delivered(list) => {
                let messages = list
                    .iter()
                    .enumerate()
                    .map(|(idx, n)| {
                        Entry::folder(
                            (idx + 1).to_string(),
                            vec![
                                Entry::string("Channel", n.channel.as_str()),
                                Entry::string("Message", n.message.as_str()),
                            ],
                        )
                    })
                    .collect();
                Entry::folder("Result", vec![Entry::folder("Messages", messages)])
            }
        }
    }
}
