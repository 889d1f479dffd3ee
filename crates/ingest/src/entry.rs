//! Generic folder tree exchanged with the surrounding host runtime.
//!
//! The listener in front of hookrelay hands every inbound hook over as a tree
//! of named entries and expects a tree back. Three entry kinds exist:
//!
//! ```text
//! Entry
//! ├── String { name, value }
//! ├── Folder { name, children: Vec<Entry> }
//! └── Error  { name, code, source, message }
//! ```
//!
//! On the wire every entry is a JSON object tagged by `Type`:
//!
//! ```json
//! {"Type": "Folder", "Name": "Hook", "Children": [
//!   {"Type": "String", "Name": "Hook ID", "StringValue": "abc"}
//! ]}
//! ```
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// One node of the host's folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Entry {
    /// Leaf holding a string value.
    String {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "StringValue", default)]
        value: String,
    },
    /// Named, ordered list of child entries.
    Folder {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Children", default)]
        children: Vec<Entry>,
    },
    /// Structured error returned in place of a result.
    Error {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Code")]
        code: String,
        #[serde(rename = "Source")]
        source: String,
        #[serde(rename = "Message")]
        message: String,
    },
}

impl Entry {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Entry::String {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn folder(name: impl Into<String>, children: Vec<Entry>) -> Self {
        Entry::Folder {
            name: name.into(),
            children,
        }
    }

    pub fn error(
        name: impl Into<String>,
        code: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Entry::Error {
            name: name.into(),
            code: code.into(),
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::String { name, .. } | Entry::Folder { name, .. } | Entry::Error { name, .. } => {
                name
            }
        }
    }

    /// Short type label used in validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Entry::String { .. } => "String",
            Entry::Folder { .. } => "Folder",
            Entry::Error { .. } => "Error",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Entry::String { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Children of a folder; empty for leaves.
    pub fn children(&self) -> &[Entry] {
        match self {
            Entry::Folder { children, .. } => children,
            _ => &[],
        }
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&Entry> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Looks up a string child, failing when it is required but absent or
    /// when the entry at that name is not a string.
    pub fn string_child(&self, name: &str, required: bool) -> Result<Option<&str>, IngestError> {
        match self.child(name) {
            Some(Entry::String { value, .. }) => Ok(Some(value)),
            Some(other) => Err(IngestError::WrongEntryType {
                field: name.to_string(),
                expected: "String",
                found: other.kind(),
            }),
            None if required => Err(IngestError::MissingField(name.to_string())),
            None => Ok(None),
        }
    }

    /// Looks up a required folder child.
    pub fn folder_child(&self, name: &str) -> Result<&Entry, IngestError> {
        match self.child(name) {
            Some(entry @ Entry::Folder { .. }) => Ok(entry),
            Some(other) => Err(IngestError::WrongEntryType {
                field: name.to_string(),
                expected: "Folder",
                found: other.kind(),
            }),
            None => Err(IngestError::MissingField(name.to_string())),
        }
    }

    /// Flattens a folder into `(name, value)` pairs in child order.
    /// Non-string children map to an empty value.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.children()
            .iter()
            .map(|c| (c.name().to_string(), c.as_str().unwrap_or_default().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry::folder(
            "Hook",
            vec![
                Entry::string("Hook ID", "abc"),
                Entry::folder("Headers", vec![Entry::string("User-Agent", "curl")]),
            ],
        )
    }

    #[test]
    fn string_child_lookup() {
        let hook = sample();
        assert_eq!(hook.string_child("Hook ID", true).unwrap(), Some("abc"));
        assert_eq!(hook.string_child("Source IP", false).unwrap(), None);
    }

    #[test]
    fn missing_required_child_is_reported_by_name() {
        let err = sample().string_child("Hook flavor", true).unwrap_err();
        assert_eq!(err, IngestError::MissingField("Hook flavor".into()));
    }

    #[test]
    fn wrong_entry_type_detected() {
        let err = sample().string_child("Headers", true).unwrap_err();
        assert!(matches!(
            err,
            IngestError::WrongEntryType { expected: "String", found: "Folder", .. }
        ));
        assert!(sample().folder_child("Hook ID").is_err());
    }

    #[test]
    fn non_string_children_flatten_to_empty_values() {
        let folder = Entry::folder(
            "Parameters",
            vec![
                Entry::string("channel", "#ops"),
                Entry::folder("nested", vec![]),
            ],
        );
        assert_eq!(
            folder.to_pairs(),
            vec![
                ("channel".to_string(), "#ops".to_string()),
                ("nested".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn wire_format_uses_type_tag() {
        let json = serde_json::to_value(Entry::error("Cancel", "hook-malformed", "hookrelay", "bad"))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Type": "Error",
                "Name": "Cancel",
                "Code": "hook-malformed",
                "Source": "hookrelay",
                "Message": "bad",
            })
        );

        let parsed: Entry = serde_json::from_str(
            r#"{"Type":"Folder","Name":"x","Children":[{"Type":"String","Name":"a","StringValue":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.string_child("a", true).unwrap(), Some("b"));
    }
}
