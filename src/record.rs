//! The structured in-memory representation of one parsed syslog line.
//!
//! `Record` serialises to exactly one JSON object per line in the writer's
//! output files. Fields that the parser did not populate are omitted from
//! the serialised object entirely rather than appearing as `null`.

use serde::{Deserialize, Serialize};

/// The syslog header grammar a [`Record`] was recognised under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "RFC5424")]
    Rfc5424,
    #[serde(rename = "RFC3164")]
    Rfc3164,
}

/// A single parsed syslog record, ready for deduplication and persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl Record {
    /// The `message` field, or an empty string if the parser never set one.
    /// Used as the payload half of the dedup key.
    pub fn message_or_empty(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }

    /// The `priority` field, or `0` if absent (plain-fallback records,
    /// and records whose declared `PRI` overflowed `u64`, still need a
    /// dedup key component).
    pub fn priority_or_zero(&self) -> u64 {
        self.priority.unwrap_or(0)
    }

    /// The severity bucket name this record should be routed to, or
    /// `"unknown"` if unset or unrecognised. Used by the writer (§4.4).
    pub fn severity_or_unknown(&self) -> &str {
        self.severity.as_deref().unwrap_or("unknown")
    }
}
