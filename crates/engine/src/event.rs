// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change event intake types
//!
//! Events arrive from the notification transport as JSON, one batch per
//! message. Field names are accepted in snake_case and camelCase;
//! modification times travel as integer microseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One changed file as reported by the notification backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the observed root.
    pub name: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(
        default,
        rename = "mtime_us",
        alias = "mtimeUs",
        with = "mtime_us",
        skip_serializing_if = "Option::is_none"
    )]
    pub mtime: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cclock: Option<String>,
}

/// A change event addressed to one handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(alias = "handlerName")]
    pub handler_name: String,

    #[serde(alias = "rootDir")]
    pub root_dir: PathBuf,

    pub change: FileChange,
}

/// Parse one intake message: either a JSON array of events or a single
/// event object.
pub fn parse_batch(text: &str) -> Result<Vec<ChangeEvent>, serde_json::Error> {
    let trimmed = text.trim_start();

    if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
    } else {
        serde_json::from_str::<ChangeEvent>(trimmed).map(|event| vec![event])
    }
}

mod mtime_us {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_i64(ts.timestamp_micros()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = Option::<i64>::deserialize(deserializer)?;

        match micros {
            None => Ok(None),
            Some(us) => DateTime::<Utc>::from_timestamp_micros(us)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("mtime out of range: {us}"))),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
