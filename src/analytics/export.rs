//! Export - downloadable JSON bundle of events and assignments

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::Event;
use crate::assignment::AssignmentMap;
use crate::Result;

/// Export bundle.
///
/// ```json
/// { "events": [...], "assignedVariants": {"exp": "variant"},
///   "exportDate": "2024-05-01T12:00:00.000Z", "userAgent": "..." }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    /// Event log
    pub events: Vec<Event>,
    /// Assignments as an object
    pub assigned_variants: Map<String, Value>,
    /// RFC 3339 timestamp with milliseconds
    pub export_date: String,
    /// Client descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ExportDocument {
    /// Assemble an export.
    #[must_use]
    pub fn new(
        events: Vec<Event>,
        assignments: &AssignmentMap,
        exported_at: DateTime<Utc>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            events,
            assigned_variants: assignments.to_object(),
            export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            user_agent,
        }
    }

    /// Pretty-printed JSON (2-space indent).
    ///
    /// # Errors
    /// Returns `Error::Serialization` if encoding fails
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export.
    ///
    /// # Errors
    /// Returns `Error::Serialization` for malformed input
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Download file name: `ab-test-analytics-YYYY-MM-DD.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let date = self
            .export_date
            .split_once('T')
            .map_or(self.export_date.as_str(), |(date, _)| date);
        format!("ab-test-analytics-{date}.json")
    }

    /// Write the export into `dir` under [`file_name`](Self::file_name).
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be written
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        std::fs::write(&path, self.to_json_pretty()?)?;
        info!(path = %path.display(), events = self.events.len(), "Analytics exported");
        Ok(path)
    }
}
