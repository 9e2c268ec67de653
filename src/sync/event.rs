use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::sync::error::{invalid_argument, SyncResult};

/// Which path produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Observed on the intercepted primary entry point.
    Primary,
    /// Sent straight to the secondary provider by application code.
    Secondary,
    /// A primary-origin event arriving at the secondary provider.
    Synced,
}

impl EventSource {
    pub fn as_str(self) -> &'static str {
        match self {
            EventSource::Primary => "primary",
            EventSource::Secondary => "secondary",
            EventSource::Synced => "synced",
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized event record, immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalEvent {
    name: String,
    source: EventSource,
    timestamp: DateTime<Utc>,
    properties: Map<String, Value>,
}

impl CanonicalEvent {
    pub fn new(
        name: impl Into<String>,
        source: EventSource,
        timestamp: DateTime<Utc>,
        properties: Map<String, Value>,
    ) -> SyncResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(invalid_argument("Event name must not be empty"));
        }
        Ok(Self {
            name,
            source,
            timestamp,
            properties,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> EventSource {
        self.source
    }

    /// Capture time, not delivery time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}
