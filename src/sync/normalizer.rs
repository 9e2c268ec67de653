//! Maps classified primary calls onto canonical events and profile updates.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::sync::command::GtagCommand;
use crate::sync::config::SyncConfig;
use crate::sync::constants::{PAGE_FIELDS, PAGE_VIEW_EVENT, PROVENANCE_KEY, USER_ID_KEY};
use crate::sync::context::ContextSnapshot;
use crate::sync::error::SyncResult;
use crate::sync::event::{CanonicalEvent, EventSource};
use crate::sync::identifiers::{TrackingIdentifiers, IDENTIFIER_KEYS};

/// Prefix given to caller fields whose names collide with reserved keys.
const RENAMED_FIELD_PREFIX: &str = "gtag_";

/// Outcome of normalizing one primary call.
#[derive(Clone, Debug, PartialEq)]
pub enum Normalized {
    Track(CanonicalEvent),
    Profile(ProfileUpdate),
    Nothing,
}

/// Downstream profile work produced by a `set` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    /// Issued before the property update when the call names a user.
    pub identify: Option<String>,
    /// `None` when the call carried no fields.
    pub properties: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalizer {
    prefix: String,
    provenance: String,
}

impl Normalizer {
    pub fn new(prefix: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            provenance: provenance.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.event_prefix(), config.provenance())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn normalize(
        &self,
        command: GtagCommand,
        snapshot: &ContextSnapshot,
    ) -> SyncResult<Normalized> {
        Ok(match command {
            GtagCommand::Event { name, params } => {
                Normalized::Track(self.normalize_event(&name, params, snapshot)?)
            }
            GtagCommand::Config { params, .. } => match self.normalize_page_view(params, snapshot)? {
                Some(event) => Normalized::Track(event),
                None => Normalized::Nothing,
            },
            GtagCommand::Set { params, .. } => {
                match self.normalize_set(params, &snapshot.identifiers) {
                    Some(update) => Normalized::Profile(update),
                    None => Normalized::Nothing,
                }
            }
            GtagCommand::Unknown { .. } => Normalized::Nothing,
        })
    }

    /// `gtag('event', name, params)` becomes `<prefix><name>` with the snapshot underneath the
    /// caller's fields.
    pub fn normalize_event(
        &self,
        name: &str,
        params: Map<String, Value>,
        snapshot: &ContextSnapshot,
    ) -> SyncResult<CanonicalEvent> {
        CanonicalEvent::new(
            format!("{}{}", self.prefix, name),
            EventSource::Primary,
            snapshot.captured_at,
            self.merge(snapshot, params),
        )
    }

    /// `gtag('config', ...)` becomes a page view only when it names a page.
    pub fn normalize_page_view(
        &self,
        params: Map<String, Value>,
        snapshot: &ContextSnapshot,
    ) -> SyncResult<Option<CanonicalEvent>> {
        let has_page_field = PAGE_FIELDS
            .iter()
            .any(|field| params.get(*field).is_some_and(|value| !value.is_null()));
        if !has_page_field {
            return Ok(None);
        }

        // Page fields first, then the remaining config fields, so the emitted map reads the same
        // regardless of the caller's key order.
        let mut fields = Map::new();
        for field in PAGE_FIELDS {
            if let Some(value) = params.get(field) {
                fields.insert(field.to_string(), value.clone());
            }
        }
        for (key, value) in params {
            fields.entry(key).or_insert(value);
        }

        CanonicalEvent::new(
            PAGE_VIEW_EVENT,
            EventSource::Primary,
            snapshot.captured_at,
            self.merge(snapshot, fields),
        )
        .map(Some)
    }

    /// `gtag('set', params)` identifies the user (when `user_id` is present) and updates the
    /// profile with the fields plus the raw tracking cookies.
    pub fn normalize_set(
        &self,
        params: Map<String, Value>,
        identifiers: &TrackingIdentifiers,
    ) -> Option<ProfileUpdate> {
        let identify = params.get(USER_ID_KEY).and_then(|value| match value {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        });
        let properties = (!params.is_empty()).then(|| {
            let mut properties = params;
            properties.extend(identifiers.cookie_properties());
            properties
        });

        if identify.is_none() && properties.is_none() {
            return None;
        }
        Some(ProfileUpdate {
            identify,
            properties,
        })
    }

    /// Classifies an event seen on the secondary provider. Names carrying the sync prefix are
    /// treated as confirmations of forwarded events.
    pub fn classify_secondary(
        &self,
        name: &str,
        properties: Map<String, Value>,
        at: DateTime<Utc>,
    ) -> SyncResult<CanonicalEvent> {
        let source = if name.starts_with(&self.prefix) {
            EventSource::Synced
        } else {
            EventSource::Secondary
        };
        CanonicalEvent::new(name, source, at, properties)
    }

    fn merge(
        &self,
        snapshot: &ContextSnapshot,
        caller: Map<String, Value>,
    ) -> Map<String, Value> {
        let mut properties = snapshot.to_properties();
        for (key, value) in caller {
            if is_reserved(&key) {
                properties.insert(format!("{RENAMED_FIELD_PREFIX}{key}"), value);
            } else {
                properties.insert(key, value);
            }
        }
        properties.insert(
            PROVENANCE_KEY.to_string(),
            Value::String(self.provenance.clone()),
        );
        properties
    }
}

fn is_reserved(key: &str) -> bool {
    key == PROVENANCE_KEY || IDENTIFIER_KEYS.contains(&key)
}
