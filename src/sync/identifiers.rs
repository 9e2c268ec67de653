//! First-party tracking identifiers recovered from the cookie header.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::sync::config::SyncConfig;

/// Which cookies hold which identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifierRules {
    pub client_id_cookie: String,
    pub session_cookie: String,
    pub ad_click_cookie: String,
    pub prefixes: Vec<String>,
}

impl IdentifierRules {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            client_id_cookie: config.client_id_cookie().to_string(),
            session_cookie: config.session_cookie(),
            ad_click_cookie: config.ad_click_cookie().to_string(),
            prefixes: config.cookie_prefixes().to_vec(),
        }
    }
}

impl Default for IdentifierRules {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Identifiers read from one cookie header. Never cached: cookies rotate between calls, so
/// callers extract a fresh value every time they enrich an event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TrackingIdentifiers {
    pub client_id: Option<String>,
    /// Raw value of the client-id cookie, version markers included.
    pub client_cookie: Option<String>,
    pub session_id: Option<String>,
    pub ad_click_id: Option<String>,
    pub raw_cookie_set: BTreeMap<String, String>,
}

impl TrackingIdentifiers {
    pub fn extract(cookie_header: &str, rules: &IdentifierRules) -> Self {
        let cookies = parse_cookie_header(cookie_header);
        let client_cookie = non_empty(cookies.get(&rules.client_id_cookie));
        let client_id = client_cookie.as_deref().and_then(client_id_from_cookie);
        let raw_cookie_set = cookies
            .iter()
            .filter(|(name, _)| {
                rules
                    .prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Self {
            client_id,
            client_cookie,
            session_id: non_empty(cookies.get(&rules.session_cookie)),
            ad_click_id: non_empty(cookies.get(&rules.ad_click_cookie)),
            raw_cookie_set,
        }
    }

    /// The identifier fields as event properties. These keys are reserved: the context snapshot
    /// always overwrites caller-supplied values for them.
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        properties.insert("ga_client_id".into(), optional(&self.client_id));
        properties.insert("ga_cookie".into(), optional(&self.client_cookie));
        properties.insert("ga_session_id".into(), optional(&self.session_id));
        properties.insert("gclid".into(), optional(&self.ad_click_id));
        properties.insert("ga_cookies".into(), Value::Object(self.cookie_properties()));
        properties
    }

    /// The raw cookie set flattened into properties (`_ga`, `_gcl_au`, ...).
    pub fn cookie_properties(&self) -> Map<String, Value> {
        self.raw_cookie_set
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect()
    }
}

/// Keys produced by [`TrackingIdentifiers::to_properties`].
pub const IDENTIFIER_KEYS: [&str; 5] =
    ["ga_client_id", "ga_cookie", "ga_session_id", "gclid", "ga_cookies"];

/// Splits a `key=value; key=value` header into a map. Entries without `=` map to an empty value
/// and later duplicates replace earlier ones.
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, value)) => (name.trim().to_string(), value.trim().to_string()),
            None => {
                log::debug!("cookie entry `{entry}` has no value");
                (entry.to_string(), String::new())
            }
        })
        .collect()
}

/// `GA1.2.111.222` becomes `111.222`: the first two segments are version and domain-depth
/// markers.
pub fn client_id_from_cookie(value: &str) -> Option<String> {
    let client_id = value.split('.').skip(2).collect::<Vec<_>>().join(".");
    (!client_id.is_empty()).then_some(client_id)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|value| !value.is_empty()).cloned()
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "_ga=GA1.2.111.222; theme=dark; _ga_6XGH4BVL74=GS1.1.1700000000.1.0; \
                          _gcl_au=1.1.987.654; other=1";

    #[test]
    fn extracts_all_identifiers() {
        let ids = TrackingIdentifiers::extract(HEADER, &IdentifierRules::default());
        assert_eq!(ids.client_id.as_deref(), Some("111.222"));
        assert_eq!(ids.client_cookie.as_deref(), Some("GA1.2.111.222"));
        assert_eq!(ids.session_id.as_deref(), Some("GS1.1.1700000000.1.0"));
        assert_eq!(ids.ad_click_id.as_deref(), Some("1.1.987.654"));
        assert_eq!(
            ids.raw_cookie_set.keys().collect::<Vec<_>>(),
            ["_ga", "_ga_6XGH4BVL74", "_gcl_au"]
        );
    }

    #[test]
    fn missing_client_cookie_yields_none() {
        for header in ["", "theme=dark", ";;", "_gax=GA1.2.3.4", "_ga"] {
            let ids = TrackingIdentifiers::extract(header, &IdentifierRules::default());
            assert_eq!(ids.client_id, None, "header {header:?}");
        }
    }

    #[test]
    fn malformed_entries_do_not_fail() {
        let cookies = parse_cookie_header("flag; a=1=2; =orphan; b=");
        assert_eq!(cookies.get("flag").map(String::as_str), Some(""));
        assert_eq!(cookies.get("a").map(String::as_str), Some("1=2"));
        assert_eq!(cookies.get("").map(String::as_str), Some("orphan"));
        assert_eq!(cookies.get("b").map(String::as_str), Some(""));
    }

    #[test]
    fn last_duplicate_wins() {
        let ids = TrackingIdentifiers::extract(
            "_ga=GA1.1.1.1; _ga=GA1.2.333.444",
            &IdentifierRules::default(),
        );
        assert_eq!(ids.client_id.as_deref(), Some("333.444"));
    }

    #[test]
    fn short_client_cookie_has_no_id() {
        assert_eq!(client_id_from_cookie("GA1.2"), None);
        assert_eq!(client_id_from_cookie("GA1.2.111.222").as_deref(), Some("111.222"));
    }

    #[test]
    fn properties_use_null_for_missing_ids() {
        let ids = TrackingIdentifiers::extract("_gcl_au=abc", &IdentifierRules::default());
        let properties = ids.to_properties();
        assert_eq!(properties["ga_client_id"], Value::Null);
        assert_eq!(properties["gclid"], Value::String("abc".into()));
        assert_eq!(properties["ga_cookies"]["_gcl_au"], Value::String("abc".into()));
    }
}
