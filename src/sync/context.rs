//! Point-in-time capture of the device, page and tracking identifiers.
//!
//! The browser is reached only through the [`Environment`] capability, so snapshots are pure
//! functions of what the environment reports (plus the clock and a random correlation id).

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use crate::sync::error::SyncResult;
use crate::sync::identifiers::{IdentifierRules, TrackingIdentifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Session,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayInfo {
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub pixel_ratio: f64,
    pub color_depth: u32,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            screen_width: 0,
            screen_height: 0,
            viewport_width: 0,
            viewport_height: 0,
            pixel_ratio: 1.0,
            color_depth: 24,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NavigatorInfo {
    pub user_agent: String,
    pub language: String,
    pub languages: Vec<String>,
    pub platform: String,
    pub vendor: String,
    pub hardware_concurrency: u32,
    pub device_memory: Option<f64>,
    pub max_touch_points: u32,
    pub touch_support: bool,
    pub cookies_enabled: bool,
    pub online: bool,
}

/// Network Information API hints. Each member is optional because browsers expose different
/// subsets of the API.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    pub rtt: Option<f64>,
    pub save_data: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
    pub referrer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimezoneInfo {
    pub name: String,
    /// Minutes to add to local time to reach UTC (`Date#getTimezoneOffset` convention).
    pub offset_minutes: i32,
}

/// Read-only view of the host environment.
///
/// Every accessor is optional: a missing API yields `None` and the snapshot falls back to a
/// default for the affected fields.
pub trait Environment {
    /// `false` when no browser is present at all (server-side rendering, native hosts).
    fn is_available(&self) -> bool;

    fn cookie_header(&self) -> Option<String>;

    fn display(&self) -> Option<DisplayInfo>;

    fn navigator(&self) -> Option<NavigatorInfo>;

    fn connection(&self) -> Option<ConnectionInfo>;

    fn page(&self) -> Option<PageInfo>;

    fn timezone(&self) -> Option<TimezoneInfo>;

    /// Attempts to touch the given storage area. Any failure (including privacy modes that throw
    /// on access) means the storage is unavailable.
    fn probe_storage(&self, kind: StorageKind) -> SyncResult<()>;

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Environment used where no browser exists; every snapshot taken from it is the default one.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetachedEnvironment;

impl Environment for DetachedEnvironment {
    fn is_available(&self) -> bool {
        false
    }

    fn cookie_header(&self) -> Option<String> {
        None
    }

    fn display(&self) -> Option<DisplayInfo> {
        None
    }

    fn navigator(&self) -> Option<NavigatorInfo> {
        None
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        None
    }

    fn page(&self) -> Option<PageInfo> {
        None
    }

    fn timezone(&self) -> Option<TimezoneInfo> {
        None
    }

    fn probe_storage(&self, _kind: StorageKind) -> SyncResult<()> {
        Err(crate::sync::error::environment_error(
            "storage is not available outside a browser",
        ))
    }
}

/// URL components in the shape of `window.location`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageLocation {
    pub url: String,
    pub path: String,
    pub search: String,
    pub hash: String,
    pub host: String,
    pub protocol: String,
}

impl PageLocation {
    pub fn parse(href: &str) -> Self {
        let Ok(url) = Url::parse(href) else {
            log::debug!("page url `{href}` is not absolute; keeping it verbatim");
            return Self {
                url: href.to_string(),
                ..Default::default()
            };
        };

        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        Self {
            url: href.to_string(),
            path: url.path().to_string(),
            search: prefixed('?', url.query()),
            hash: prefixed('#', url.fragment()),
            host,
            protocol: format!("{}:", url.scheme()),
        }
    }
}

fn prefixed(marker: char, part: Option<&str>) -> String {
    match part {
        Some(part) if !part.is_empty() => format!("{marker}{part}"),
        _ => String::new(),
    }
}

/// Immutable capture of environment facts. Each call to [`ContextSnapshot::capture`] yields an
/// independent value.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextSnapshot {
    pub identifiers: TrackingIdentifiers,
    pub measurement_id: String,
    pub display: DisplayInfo,
    pub navigator: NavigatorInfo,
    pub connection: ConnectionInfo,
    pub timezone: TimezoneInfo,
    pub captured_at: DateTime<Utc>,
    pub location: PageLocation,
    pub page_title: String,
    pub referrer: String,
    pub local_storage_available: bool,
    pub session_storage_available: bool,
    pub random_id: u32,
}

impl ContextSnapshot {
    pub fn capture(
        env: &dyn Environment,
        rules: &IdentifierRules,
        measurement_id: &str,
    ) -> Self {
        if !env.is_available() {
            return Self::detached(measurement_id, env.now());
        }

        let identifiers = env
            .cookie_header()
            .map(|header| TrackingIdentifiers::extract(&header, rules))
            .unwrap_or_default();
        let page = env.page().unwrap_or_default();

        Self {
            identifiers,
            measurement_id: measurement_id.to_string(),
            display: env.display().unwrap_or_default(),
            navigator: env.navigator().unwrap_or_default(),
            connection: env.connection().unwrap_or_default(),
            timezone: env.timezone().unwrap_or_default(),
            captured_at: env.now(),
            location: PageLocation::parse(&page.url),
            page_title: page.title,
            referrer: page.referrer,
            local_storage_available: env.probe_storage(StorageKind::Local).is_ok(),
            session_storage_available: env.probe_storage(StorageKind::Session).is_ok(),
            random_id: rand::thread_rng().gen_range(0..i32::MAX as u32),
        }
    }

    /// The fully populated default snapshot used when no browser is present.
    pub fn detached(measurement_id: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            identifiers: TrackingIdentifiers::default(),
            measurement_id: measurement_id.to_string(),
            display: DisplayInfo::default(),
            navigator: NavigatorInfo::default(),
            connection: ConnectionInfo::default(),
            timezone: TimezoneInfo::default(),
            captured_at,
            location: PageLocation::default(),
            page_title: String::new(),
            referrer: String::new(),
            local_storage_available: false,
            session_storage_available: false,
            random_id: 0,
        }
    }

    /// Flat property map registered as standing properties and merged into forwarded events.
    pub fn to_properties(&self) -> Map<String, Value> {
        let mut props = self.identifiers.to_properties();
        let mut put = |key: &str, value: Value| {
            props.insert(key.to_string(), value);
        };

        put("ga_measurement_id", self.measurement_id.clone().into());

        put("screen_width", self.display.screen_width.into());
        put("screen_height", self.display.screen_height.into());
        put("viewport_width", self.display.viewport_width.into());
        put("viewport_height", self.display.viewport_height.into());
        put("pixel_ratio", number(Some(self.display.pixel_ratio)));
        put("color_depth", self.display.color_depth.into());

        let nav = &self.navigator;
        put("user_agent", nav.user_agent.clone().into());
        put("language", nav.language.clone().into());
        put("languages", nav.languages.join(",").into());
        put("platform", nav.platform.clone().into());
        put("vendor", nav.vendor.clone().into());

        put(
            "connection_type",
            self.connection
                .effective_type
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        put("connection_downlink", number(self.connection.downlink));
        put("connection_rtt", number(self.connection.rtt));
        put(
            "connection_save_data",
            self.connection.save_data.map(Value::Bool).unwrap_or(Value::Null),
        );
        put("device_memory", number(nav.device_memory));
        put("hardware_concurrency", nav.hardware_concurrency.into());

        put("timezone", self.timezone.name.clone().into());
        put("timezone_offset", self.timezone.offset_minutes.into());
        put("timestamp", self.captured_at.timestamp_millis().into());

        put("page_url", self.location.url.clone().into());
        put("page_path", self.location.path.clone().into());
        put("page_search", self.location.search.clone().into());
        put("page_hash", self.location.hash.clone().into());
        put("page_host", self.location.host.clone().into());
        put("page_protocol", self.location.protocol.clone().into());
        put("page_title", self.page_title.clone().into());
        put("referrer", self.referrer.clone().into());

        put("touch_support", nav.touch_support.into());
        put("max_touch_points", nav.max_touch_points.into());
        put("cookies_enabled", nav.cookies_enabled.into());
        put("local_storage_available", self.local_storage_available.into());
        put("session_storage_available", self.session_storage_available.into());
        put("online", nav.online.into());
        put("random_id", self.random_id.into());
        props
    }

    /// Profile fields written once per session.
    pub fn profile_properties(&self) -> Map<String, Value> {
        let mut profile = Map::new();
        profile.insert("$browser".into(), self.navigator.user_agent.clone().into());
        profile.insert(
            "$browser_language".into(),
            self.navigator.language.clone().into(),
        );
        profile.insert("$screen_height".into(), self.display.screen_height.into());
        profile.insert("$screen_width".into(), self.display.screen_width.into());
        profile.insert("$timezone".into(), self.timezone.name.clone().into());
        profile.insert(
            "ga_client_id".into(),
            self.identifiers
                .client_id
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        profile.insert("ga_measurement_id".into(), self.measurement_id.clone().into());
        profile.insert("last_seen".into(), self.captured_at.to_rfc3339().into());
        profile
    }

    /// Compact, human-oriented summary for status displays.
    pub fn session_summary(&self) -> SessionSummary {
        let agent_tokens: Vec<&str> = self.navigator.user_agent.split(' ').collect();
        let browser = agent_tokens[agent_tokens.len().saturating_sub(2)..].join(" ");
        SessionSummary {
            screen: format!(
                "{}x{}",
                self.display.screen_width, self.display.screen_height
            ),
            viewport: format!(
                "{}x{}",
                self.display.viewport_width, self.display.viewport_height
            ),
            browser,
            language: self.navigator.language.clone(),
            timezone: self.timezone.name.clone(),
            platform: self.navigator.platform.clone(),
            online: self.navigator.online,
            cookie_enabled: self.navigator.cookies_enabled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub screen: String,
    pub viewport: String,
    pub browser: String,
    pub language: String,
    pub timezone: String,
    pub platform: String,
    pub online: bool,
    pub cookie_enabled: bool,
}

fn number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
