use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::platform::environment::sync_defaults;
use crate::sync::constants::{
    DEFAULT_AD_CLICK_COOKIE, DEFAULT_CLIENT_ID_COOKIE, DEFAULT_COOKIE_PREFIXES,
    DEFAULT_EVENT_PREFIX, DEFAULT_GLOBAL_NAME, DEFAULT_INSTALL_RETRY_DELAY_MS,
    DEFAULT_LOG_CAPACITY, DEFAULT_MEASUREMENT_ID, DEFAULT_PROVENANCE,
    DEFAULT_REFRESH_INTERVAL_MS,
};
use crate::sync::error::{invalid_argument, SyncResult};

/// Settings for a [`SyncBridge`](crate::sync::SyncBridge).
///
/// Every field has a default, so deserializing `{}` yields [`SyncConfig::default`]. Durations are
/// expressed in milliseconds when read from JSON.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    measurement_id: String,
    global_name: String,
    event_prefix: String,
    provenance: String,
    client_id_cookie: String,
    session_cookie: Option<String>,
    ad_click_cookie: String,
    cookie_prefixes: Vec<String>,
    log_capacity: usize,
    install_retry_delay_ms: u64,
    refresh_interval_ms: u64,
    identify_profile_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            measurement_id: DEFAULT_MEASUREMENT_ID.to_string(),
            global_name: DEFAULT_GLOBAL_NAME.to_string(),
            event_prefix: DEFAULT_EVENT_PREFIX.to_string(),
            provenance: DEFAULT_PROVENANCE.to_string(),
            client_id_cookie: DEFAULT_CLIENT_ID_COOKIE.to_string(),
            session_cookie: None,
            ad_click_cookie: DEFAULT_AD_CLICK_COOKIE.to_string(),
            cookie_prefixes: DEFAULT_COOKIE_PREFIXES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            install_retry_delay_ms: DEFAULT_INSTALL_RETRY_DELAY_MS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            identify_profile_on_start: true,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from the defaults published by the host, falling back to the
    /// built-in values for anything the host leaves out.
    ///
    /// Sources are checked in order: the `__ANALYTICS_SYNC_DEFAULTS__` environment variable, the
    /// file named by `__ANALYTICS_SYNC_DEFAULTS_PATH`, and on wasm the
    /// `__ANALYTICS_SYNC_DEFAULTS__` global.
    pub fn from_defaults() -> Self {
        Self::from_published(sync_defaults())
    }

    fn from_published(value: Option<Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        match Self::from_json(value) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring sync defaults: {err}");
                Self::default()
            }
        }
    }

    pub fn from_json(value: Value) -> SyncResult<Self> {
        let config: SyncConfig = serde_json::from_value(value)
            .map_err(|err| invalid_argument(format!("malformed sync configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_measurement_id(mut self, measurement_id: impl Into<String>) -> Self {
        self.measurement_id = measurement_id.into();
        self
    }

    pub fn with_global_name(mut self, global_name: impl Into<String>) -> Self {
        self.global_name = global_name.into();
        self
    }

    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    pub fn with_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.session_cookie = Some(name.into());
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_install_retry_delay(mut self, delay: Duration) -> Self {
        self.install_retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_profile_on_start(mut self, enabled: bool) -> Self {
        self.identify_profile_on_start = enabled;
        self
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.global_name.trim().is_empty() {
            return Err(invalid_argument("global_name must not be empty"));
        }
        if self.event_prefix.is_empty() {
            return Err(invalid_argument("event_prefix must not be empty"));
        }
        if self.provenance.trim().is_empty() {
            return Err(invalid_argument("provenance must not be empty"));
        }
        if self.log_capacity == 0 {
            return Err(invalid_argument("log_capacity must be at least 1"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(invalid_argument("refresh_interval must be positive"));
        }
        Ok(())
    }

    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    pub fn global_name(&self) -> &str {
        &self.global_name
    }

    pub fn event_prefix(&self) -> &str {
        &self.event_prefix
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    pub fn client_id_cookie(&self) -> &str {
        &self.client_id_cookie
    }

    /// Name of the GA4 session cookie: the explicit override, or `_ga_` followed by the
    /// measurement id without its `G-` marker.
    pub fn session_cookie(&self) -> String {
        match &self.session_cookie {
            Some(name) => name.clone(),
            None => {
                let stream = self
                    .measurement_id
                    .strip_prefix("G-")
                    .unwrap_or(&self.measurement_id);
                format!("_ga_{stream}")
            }
        }
    }

    pub fn ad_click_cookie(&self) -> &str {
        &self.ad_click_cookie
    }

    pub fn cookie_prefixes(&self) -> &[String] {
        &self.cookie_prefixes
    }

    pub fn log_capacity(&self) -> usize {
        self.log_capacity
    }

    pub fn install_retry_delay(&self) -> Duration {
        Duration::from_millis(self.install_retry_delay_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn profile_on_start(&self) -> bool {
        self.identify_profile_on_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CapturedWarnings(Mutex<Vec<String>>);

    impl log::Log for CapturedWarnings {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                self.0.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static WARNINGS: CapturedWarnings = CapturedWarnings(Mutex::new(Vec::new()));

    fn warnings() -> Vec<String> {
        let _ = log::set_logger(&WARNINGS);
        log::set_max_level(log::LevelFilter::Warn);
        WARNINGS.0.lock().unwrap().clone()
    }

    #[test]
    fn session_cookie_derives_from_measurement_id() {
        let config = SyncConfig::new().with_measurement_id("G-ABC123");
        assert_eq!(config.session_cookie(), "_ga_ABC123");

        let config = config.with_session_cookie("_custom_session");
        assert_eq!(config.session_cookie(), "_custom_session");
    }

    #[test]
    fn json_overrides_only_named_fields() {
        let config = SyncConfig::from_json(json!({
            "event_prefix": "UA: ",
            "refresh_interval_ms": 2000
        }))
        .unwrap();
        assert_eq!(config.event_prefix(), "UA: ");
        assert_eq!(config.refresh_interval(), Duration::from_secs(2));
        assert_eq!(config.global_name(), "gtag");
        assert_eq!(config.log_capacity(), 10);
        assert_eq!(config.install_retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let err = SyncConfig::new().with_log_capacity(0).validate().unwrap_err();
        assert_eq!(err.code_str(), "sync/invalid-argument");

        let err = SyncConfig::from_json(json!({ "global_name": " " })).unwrap_err();
        assert_eq!(err.code_str(), "sync/invalid-argument");

        assert!(SyncConfig::from_json(json!({ "log_capacity": "ten" })).is_err());
    }

    #[test]
    fn invalid_host_defaults_fall_back_with_a_warning() {
        warnings();
        let config = SyncConfig::from_published(Some(json!({
            "log_capacity": 0,
            "event_prefix": "UA: "
        })));

        assert_eq!(config, SyncConfig::default());
        assert!(warnings()
            .iter()
            .any(|warning| warning.contains("log_capacity must be at least 1")));
    }

    #[test]
    fn malformed_host_defaults_fall_back_with_a_warning() {
        warnings();
        let config = SyncConfig::from_published(Some(json!({ "refresh_interval_ms": "soon" })));

        assert_eq!(config, SyncConfig::default());
        assert!(warnings()
            .iter()
            .any(|warning| warning.contains("malformed sync configuration")));
        assert_eq!(SyncConfig::from_published(None), SyncConfig::default());
    }
}
