pub const SYNC_LOGGER_NAME: &str = "@analytics-sync/sync";

pub const DEFAULT_MEASUREMENT_ID: &str = "G-6XGH4BVL74";
pub const DEFAULT_GLOBAL_NAME: &str = "gtag";
pub const DEFAULT_EVENT_PREFIX: &str = "GA: ";
pub const DEFAULT_PROVENANCE: &str = "google_analytics";

pub const DEFAULT_CLIENT_ID_COOKIE: &str = "_ga";
pub const DEFAULT_AD_CLICK_COOKIE: &str = "_gcl_au";
pub const DEFAULT_COOKIE_PREFIXES: [&str; 2] = ["_ga", "_gcl"];

pub const DEFAULT_LOG_CAPACITY: usize = 10;
pub const DEFAULT_INSTALL_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 10_000;

/// Label of the event emitted for `config` calls that carry page fields.
pub const PAGE_VIEW_EVENT: &str = "Page View";
/// Page fields that turn a `config` call into a page view, in emission order.
pub const PAGE_FIELDS: [&str; 3] = ["page_path", "page_location", "page_title"];
/// Property attached to every forwarded event naming where it came from.
pub const PROVENANCE_KEY: &str = "source";
pub const USER_ID_KEY: &str = "user_id";

/// Placeholder shown by status views when an identifier cookie is missing.
pub const NOT_DETECTED: &str = "Not detected";

pub const DEFAULTS_ENV_VAR: &str = "__ANALYTICS_SYNC_DEFAULTS__";
pub const DEFAULTS_PATH_ENV_VAR: &str = "__ANALYTICS_SYNC_DEFAULTS_PATH";
