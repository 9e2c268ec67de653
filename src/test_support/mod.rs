//! Fakes shared by the crate's unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::sync::context::{
    ConnectionInfo, DisplayInfo, Environment, NavigatorInfo, PageInfo, StorageKind, TimezoneInfo,
};
use crate::sync::emitter::Downstream;
use crate::sync::error::{downstream_error, environment_error, SyncResult};
use crate::sync::interceptor::TrackingFn;

pub const BROWSER_COOKIES: &str = "_ga=GA1.2.111.222; _ga_6XGH4BVL74=GS1.1.1700000000.1.1.1700000100.0.0.0; _gcl_au=1.1.12345.67890; theme=dark";

/// Scriptable [`Environment`]. Clones share the cookie jar, so tests can rotate cookies under a
/// bridge that already holds the environment.
#[derive(Clone, Debug)]
pub struct FakeEnvironment {
    available: bool,
    cookies: Rc<RefCell<Option<String>>>,
    display: Option<DisplayInfo>,
    navigator: Option<NavigatorInfo>,
    connection: Option<ConnectionInfo>,
    page: Option<PageInfo>,
    timezone: Option<TimezoneInfo>,
    local_storage: bool,
    session_storage: bool,
}

impl FakeEnvironment {
    /// A desktop Chrome visiting a pricing page, with session storage disabled.
    pub fn browser() -> Self {
        Self {
            available: true,
            cookies: Rc::new(RefCell::new(Some(BROWSER_COOKIES.to_string()))),
            display: Some(DisplayInfo {
                screen_width: 1920,
                screen_height: 1080,
                viewport_width: 1440,
                viewport_height: 900,
                pixel_ratio: 2.0,
                color_depth: 24,
            }),
            navigator: Some(NavigatorInfo {
                user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".into(),
                language: "en-US".into(),
                languages: vec!["en-US".into(), "en".into()],
                platform: "MacIntel".into(),
                vendor: "Google Inc.".into(),
                hardware_concurrency: 8,
                device_memory: Some(8.0),
                max_touch_points: 0,
                touch_support: false,
                cookies_enabled: true,
                online: true,
            }),
            connection: Some(ConnectionInfo {
                effective_type: Some("4g".into()),
                downlink: Some(10.0),
                rtt: Some(50.0),
                save_data: Some(false),
            }),
            page: Some(PageInfo {
                url: "https://shop.example.com:8443/pricing?plan=pro#faq".into(),
                title: "Pricing".into(),
                referrer: "https://www.google.com/".into(),
            }),
            timezone: Some(TimezoneInfo {
                name: "Europe/Berlin".into(),
                offset_minutes: -60,
            }),
            local_storage: true,
            session_storage: false,
        }
    }

    pub fn without_connection(mut self) -> Self {
        self.connection = None;
        self
    }

    pub fn with_storage_blocked(mut self) -> Self {
        self.local_storage = false;
        self.session_storage = false;
        self
    }

    pub fn set_cookie_header(&self, header: &str) {
        *self.cookies.borrow_mut() = Some(header.to_string());
    }
}

impl Environment for FakeEnvironment {
    fn is_available(&self) -> bool {
        self.available
    }

    fn cookie_header(&self) -> Option<String> {
        self.cookies.borrow().clone()
    }

    fn display(&self) -> Option<DisplayInfo> {
        self.display.clone()
    }

    fn navigator(&self) -> Option<NavigatorInfo> {
        self.navigator.clone()
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        self.connection.clone()
    }

    fn page(&self) -> Option<PageInfo> {
        self.page.clone()
    }

    fn timezone(&self) -> Option<TimezoneInfo> {
        self.timezone.clone()
    }

    fn probe_storage(&self, kind: StorageKind) -> SyncResult<()> {
        let allowed = match kind {
            StorageKind::Local => self.local_storage,
            StorageKind::Session => self.session_storage,
        };
        if allowed {
            Ok(())
        } else {
            Err(environment_error(format!("{kind:?} storage is blocked")))
        }
    }
}

/// One call received by a [`RecordingDownstream`].
#[derive(Clone, Debug, PartialEq)]
pub enum DownstreamCall {
    Track(String, Map<String, Value>),
    Identify(String),
    SetProfile(Map<String, Value>),
    Register(Map<String, Value>),
}

/// Downstream that remembers every call. A failing recorder rejects everything.
#[derive(Clone, Debug, Default)]
pub struct RecordingDownstream {
    calls: Rc<RefCell<Vec<DownstreamCall>>>,
    failing: bool,
    distinct_id: Option<String>,
}

impl RecordingDownstream {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_distinct_id(mut self, distinct_id: &str) -> Self {
        self.distinct_id = Some(distinct_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DownstreamCall> {
        self.calls.borrow().clone()
    }

    pub fn tracked_names(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                DownstreamCall::Track(name, _) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: DownstreamCall) -> SyncResult<()> {
        if self.failing {
            return Err(downstream_error("provider rejected the call"));
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl Downstream for RecordingDownstream {
    fn track(&self, name: &str, properties: &Map<String, Value>) -> SyncResult<()> {
        self.push(DownstreamCall::Track(name.to_string(), properties.clone()))
    }

    fn identify(&self, user_id: &str) -> SyncResult<()> {
        self.push(DownstreamCall::Identify(user_id.to_string()))
    }

    fn set_profile(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        self.push(DownstreamCall::SetProfile(properties.clone()))
    }

    fn register(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        self.push(DownstreamCall::Register(properties.clone()))
    }

    fn distinct_id(&self) -> Option<String> {
        self.distinct_id.clone()
    }
}

/// A stand-in for the page's own tracking function that records every argument list it sees.
pub fn recording_original() -> (TrackingFn, Rc<RefCell<Vec<Vec<Value>>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&calls);
    let original: TrackingFn = Arc::new(move |args: &[Value]| -> SyncResult<()> {
        seen.borrow_mut().push(args.to_vec());
        Ok(())
    });
    (original, calls)
}
