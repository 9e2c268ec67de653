use js_sys::Reflect;
use wasm_bindgen::JsValue;
use web_sys::Window;

use crate::platform::browser::describe_js_error;
use crate::platform::environment::is_browser;
use crate::sync::context::{
    ConnectionInfo, DisplayInfo, Environment, NavigatorInfo, PageInfo, StorageKind, TimezoneInfo,
};
use crate::sync::error::{environment_error, SyncResult};

const STORAGE_PROBE_KEY: &str = "__analytics_sync_probe__";

/// [`Environment`] over the current `window`. Every read goes to the live browser objects, so
/// consecutive snapshots observe cookie rotation and resizes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserEnvironment;

impl BrowserEnvironment {
    pub fn new() -> Self {
        Self
    }

    fn window(&self) -> Option<Window> {
        web_sys::window()
    }
}

impl Environment for BrowserEnvironment {
    fn is_available(&self) -> bool {
        is_browser()
    }

    fn cookie_header(&self) -> Option<String> {
        let document = self.window()?.document()?;
        get(&document, "cookie")?.as_string()
    }

    fn display(&self) -> Option<DisplayInfo> {
        let window = self.window()?;
        let screen = window.screen().ok()?;
        let mut display = DisplayInfo {
            screen_width: non_negative(screen.width().ok()),
            screen_height: non_negative(screen.height().ok()),
            viewport_width: dimension(window.inner_width()),
            viewport_height: dimension(window.inner_height()),
            ..DisplayInfo::default()
        };
        let ratio = window.device_pixel_ratio();
        if ratio > 0.0 {
            display.pixel_ratio = ratio;
        }
        if let Some(depth) = screen.color_depth().ok().filter(|depth| *depth > 0) {
            display.color_depth = depth as u32;
        }
        Some(display)
    }

    fn navigator(&self) -> Option<NavigatorInfo> {
        let window = self.window()?;
        let navigator = window.navigator();
        let navigator_js = JsValue::from(navigator.clone());

        let max_touch_points = get(&navigator_js, "maxTouchPoints")
            .and_then(|value| value.as_f64())
            .map(|points| points.max(0.0) as u32)
            .unwrap_or(0);
        let touch_events = Reflect::has(&window, &JsValue::from_str("ontouchstart")).unwrap_or(false);

        Some(NavigatorInfo {
            user_agent: navigator.user_agent().unwrap_or_default(),
            language: navigator.language().unwrap_or_default(),
            languages: navigator
                .languages()
                .iter()
                .filter_map(|language| language.as_string())
                .collect(),
            platform: navigator.platform().unwrap_or_default(),
            vendor: get(&navigator_js, "vendor")
                .and_then(|value| value.as_string())
                .unwrap_or_default(),
            hardware_concurrency: navigator.hardware_concurrency().max(0.0) as u32,
            device_memory: get(&navigator_js, "deviceMemory").and_then(|value| value.as_f64()),
            max_touch_points,
            touch_support: touch_events || max_touch_points > 0,
            cookies_enabled: get(&navigator_js, "cookieEnabled")
                .and_then(|value| value.as_bool())
                .unwrap_or(false),
            online: navigator.on_line(),
        })
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        let navigator = JsValue::from(self.window()?.navigator());
        let connection = get(&navigator, "connection")?;
        Some(ConnectionInfo {
            effective_type: get(&connection, "effectiveType").and_then(|value| value.as_string()),
            downlink: get(&connection, "downlink").and_then(|value| value.as_f64()),
            rtt: get(&connection, "rtt").and_then(|value| value.as_f64()),
            save_data: get(&connection, "saveData").and_then(|value| value.as_bool()),
        })
    }

    fn page(&self) -> Option<PageInfo> {
        let window = self.window()?;
        let document = window.document();
        Some(PageInfo {
            url: window.location().href().unwrap_or_default(),
            title: document.as_ref().map(|doc| doc.title()).unwrap_or_default(),
            referrer: document.map(|doc| doc.referrer()).unwrap_or_default(),
        })
    }

    fn timezone(&self) -> Option<TimezoneInfo> {
        let format = js_sys::Intl::DateTimeFormat::new(&js_sys::Array::new(), &js_sys::Object::new());
        let name = get(&format.resolved_options(), "timeZone")
            .and_then(|value| value.as_string())
            .unwrap_or_default();
        Some(TimezoneInfo {
            name,
            offset_minutes: js_sys::Date::new_0().get_timezone_offset() as i32,
        })
    }

    fn probe_storage(&self, kind: StorageKind) -> SyncResult<()> {
        let window = self
            .window()
            .ok_or_else(|| environment_error("window is not available"))?;
        let storage = match kind {
            StorageKind::Local => window.local_storage(),
            StorageKind::Session => window.session_storage(),
        }
        .map_err(|err| environment_error(describe_js_error(&err)))?
        .ok_or_else(|| environment_error(format!("{kind:?} storage is not available")))?;

        storage
            .set_item(STORAGE_PROBE_KEY, STORAGE_PROBE_KEY)
            .and_then(|_| storage.remove_item(STORAGE_PROBE_KEY))
            .map_err(|err| environment_error(describe_js_error(&err)))
    }
}

fn get(target: &JsValue, property: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(property))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn dimension(value: Result<JsValue, JsValue>) -> u32 {
    value
        .ok()
        .and_then(|value| value.as_f64())
        .map(|value| value.max(0.0) as u32)
        .unwrap_or(0)
}

fn non_negative(value: Option<i32>) -> u32 {
    value.map(|value| value.max(0) as u32).unwrap_or(0)
}
