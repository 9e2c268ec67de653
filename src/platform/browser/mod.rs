//! Browser bindings for the sync bridge: the environment capability over `web-sys`, slots for
//! `window.gtag` and the client's `track`, and a downstream over a Mixpanel JS client.

mod environment;
mod mixpanel;
mod slot;

use std::sync::Arc;

use wasm_bindgen::{JsCast, JsValue};

pub use environment::BrowserEnvironment;
pub use mixpanel::MixpanelClient;
pub use slot::WindowSlot;

use crate::platform::runtime::TimerScheduler;
use crate::sync::{SyncBridge, SyncConfig, SyncResult, SyncSession};

/// Starts syncing `window[config.global_name]` into the given Mixpanel client using the browser's
/// timers. The client's own `track` is wrapped as well, so events the page sends to Mixpanel
/// directly are counted. Keep the returned session alive for as long as the page should be
/// synced; dropping it restores both originals.
pub fn attach(config: SyncConfig, client: JsValue) -> SyncResult<SyncSession<WindowSlot>> {
    let slot = Arc::new(WindowSlot::new(config.global_name()));
    let track_slot = Arc::new(WindowSlot::property(client.clone(), "track"));
    let bridge = SyncBridge::observing(
        config,
        Arc::new(BrowserEnvironment::new()),
        Arc::new(MixpanelClient::new(client)),
        slot,
        track_slot,
    )?;
    bridge.start(&TimerScheduler)
}

pub(crate) fn describe_js_error(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{err:?}")
}
