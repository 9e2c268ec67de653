use std::fmt;

use js_sys::{Array, Function, Reflect};
use serde::Serialize;
use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, JsValue};

use crate::platform::browser::describe_js_error;
use crate::sync::emitter::Downstream;
use crate::sync::error::{downstream_error, SyncResult};

/// Downstream over a Mixpanel JS client object (`window.mixpanel` or an instance returned by
/// `mixpanel.init`).
#[derive(Clone)]
pub struct MixpanelClient {
    client: JsValue,
}

impl fmt::Debug for MixpanelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MixpanelClient").finish_non_exhaustive()
    }
}

impl MixpanelClient {
    pub fn new(client: JsValue) -> Self {
        Self { client }
    }

    /// Looks the client up on `window`, e.g. `MixpanelClient::from_global("mixpanel")`.
    pub fn from_global(name: &str) -> SyncResult<Self> {
        let window = web_sys::window().ok_or_else(|| downstream_error("window is not available"))?;
        let client = Reflect::get(&window, &JsValue::from_str(name))
            .map_err(|err| downstream_error(describe_js_error(&err)))?;
        if client.is_undefined() || client.is_null() {
            return Err(downstream_error(format!("window.{name} is not defined")));
        }
        Ok(Self::new(client))
    }

    fn invoke(&self, target: &JsValue, method: &str, args: &[JsValue]) -> SyncResult<()> {
        let function = Reflect::get(target, &JsValue::from_str(method))
            .map_err(|err| downstream_error(describe_js_error(&err)))?
            .dyn_into::<Function>()
            .map_err(|_| downstream_error(format!("mixpanel.{method} is not a function")))?;
        let args: Array = args.iter().collect();
        function
            .apply(target, &args)
            .map(|_| ())
            .map_err(|err| downstream_error(format!("mixpanel.{method}: {}", describe_js_error(&err))))
    }
}

fn to_js(properties: &Map<String, Value>) -> SyncResult<JsValue> {
    properties
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|err| downstream_error(format!("cannot convert properties: {err}")))
}

impl Downstream for MixpanelClient {
    fn track(&self, name: &str, properties: &Map<String, Value>) -> SyncResult<()> {
        self.invoke(
            &self.client,
            "track",
            &[JsValue::from_str(name), to_js(properties)?],
        )
    }

    fn identify(&self, user_id: &str) -> SyncResult<()> {
        self.invoke(&self.client, "identify", &[JsValue::from_str(user_id)])
    }

    fn set_profile(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        let people = Reflect::get(&self.client, &JsValue::from_str("people"))
            .map_err(|err| downstream_error(describe_js_error(&err)))?;
        if people.is_undefined() || people.is_null() {
            return Err(downstream_error("mixpanel.people is not available"));
        }
        self.invoke(&people, "set", &[to_js(properties)?])
    }

    fn register(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        self.invoke(&self.client, "register", &[to_js(properties)?])
    }

    fn distinct_id(&self) -> Option<String> {
        let function = Reflect::get(&self.client, &JsValue::from_str("get_distinct_id"))
            .ok()?
            .dyn_into::<Function>()
            .ok()?;
        let id = function.call0(&self.client).ok()?;
        id.as_string()
            .or_else(|| id.as_f64().map(|number| number.to_string()))
    }
}
