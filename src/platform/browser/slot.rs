use std::fmt;
use std::sync::{Mutex, MutexGuard};

use js_sys::{Array, Function, Object, Reflect};
use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::platform::browser::describe_js_error;
use crate::sync::error::{internal_error, SyncResult};
use crate::sync::interceptor::{CallHook, GlobalSlot};
use crate::sync::LOGGER;

type WrapperClosure = Closure<dyn Fn(Array) -> Result<(), JsValue>>;

const LIVE: &str = "live";

/// Collects `arguments` into an array so a fixed-arity Rust closure can stand behind a variadic
/// JS function, and passes the wrapper's return value (or exception) straight through. Once the
/// wrapper is released it calls the original directly, so the Rust closure can be freed while
/// scripts still hold the wrapper.
const VARIADIC_SHIM: &str = "return function () {
    if (!state.live) { return original.apply(this, arguments); }
    return inner(Array.prototype.slice.call(arguments));
};";

struct LiveWrapper {
    wrapper: Function,
    state: Object,
    _closure: WrapperClosure,
}

impl LiveWrapper {
    fn release(self) {
        let _ = Reflect::set(&self.state, &JsValue::from_str(LIVE), &JsValue::FALSE);
    }
}

/// A function-valued property: `window[key]` (e.g. `window.gtag`) or `owner[key]` on any JS
/// object (e.g. a Mixpanel client's `track`).
pub struct WindowSlot {
    owner: Option<JsValue>,
    key: String,
    wrappers: Mutex<Vec<LiveWrapper>>,
}

impl WindowSlot {
    /// The `window[name]` global.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            key: name.into(),
            wrappers: Mutex::new(Vec::new()),
        }
    }

    /// The `key` property of `owner`. Forwarded calls keep `owner` as `this`.
    pub fn property(owner: JsValue, key: impl Into<String>) -> Self {
        Self {
            owner: Some(owner),
            key: key.into(),
            wrappers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.key
    }

    /// Wrappers whose Rust side is still held. At most the installed one.
    pub fn live_wrappers(&self) -> usize {
        self.wrappers().len()
    }

    fn owner(&self) -> Option<JsValue> {
        match &self.owner {
            Some(owner) => Some(owner.clone()),
            None => web_sys::window().map(JsValue::from),
        }
    }

    fn key(&self) -> JsValue {
        JsValue::from_str(&self.key)
    }

    fn wrappers(&self) -> MutexGuard<'_, Vec<LiveWrapper>> {
        self.wrappers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for WindowSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowSlot")
            .field("key", &self.key)
            .field("on_window", &self.owner.is_none())
            .field("wrappers", &self.live_wrappers())
            .finish()
    }
}

impl GlobalSlot for WindowSlot {
    type Handler = Function;
    type Args = Array;
    type Error = JsValue;

    fn current(&self) -> Option<Function> {
        let owner = self.owner()?;
        Reflect::get(&owner, &self.key())
            .ok()?
            .dyn_into::<Function>()
            .ok()
    }

    fn assign(&self, handler: Function) {
        // Wrappers other than the one being assigned are stale from here on.
        let released: Vec<LiveWrapper> = {
            let mut wrappers = self.wrappers();
            let (kept, released): (Vec<_>, Vec<_>) = wrappers
                .drain(..)
                .partition(|live| Object::is(&live.wrapper, &handler));
            *wrappers = kept;
            released
        };
        for live in released {
            live.release();
        }

        let Some(owner) = self.owner() else {
            return;
        };
        if let Err(err) = Reflect::set(&owner, &self.key(), &handler) {
            LOGGER.error_with([
                format!("Failed to assign {}:", self.key),
                describe_js_error(&err),
            ]);
        }
    }

    fn forward(&self, handler: &Function, args: &Array) -> Result<(), JsValue> {
        let this = self.owner().unwrap_or(JsValue::UNDEFINED);
        handler.apply(&this, args).map(|_| ())
    }

    fn decode(&self, args: &Array) -> Vec<Value> {
        args.iter()
            .map(|arg| serde_wasm_bindgen::from_value(arg).unwrap_or(Value::Null))
            .collect()
    }

    fn wrap(&self, hook: CallHook<Array, JsValue>) -> SyncResult<Function> {
        let original = self
            .current()
            .ok_or_else(|| internal_error(format!("{} holds no function to wrap", self.key)))?;
        let state = Object::new();
        Reflect::set(&state, &JsValue::from_str(LIVE), &JsValue::TRUE)
            .map_err(|err| internal_error(describe_js_error(&err)))?;

        let closure: WrapperClosure = Closure::new(move |args: Array| hook(&args));
        let shim = Function::new_with_args("inner, original, state", VARIADIC_SHIM);
        let wrapper = shim
            .call3(&JsValue::UNDEFINED, closure.as_ref(), &original, &state)
            .map_err(|err| internal_error(describe_js_error(&err)))?
            .dyn_into::<Function>()
            .map_err(|_| internal_error("variadic shim did not return a function"))?;

        self.wrappers().push(LiveWrapper {
            wrapper: wrapper.clone(),
            state,
            _closure: closure,
        });
        Ok(wrapper)
    }
}
