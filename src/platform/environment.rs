//! Runtime detection and host-provided defaults.

use std::env;
use std::fs;

use serde_json::Value;

use crate::sync::constants::{DEFAULTS_ENV_VAR, DEFAULTS_PATH_ENV_VAR};

/// Returns the JSON object the host published as `__ANALYTICS_SYNC_DEFAULTS__`, if any.
pub fn sync_defaults() -> Option<Value> {
    defaults_from_env()
        .or_else(defaults_from_path)
        .or_else(defaults_from_global)
}

fn defaults_from_env() -> Option<Value> {
    let raw = env::var(DEFAULTS_ENV_VAR).ok()?;
    parse_object(&raw)
}

fn defaults_from_path() -> Option<Value> {
    let path = env::var(DEFAULTS_PATH_ENV_VAR).ok()?;
    match fs::read_to_string(&path) {
        Ok(content) => parse_object(&content),
        Err(err) => {
            log::warn!("cannot read sync defaults from {path}: {err}");
            None
        }
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn defaults_from_global() -> Option<Value> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str(DEFAULTS_ENV_VAR)).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let serialized = js_sys::JSON::stringify(&value).ok()?.as_string()?;
    parse_object(&serialized)
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn defaults_from_global() -> Option<Value> {
    None
}

fn parse_object(raw: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => {
            log::warn!("sync defaults must be a JSON object; ignoring");
            None
        }
        Err(err) => {
            log::warn!("sync defaults are not valid JSON: {err}");
            None
        }
    }
}

/// Returns `true` when running inside a browser window.
pub fn is_browser() -> bool {
    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        use wasm_bindgen::JsCast;
        js_sys::global().dyn_into::<web_sys::Window>().is_ok()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}
