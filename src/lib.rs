//! # analytics-sync
//!
//! Mirrors calls made on a page's `gtag` entry point into a second analytics provider.
//!
//! A [`SyncBridge`](sync::SyncBridge) wraps the global tracking function, forwards every call to
//! the original untouched, and replays `event`, `config` and `set` calls against a
//! [`Downstream`](sync::Downstream) client enriched with a snapshot of the browser context and
//! the first-party identifiers found in the cookie jar. A small ring buffer keeps the most recent
//! events around for status displays.
//!
//! Browser bindings (`window.gtag`, a Mixpanel JS client, `setTimeout` based timers) live in
//! `platform::browser` behind the `wasm-web` feature on `wasm32`. Everything else runs on any
//! target, which is how the test-suite drives the bridge with fakes.
//!
//! ```
//! use std::sync::Arc;
//!
//! use analytics_sync::platform::runtime::ManualScheduler;
//! use analytics_sync::sync::{
//!     DetachedEnvironment, Downstream, InMemorySlot, SyncBridge, SyncConfig, SyncResult,
//! };
//! use serde_json::{json, Map, Value};
//!
//! struct Quiet;
//!
//! impl Downstream for Quiet {
//!     fn track(&self, _: &str, _: &Map<String, Value>) -> SyncResult<()> { Ok(()) }
//!     fn identify(&self, _: &str) -> SyncResult<()> { Ok(()) }
//!     fn set_profile(&self, _: &Map<String, Value>) -> SyncResult<()> { Ok(()) }
//!     fn register(&self, _: &Map<String, Value>) -> SyncResult<()> { Ok(()) }
//! }
//!
//! let slot = Arc::new(InMemorySlot::with_handler(Arc::new(|_: &[Value]| -> SyncResult<()> {
//!     Ok(())
//! })));
//! let bridge = SyncBridge::new(
//!     SyncConfig::default(),
//!     Arc::new(DetachedEnvironment),
//!     Arc::new(Quiet),
//!     Arc::clone(&slot),
//! )?;
//! let session = bridge.start(&ManualScheduler::new())?;
//!
//! slot.call(&[json!("event"), json!("sign_up")])?;
//! assert_eq!(bridge.stats().primary, 1);
//!
//! session.stop();
//! # Ok::<(), analytics_sync::sync::SyncError>(())
//! ```

pub mod logger;
pub mod platform;
pub mod sync;

#[cfg(test)]
pub mod test_support;
