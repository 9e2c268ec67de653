//! Mirroring of intercepted `gtag` calls into a secondary analytics provider.
//!
//! The pieces are layered bottom-up: [`identifiers`] and [`context`] read the environment,
//! [`command`] and [`normalizer`] turn raw calls into canonical events, [`emitter`] hands them to
//! the secondary provider, [`interceptor`] owns the global entry point and [`api`] wires it all
//! together behind [`SyncBridge`].

mod api;
pub mod command;
mod config;
pub mod constants;
pub mod context;
pub mod emitter;
pub mod error;
pub mod event;
pub mod event_log;
pub mod identifiers;
pub mod interceptor;
mod logger;
pub mod normalizer;

pub use api::{SyncBridge, SyncSession, SyncStatus};
pub use command::GtagCommand;
pub use config::SyncConfig;
pub use context::{
    ConnectionInfo, ContextSnapshot, DetachedEnvironment, DisplayInfo, Environment,
    NavigatorInfo, PageInfo, PageLocation, SessionSummary, StorageKind, TimezoneInfo,
};
pub use emitter::{Downstream, Emitter};
pub use error::{SyncError, SyncErrorCode, SyncResult};
pub use event::{CanonicalEvent, EventSource};
pub use event_log::{EventLog, EventStats};
pub use identifiers::{IdentifierRules, TrackingIdentifiers};
pub use interceptor::{GlobalSlot, InMemorySlot, InstallOutcome, Interceptor, TrackingFn};
pub use logger::LOGGER;
pub use normalizer::{Normalized, Normalizer, ProfileUpdate};
