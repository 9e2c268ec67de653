//! Delegation to the secondary analytics provider.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::sync::error::SyncResult;
use crate::sync::event_log::EventLog;
use crate::sync::normalizer::Normalizer;

/// Client of the secondary provider. Delivery is best-effort: whatever batching or retrying the
/// concrete client does internally is its own business.
pub trait Downstream {
    fn track(&self, name: &str, properties: &Map<String, Value>) -> SyncResult<()>;

    fn identify(&self, user_id: &str) -> SyncResult<()>;

    /// Updates the profile of the identified user (`people.set`).
    fn set_profile(&self, properties: &Map<String, Value>) -> SyncResult<()>;

    /// Registers standing properties attached by the client to every later event.
    fn register(&self, properties: &Map<String, Value>) -> SyncResult<()>;

    /// The provider's id for the current visitor, when it exposes one.
    fn distinct_id(&self) -> Option<String> {
        None
    }
}

/// Emitter that records every successful `track` in the local event log, classified as a direct
/// secondary event or a synced one.
///
/// While the provider's own `track` entry point is intercepted, that interceptor sees every track
/// (ours included) and the emitter stops recording, so nothing is counted twice.
#[derive(Clone)]
pub struct Emitter {
    downstream: Arc<dyn Downstream>,
    normalizer: Normalizer,
    log: Arc<EventLog>,
    observed: Arc<AtomicBool>,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("normalizer", &self.normalizer)
            .field("observed", &self.is_observed())
            .finish()
    }
}

impl Emitter {
    pub fn new(downstream: Arc<dyn Downstream>, normalizer: Normalizer, log: Arc<EventLog>) -> Self {
        Self {
            downstream,
            normalizer,
            log,
            observed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether tracks are recorded by an interceptor on the provider instead of here.
    pub fn is_observed(&self) -> bool {
        self.observed.load(Ordering::Acquire)
    }

    pub(crate) fn set_observed(&self, observed: bool) {
        self.observed.store(observed, Ordering::Release);
    }

    pub fn track(&self, name: &str, properties: Map<String, Value>) -> SyncResult<()> {
        self.downstream.track(name, &properties)?;
        if self.is_observed() {
            return Ok(());
        }
        let observed = self
            .normalizer
            .classify_secondary(name, properties, chrono::Utc::now())?;
        self.log.record(observed);
        Ok(())
    }

    pub fn identify(&self, user_id: &str) -> SyncResult<()> {
        self.downstream.identify(user_id)
    }

    pub fn set_profile(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        self.downstream.set_profile(properties)
    }

    pub fn register(&self, properties: &Map<String, Value>) -> SyncResult<()> {
        self.downstream.register(properties)
    }

    pub fn distinct_id(&self) -> Option<String> {
        self.downstream.distinct_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::event::EventSource;
    use crate::test_support::RecordingDownstream;

    fn emitter(downstream: &RecordingDownstream) -> (Emitter, Arc<EventLog>) {
        let log = Arc::new(EventLog::new(10));
        let emitter = Emitter::new(
            Arc::new(downstream.clone()),
            Normalizer::new("GA: ", "google_analytics"),
            Arc::clone(&log),
        );
        (emitter, log)
    }

    #[test]
    fn successful_tracks_are_recorded() {
        let downstream = RecordingDownstream::default();
        let (emitter, log) = emitter(&downstream);

        emitter.track("GA: login", Map::new()).unwrap();
        emitter.track("Button Clicked", Map::new()).unwrap();

        assert_eq!(downstream.tracked_names(), ["GA: login", "Button Clicked"]);
        let stats = log.stats();
        assert_eq!(stats.synced, 1);
        assert_eq!(stats.secondary, 1);
        assert_eq!(log.recent()[0].source(), EventSource::Secondary);
    }

    #[test]
    fn failed_tracks_are_not_recorded() {
        let downstream = RecordingDownstream::failing();
        let (emitter, log) = emitter(&downstream);

        let err = emitter.track("GA: login", Map::new()).unwrap_err();
        assert_eq!(err.code_str(), "sync/downstream");
        assert!(log.is_empty());
    }

    #[test]
    fn observed_tracks_are_left_to_the_interceptor() {
        let downstream = RecordingDownstream::default();
        let (emitter, log) = emitter(&downstream);

        emitter.set_observed(true);
        emitter.track("GA: login", Map::new()).unwrap();
        assert_eq!(downstream.tracked_names(), ["GA: login"]);
        assert!(log.is_empty());

        emitter.set_observed(false);
        emitter.track("GA: login", Map::new()).unwrap();
        assert_eq!(log.stats().synced, 1);
    }
}
