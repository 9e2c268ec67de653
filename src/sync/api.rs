use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::platform::runtime::{Scheduler, TaskHandle};
use crate::sync::command::GtagCommand;
use crate::sync::config::SyncConfig;
use crate::sync::constants::NOT_DETECTED;
use crate::sync::context::{ContextSnapshot, Environment, SessionSummary};
use crate::sync::emitter::{Downstream, Emitter};
use crate::sync::error::SyncResult;
use crate::sync::event::CanonicalEvent;
use crate::sync::event_log::{EventLog, EventStats};
use crate::sync::identifiers::{IdentifierRules, TrackingIdentifiers};
use crate::sync::interceptor::{CallProcessor, GlobalSlot, InstallOutcome, Interceptor};
use crate::sync::logger::LOGGER;
use crate::sync::normalizer::{Normalized, Normalizer};

/// Mirrors calls made on the primary provider's global entry point into a secondary provider.
///
/// A bridge owns the interceptor for one [`GlobalSlot`] together with the local event log. It does
/// nothing until [`SyncBridge::install`] or [`SyncBridge::start`] is called; dropping the last
/// handle restores the slot.
///
/// A bridge built with [`SyncBridge::observing`] also wraps the secondary provider's own `track`
/// entry point, so events application code sends there directly show up in the log.
pub struct SyncBridge<S: GlobalSlot> {
    inner: Arc<BridgeInner<S>>,
}

impl<S: GlobalSlot> Clone for SyncBridge<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GlobalSlot> fmt::Debug for SyncBridge<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncBridge")
            .field("global", &self.inner.config.global_name())
            .field("installed", &self.is_installed())
            .finish()
    }
}

struct BridgeInner<S: GlobalSlot> {
    config: SyncConfig,
    pipeline: Pipeline,
    interceptor: Interceptor<S>,
    track_interceptor: Option<Interceptor<S>>,
    identifiers: Mutex<TrackingIdentifiers>,
}

/// Everything needed to turn one decoded call into downstream work. Shared between the bridge and
/// the interceptor's wrapper.
#[derive(Clone)]
struct Pipeline {
    env: Arc<dyn Environment>,
    rules: IdentifierRules,
    measurement_id: String,
    normalizer: Normalizer,
    emitter: Emitter,
    log: Arc<EventLog>,
}

impl Pipeline {
    fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot::capture(self.env.as_ref(), &self.rules, &self.measurement_id)
    }

    fn process(&self, args: &[Value]) -> SyncResult<()> {
        let command = GtagCommand::classify(args);
        let tag = command.tag().map(str::to_string);
        let snapshot = self.snapshot();

        match self.normalizer.normalize(command, &snapshot)? {
            Normalized::Track(event) => {
                let name = event.name().to_string();
                let properties = event.properties().clone();
                LOGGER.debug(format!(
                    "Syncing {name} (client id {})",
                    snapshot
                        .identifiers
                        .client_id
                        .as_deref()
                        .unwrap_or(NOT_DETECTED)
                ));
                self.log.record(event);
                self.emitter.track(&name, properties)
            }
            Normalized::Profile(update) => {
                if let Some(user_id) = update.identify.as_deref() {
                    LOGGER.debug(format!("Identifying user {user_id}"));
                    self.emitter.identify(user_id)?;
                }
                if let Some(properties) = update.properties.as_ref() {
                    self.emitter.set_profile(properties)?;
                }
                Ok(())
            }
            Normalized::Nothing => {
                log::debug!("ignoring gtag call {:?}", tag);
                Ok(())
            }
        }
    }

    /// Records a `track(name, properties?)` call seen on the secondary provider.
    fn observe_track(&self, args: &[Value]) -> SyncResult<()> {
        let Some(name) = args.first().and_then(Value::as_str) else {
            log::debug!("ignoring secondary track call without a name");
            return Ok(());
        };
        let properties = match args.get(1) {
            Some(Value::Object(properties)) => properties.clone(),
            _ => Map::new(),
        };
        let event = self
            .normalizer
            .classify_secondary(name, properties, chrono::Utc::now())?;
        self.log.record(event);
        Ok(())
    }
}

impl<S: GlobalSlot> SyncBridge<S> {
    pub fn new(
        config: SyncConfig,
        env: Arc<dyn Environment>,
        downstream: Arc<dyn Downstream>,
        slot: Arc<S>,
    ) -> SyncResult<Self> {
        Self::build(config, env, downstream, slot, None)
    }

    /// Like [`SyncBridge::new`], and also intercepts `track_slot`, the entry point application
    /// code uses to send events to the secondary provider directly.
    pub fn observing(
        config: SyncConfig,
        env: Arc<dyn Environment>,
        downstream: Arc<dyn Downstream>,
        slot: Arc<S>,
        track_slot: Arc<S>,
    ) -> SyncResult<Self> {
        Self::build(config, env, downstream, slot, Some(track_slot))
    }

    fn build(
        config: SyncConfig,
        env: Arc<dyn Environment>,
        downstream: Arc<dyn Downstream>,
        slot: Arc<S>,
        track_slot: Option<Arc<S>>,
    ) -> SyncResult<Self> {
        config.validate()?;

        let normalizer = Normalizer::from_config(&config);
        let log = Arc::new(EventLog::new(config.log_capacity()));
        let pipeline = Pipeline {
            env,
            rules: IdentifierRules::from_config(&config),
            measurement_id: config.measurement_id().to_string(),
            emitter: Emitter::new(downstream, normalizer.clone(), Arc::clone(&log)),
            normalizer,
            log,
        };

        let processor: CallProcessor = {
            let pipeline = pipeline.clone();
            Arc::new(move |args: &[Value]| pipeline.process(args))
        };
        let track_interceptor = track_slot.map(|track_slot| {
            let pipeline = pipeline.clone();
            let processor: CallProcessor =
                Arc::new(move |args: &[Value]| pipeline.observe_track(args));
            Interceptor::new(track_slot, processor)
        });
        let identifiers = pipeline.snapshot().identifiers;

        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                interceptor: Interceptor::new(slot, processor),
                track_interceptor,
                pipeline,
                identifiers: Mutex::new(identifiers),
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn slot(&self) -> &Arc<S> {
        self.inner.interceptor.slot()
    }

    /// A fresh capture of the environment.
    pub fn snapshot(&self) -> ContextSnapshot {
        self.inner.pipeline.snapshot()
    }

    pub fn is_installed(&self) -> bool {
        self.inner.interceptor.is_installed()
    }

    /// Whether direct tracks on the secondary provider are currently intercepted.
    pub fn is_observing_tracks(&self) -> bool {
        self.inner
            .track_interceptor
            .as_ref()
            .is_some_and(Interceptor::is_installed)
    }

    /// Wraps the global entry point, and the secondary provider's `track` when the bridge observes
    /// it. Safe to call repeatedly.
    pub fn install(&self) -> SyncResult<InstallOutcome> {
        self.observe_tracks();
        let outcome = self.inner.interceptor.install()?;
        if outcome == InstallOutcome::Installed {
            LOGGER.info(format!(
                "Intercepting {} calls",
                self.inner.config.global_name()
            ));
        }
        Ok(outcome)
    }

    fn observe_tracks(&self) {
        let Some(track_interceptor) = self.inner.track_interceptor.as_ref() else {
            return;
        };
        match track_interceptor.install() {
            Ok(InstallOutcome::Installed) => {
                self.inner.pipeline.emitter.set_observed(true);
                LOGGER.debug("Observing direct secondary tracks");
            }
            Ok(InstallOutcome::AlreadyInstalled) => {}
            Ok(InstallOutcome::TargetMissing) => {
                log::debug!("secondary track entry point is not available yet");
            }
            Err(err) => LOGGER.warn(format!("Cannot observe secondary tracks: {err}")),
        }
    }

    /// Puts the original entry point back.
    pub fn uninstall(&self) -> bool {
        if let Some(track_interceptor) = self.inner.track_interceptor.as_ref() {
            if track_interceptor.uninstall() {
                self.inner.pipeline.emitter.set_observed(false);
            }
        }
        let restored = self.inner.interceptor.uninstall();
        if restored {
            LOGGER.info(format!("Restored {}", self.inner.config.global_name()));
        }
        restored
    }

    /// Processes one call as if it had come through the intercepted global, for hosts that
    /// dispatch tracking calls themselves.
    pub fn handle_call(&self, args: &[Value]) -> SyncResult<()> {
        self.inner.pipeline.process(args)
    }

    /// Sends an event straight to the secondary provider and records it locally.
    pub fn track(&self, name: &str, properties: Map<String, Value>) -> SyncResult<()> {
        self.inner.pipeline.emitter.track(name, properties)
    }

    /// Registers a fresh snapshot as standing properties and refreshes the cached identifiers.
    pub fn register_context(&self) -> SyncResult<ContextSnapshot> {
        let snapshot = self.snapshot();
        *lock(&self.inner.identifiers) = snapshot.identifiers.clone();
        self.inner
            .pipeline
            .emitter
            .register(&snapshot.to_properties())?;
        Ok(snapshot)
    }

    /// Writes the per-session profile fields derived from `snapshot`.
    pub fn update_profile(&self, snapshot: &ContextSnapshot) -> SyncResult<()> {
        self.inner
            .pipeline
            .emitter
            .set_profile(&snapshot.profile_properties())
    }

    /// Starts syncing: registers the context, installs the interceptor (retrying once after the
    /// configured delay in case the primary script loads late) and schedules the periodic context
    /// refresh. Dropping the returned session tears all of it down.
    pub fn start(&self, scheduler: &dyn Scheduler) -> SyncResult<SyncSession<S>> {
        let mut session = SyncSession {
            bridge: self.clone(),
            timers: Vec::new(),
        };

        match self.register_context() {
            Ok(snapshot) if self.inner.config.profile_on_start() => {
                if let Err(err) = self.update_profile(&snapshot) {
                    LOGGER.error_with(["Failed to update profile:".to_string(), err.to_string()]);
                }
            }
            Ok(_) => {}
            Err(err) => {
                LOGGER.error_with([
                    "Failed to register context:".to_string(),
                    err.to_string(),
                ]);
            }
        }

        if self.install()? == InstallOutcome::TargetMissing {
            LOGGER.warn(format!(
                "{} is not defined yet; retrying in {:?}",
                self.inner.config.global_name(),
                self.inner.config.install_retry_delay()
            ));
        }

        let weak = Arc::downgrade(&self.inner);
        session.timers.push(scheduler.schedule_once(
            self.inner.config.install_retry_delay(),
            Arc::new(move || retry_install(&weak)),
        ));

        let weak = Arc::downgrade(&self.inner);
        session.timers.push(scheduler.schedule_repeating(
            self.inner.config.refresh_interval(),
            Arc::new(move || refresh_context(&weak)),
        ));

        Ok(session)
    }

    /// Identifiers as of the last context registration.
    pub fn identifiers(&self) -> TrackingIdentifiers {
        lock(&self.inner.identifiers).clone()
    }

    pub fn recent_events(&self) -> Vec<CanonicalEvent> {
        self.inner.pipeline.log.recent()
    }

    pub fn stats(&self) -> EventStats {
        self.inner.pipeline.log.stats()
    }

    pub fn status(&self) -> SyncStatus {
        let identifiers = self.identifiers();
        SyncStatus {
            installed: self.is_installed(),
            client_id: displayed(identifiers.client_id),
            session_id: displayed(identifiers.session_id),
            ad_click_id: displayed(identifiers.ad_click_id),
            distinct_id: displayed(self.inner.pipeline.emitter.distinct_id()),
            session: self.snapshot().session_summary(),
            stats: self.stats(),
            recent_events: self.recent_events(),
        }
    }
}

fn retry_install<S: GlobalSlot>(inner: &Weak<BridgeInner<S>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let bridge = SyncBridge { inner };
    match bridge.install() {
        Ok(InstallOutcome::TargetMissing) => LOGGER.warn(format!(
            "{} is still not defined; calls will not be synced",
            bridge.config().global_name()
        )),
        Ok(_) => {}
        Err(err) => LOGGER.error_with(["Failed to install interceptor:".to_string(), err.to_string()]),
    }
}

fn refresh_context<S: GlobalSlot>(inner: &Weak<BridgeInner<S>>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    log::debug!("refreshing sync context");
    if let Err(err) = (SyncBridge { inner }).register_context() {
        LOGGER.error_with(["Failed to refresh context:".to_string(), err.to_string()]);
    }
}

fn displayed(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_DETECTED.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A running sync. Cancels its timers and restores the global entry point when stopped or
/// dropped, whichever comes first.
pub struct SyncSession<S: GlobalSlot> {
    bridge: SyncBridge<S>,
    timers: Vec<TaskHandle>,
}

impl<S: GlobalSlot> fmt::Debug for SyncSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSession")
            .field("bridge", &self.bridge)
            .field("timers", &self.timers.len())
            .finish()
    }
}

impl<S: GlobalSlot> SyncSession<S> {
    pub fn bridge(&self) -> &SyncBridge<S> {
        &self.bridge
    }

    pub fn stop(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
        self.bridge.uninstall();
    }
}

impl<S: GlobalSlot> Drop for SyncSession<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Read model for status displays.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncStatus {
    pub installed: bool,
    pub client_id: String,
    pub session_id: String,
    pub ad_click_id: String,
    /// The secondary provider's visitor id.
    pub distinct_id: String,
    pub session: SessionSummary,
    pub stats: EventStats,
    pub recent_events: Vec<CanonicalEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::runtime::ManualScheduler;
    use crate::sync::event::EventSource;
    use crate::sync::interceptor::InMemorySlot;
    use crate::test_support::{recording_original, DownstreamCall, FakeEnvironment, RecordingDownstream};
    use serde_json::json;
    use std::time::Duration;

    fn bridge(
        slot: Arc<InMemorySlot>,
        env: FakeEnvironment,
        downstream: &RecordingDownstream,
    ) -> SyncBridge<InMemorySlot> {
        SyncBridge::new(
            SyncConfig::default(),
            Arc::new(env),
            Arc::new(downstream.clone()),
            slot,
        )
        .unwrap()
    }

    #[test]
    fn event_calls_are_forwarded_and_synced() {
        let (original, calls) = recording_original();
        let slot = Arc::new(InMemorySlot::with_handler(original));
        let downstream = RecordingDownstream::default();
        let bridge = bridge(Arc::clone(&slot), FakeEnvironment::browser(), &downstream);

        assert_eq!(bridge.install().unwrap(), InstallOutcome::Installed);
        slot.call(&[json!("event"), json!("button_click"), json!({"value": 1})])
            .unwrap();

        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(downstream.tracked_names(), ["GA: button_click"]);
        let stats = bridge.stats();
        assert_eq!((stats.primary, stats.synced, stats.secondary), (1, 1, 0));
        let recent = bridge.recent_events();
        assert_eq!(recent[1].source(), EventSource::Primary);
        assert_eq!(recent[1].properties()["value"], 1);
    }

    #[test]
    fn set_calls_identify_before_profile_update() {
        let (original, _) = recording_original();
        let slot = Arc::new(InMemorySlot::with_handler(original));
        let downstream = RecordingDownstream::default();
        let bridge = bridge(Arc::clone(&slot), FakeEnvironment::browser(), &downstream);
        bridge.install().unwrap();

        slot.call(&[json!("set"), json!({"user_id": "u-7", "plan": "pro"})])
            .unwrap();

        let calls = downstream.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], DownstreamCall::Identify("u-7".into()));
        let DownstreamCall::SetProfile(properties) = &calls[1] else {
            panic!("expected profile update, got {:?}", calls[1]);
        };
        assert_eq!(properties["plan"], "pro");
        assert!(bridge.recent_events().is_empty());
    }

    #[test]
    fn start_registers_context_and_profile() {
        let (original, _) = recording_original();
        let slot = Arc::new(InMemorySlot::with_handler(original));
        let downstream = RecordingDownstream::default();
        let bridge = bridge(slot, FakeEnvironment::browser(), &downstream);
        let scheduler = ManualScheduler::new();

        let session = bridge.start(&scheduler).unwrap();
        assert!(bridge.is_installed());
        let calls = downstream.calls();
        assert!(matches!(&calls[0], DownstreamCall::Register(props) if props["ga_client_id"] == "111.222"));
        assert!(matches!(&calls[1], DownstreamCall::SetProfile(props) if props["$screen_width"] == 1920));
        assert_eq!(scheduler.pending(), 2);

        drop(session);
        assert!(!bridge.is_installed());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn late_global_is_picked_up_by_retry() {
        let slot = Arc::new(InMemorySlot::new());
        let downstream = RecordingDownstream::default();
        let bridge = bridge(Arc::clone(&slot), FakeEnvironment::browser(), &downstream);
        let scheduler = ManualScheduler::new();

        let _session = bridge.start(&scheduler).unwrap();
        assert!(!bridge.is_installed());

        let (original, calls) = recording_original();
        slot.set(Some(original));
        scheduler.advance(Duration::from_millis(1_000));
        assert!(bridge.is_installed());

        slot.call(&[json!("event"), json!("login")]).unwrap();
        assert_eq!(calls.borrow().len(), 1);
        assert_eq!(downstream.tracked_names(), ["GA: login"]);
    }

    #[test]
    fn refresh_reregisters_and_updates_identifiers() {
        let env = FakeEnvironment::browser();
        let downstream = RecordingDownstream::default();
        let bridge = bridge(Arc::new(InMemorySlot::new()), env.clone(), &downstream);
        let scheduler = ManualScheduler::new();
        let _session = bridge.start(&scheduler).unwrap();

        env.set_cookie_header("_ga=GA1.1.555.666");
        scheduler.advance(Duration::from_millis(10_000));

        assert_eq!(bridge.identifiers().client_id.as_deref(), Some("555.666"));
        let registers = downstream
            .calls()
            .into_iter()
            .filter(|call| matches!(call, DownstreamCall::Register(_)))
            .count();
        assert_eq!(registers, 2);
    }

    #[test]
    fn downstream_failures_never_reach_the_caller() {
        let (original, calls) = recording_original();
        let slot = Arc::new(InMemorySlot::with_handler(original));
        let downstream = RecordingDownstream::failing();
        let bridge = bridge(Arc::clone(&slot), FakeEnvironment::browser(), &downstream);
        let scheduler = ManualScheduler::new();
        let _session = bridge.start(&scheduler).unwrap();

        slot.call(&[json!("event"), json!("purchase")]).unwrap();
        assert_eq!(calls.borrow().len(), 1);
        // The primary event is still visible locally; the failed forward is not.
        assert_eq!(bridge.stats().primary, 1);
        assert_eq!(bridge.stats().synced, 0);
    }

    #[test]
    fn direct_tracks_are_classified() {
        let downstream = RecordingDownstream::default();
        let bridge = bridge(Arc::new(InMemorySlot::new()), FakeEnvironment::browser(), &downstream);

        bridge.track("Signup Clicked", Map::new()).unwrap();
        bridge.track("GA: manual", Map::new()).unwrap();

        let stats = bridge.stats();
        assert_eq!((stats.secondary, stats.synced), (1, 1));
    }

    #[test]
    fn status_reports_missing_identifiers() {
        let env = FakeEnvironment::browser();
        env.set_cookie_header("theme=dark");
        let bridge = bridge(
            Arc::new(InMemorySlot::new()),
            env,
            &RecordingDownstream::default(),
        );

        let status = bridge.status();
        assert_eq!(status.client_id, "Not detected");
        assert_eq!(status.session_id, "Not detected");
        assert_eq!(status.distinct_id, "Not detected");
        assert_eq!(status.session.screen, "1920x1080");
        assert!(!status.installed);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["stats"]["primary"], 0);
    }

    #[test]
    fn status_shows_the_provider_distinct_id() {
        let downstream = RecordingDownstream::default().with_distinct_id("mp-42");
        let bridge = bridge(Arc::new(InMemorySlot::new()), FakeEnvironment::browser(), &downstream);

        assert_eq!(bridge.status().distinct_id, "mp-42");
    }

    /// A provider client whose `track` goes through a replaceable entry point, like a JS client
    /// object whose `track` property can be wrapped.
    struct SlotClient {
        track: Arc<InMemorySlot>,
    }

    impl Downstream for SlotClient {
        fn track(&self, name: &str, properties: &Map<String, Value>) -> SyncResult<()> {
            self.track
                .call(&[json!(name), Value::Object(properties.clone())])
        }

        fn identify(&self, _user_id: &str) -> SyncResult<()> {
            Ok(())
        }

        fn set_profile(&self, _properties: &Map<String, Value>) -> SyncResult<()> {
            Ok(())
        }

        fn register(&self, _properties: &Map<String, Value>) -> SyncResult<()> {
            Ok(())
        }
    }

    #[test]
    fn direct_provider_tracks_are_observed_once() {
        let (gtag, _) = recording_original();
        let slot = Arc::new(InMemorySlot::with_handler(gtag));
        let (track, provider_calls) = recording_original();
        let track_slot = Arc::new(InMemorySlot::with_handler(Arc::clone(&track)));
        let bridge = SyncBridge::observing(
            SyncConfig::default(),
            Arc::new(FakeEnvironment::browser()),
            Arc::new(SlotClient {
                track: Arc::clone(&track_slot),
            }),
            Arc::clone(&slot),
            Arc::clone(&track_slot),
        )
        .unwrap();

        bridge.install().unwrap();
        assert!(bridge.is_observing_tracks());

        track_slot
            .call(&[json!("Button Clicked"), json!({"button": "cta"})])
            .unwrap();
        slot.call(&[json!("event"), json!("login")]).unwrap();

        assert_eq!(provider_calls.borrow().len(), 2);
        let stats = bridge.stats();
        assert_eq!((stats.primary, stats.synced, stats.secondary), (1, 1, 1));
        let clicked = &bridge.recent_events()[2];
        assert_eq!(clicked.source(), EventSource::Secondary);
        assert_eq!(clicked.properties()["button"], "cta");

        assert!(bridge.uninstall());
        assert!(!bridge.is_observing_tracks());
        assert!(Arc::ptr_eq(&track, &track_slot.get().unwrap()));

        bridge.track("Signup Clicked", Map::new()).unwrap();
        assert_eq!(bridge.stats().secondary, 2);
    }

    #[test]
    fn late_provider_is_observed_on_retry() {
        let (gtag, _) = recording_original();
        let track_slot = Arc::new(InMemorySlot::new());
        let bridge = SyncBridge::observing(
            SyncConfig::default(),
            Arc::new(FakeEnvironment::browser()),
            Arc::new(RecordingDownstream::default()),
            Arc::new(InMemorySlot::with_handler(gtag)),
            Arc::clone(&track_slot),
        )
        .unwrap();
        let scheduler = ManualScheduler::new();
        let _session = bridge.start(&scheduler).unwrap();
        assert!(bridge.is_installed());
        assert!(!bridge.is_observing_tracks());

        let (track, _) = recording_original();
        track_slot.set(Some(track));
        scheduler.advance(Duration::from_millis(1_000));

        assert!(bridge.is_observing_tracks());
        track_slot.call(&[json!("Button Clicked")]).unwrap();
        assert_eq!(bridge.stats().secondary, 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = SyncBridge::new(
            SyncConfig::default().with_log_capacity(0),
            Arc::new(FakeEnvironment::browser()),
            Arc::new(RecordingDownstream::default()),
            Arc::new(InMemorySlot::new()),
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "sync/invalid-argument");
    }
}
