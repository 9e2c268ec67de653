//! Installable wrapper around a mutable global tracking entry point.
//!
//! An [`Interceptor`] is either uninstalled or installed. Installing captures the current handler
//! of a [`GlobalSlot`] and replaces it with a wrapper; uninstalling puts the captured handler
//! back. Every call through the wrapper is forwarded to the captured handler, with the same
//! arguments, before any local processing, and local failures never reach the caller.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

use crate::sync::error::SyncResult;
use crate::sync::logger::LOGGER;

/// Hook invoked by wrapper handlers with the raw call arguments.
pub type CallHook<A, E> = Arc<dyn Fn(&A) -> Result<(), E> + 'static>;

/// Local processing of a decoded call.
pub type CallProcessor = Arc<dyn Fn(&[Value]) -> SyncResult<()> + 'static>;

/// A writable global holding a callable handler, e.g. `window.gtag`.
pub trait GlobalSlot: 'static {
    type Handler: Clone + 'static;
    type Args: ?Sized;
    type Error: 'static;

    /// The handler currently stored in the slot, if it holds a callable.
    fn current(&self) -> Option<Self::Handler>;

    fn assign(&self, handler: Self::Handler);

    /// Calls `handler` with exactly `args`.
    fn forward(&self, handler: &Self::Handler, args: &Self::Args) -> Result<(), Self::Error>;

    /// Converts raw arguments for local processing. Undecodable arguments become `null`.
    fn decode(&self, args: &Self::Args) -> Vec<Value>;

    /// Builds a handler that calls `hook` and reports its result to the caller.
    fn wrap(&self, hook: CallHook<Self::Args, Self::Error>) -> SyncResult<Self::Handler>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// An earlier install is still active; nothing changed.
    AlreadyInstalled,
    /// The slot holds no handler yet; try again later.
    TargetMissing,
}

pub struct Interceptor<S: GlobalSlot> {
    slot: Arc<S>,
    original: Arc<Mutex<Option<S::Handler>>>,
    processor: CallProcessor,
}

impl<S: GlobalSlot> fmt::Debug for Interceptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl<S: GlobalSlot> Interceptor<S> {
    pub fn new(slot: Arc<S>, processor: CallProcessor) -> Self {
        Self {
            slot,
            original: Arc::new(Mutex::new(None)),
            processor,
        }
    }

    pub fn slot(&self) -> &Arc<S> {
        &self.slot
    }

    pub fn is_installed(&self) -> bool {
        lock(&self.original).is_some()
    }

    /// Captures the slot's handler and replaces it with the wrapper. Repeated calls while
    /// installed are no-ops, so wrappers never chain.
    pub fn install(&self) -> SyncResult<InstallOutcome> {
        let mut original = lock(&self.original);
        if original.is_some() {
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        let Some(current) = self.slot.current() else {
            return Ok(InstallOutcome::TargetMissing);
        };

        let wrapper = self.slot.wrap(self.hook(current.clone()))?;
        *original = Some(current);
        drop(original);
        self.slot.assign(wrapper);
        Ok(InstallOutcome::Installed)
    }

    /// Restores the captured handler. Returns `false` when nothing was installed.
    pub fn uninstall(&self) -> bool {
        let captured = lock(&self.original).take();
        match captured {
            Some(original) => {
                self.slot.assign(original);
                true
            }
            None => false,
        }
    }

    fn hook(&self, fallback: S::Handler) -> CallHook<S::Args, S::Error> {
        let slot: Weak<S> = Arc::downgrade(&self.slot);
        let state = Arc::downgrade(&self.original);
        let processor = Arc::clone(&self.processor);

        Arc::new(move |args: &S::Args| {
            let Some(slot) = slot.upgrade() else {
                return Ok(());
            };
            // A wrapper that outlived its install keeps delegating but stops syncing.
            let installed = captured(&state);
            let target = installed.clone().unwrap_or_else(|| fallback.clone());

            let forwarded = slot.forward(&target, args);
            if installed.is_some() {
                let decoded = slot.decode(args);
                if let Err(err) = processor(&decoded) {
                    LOGGER.error_with(["Error syncing call downstream:".to_string(), err.to_string()]);
                }
            }
            forwarded
        })
    }
}

impl<S: GlobalSlot> Drop for Interceptor<S> {
    fn drop(&mut self) {
        self.uninstall();
    }
}

fn captured<H: Clone>(state: &Weak<Mutex<Option<H>>>) -> Option<H> {
    let state = state.upgrade()?;
    let guard = lock(&state);
    guard.clone()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handler type of [`InMemorySlot`].
pub type TrackingFn = Arc<dyn Fn(&[Value]) -> SyncResult<()> + 'static>;

/// Slot backed by a plain Rust value, for hosts that dispatch tracking calls themselves and for
/// tests.
#[derive(Default)]
pub struct InMemorySlot {
    handler: Mutex<Option<TrackingFn>>,
}

impl InMemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(handler: TrackingFn) -> Self {
        Self {
            handler: Mutex::new(Some(handler)),
        }
    }

    pub fn set(&self, handler: Option<TrackingFn>) {
        *lock(&self.handler) = handler;
    }

    pub fn get(&self) -> Option<TrackingFn> {
        lock(&self.handler).clone()
    }

    /// Invokes whatever handler the slot holds right now, like page code calling the global.
    pub fn call(&self, args: &[Value]) -> SyncResult<()> {
        match self.get() {
            Some(handler) => handler(args),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for InMemorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySlot")
            .field("occupied", &lock(&self.handler).is_some())
            .finish()
    }
}

impl GlobalSlot for InMemorySlot {
    type Handler = TrackingFn;
    type Args = [Value];
    type Error = crate::sync::error::SyncError;

    fn current(&self) -> Option<TrackingFn> {
        self.get()
    }

    fn assign(&self, handler: TrackingFn) {
        self.set(Some(handler));
    }

    fn forward(&self, handler: &TrackingFn, args: &[Value]) -> SyncResult<()> {
        handler(args)
    }

    fn decode(&self, args: &[Value]) -> Vec<Value> {
        args.to_vec()
    }

    fn wrap(&self, hook: CallHook<[Value], Self::Error>) -> SyncResult<TrackingFn> {
        Ok(Arc::new(move |args: &[Value]| hook(args)))
    }
}
