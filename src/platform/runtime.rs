//! Cancellable timers.
//!
//! Browser builds schedule through `setTimeout`/`setInterval` (via `gloo-timers`); everything
//! else, including the test-suite, drives a [`ManualScheduler`] whose clock only moves when the
//! host calls [`ManualScheduler::advance`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Callback run by a scheduler. Browser callbacks run on the page's single thread, so tasks are
/// not required to be `Send`.
pub type Task = Arc<dyn Fn() + 'static>;

/// Shortest period accepted for repeating tasks.
const MIN_PERIOD: Duration = Duration::from_millis(1);

pub trait Scheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle;

    fn schedule_repeating(&self, period: Duration, task: Task) -> TaskHandle;
}

/// Disposal handle for a scheduled task. Dropping the handle cancels the task.
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    on_cancel: Option<Box<dyn FnOnce() + 'static>>,
}

impl TaskHandle {
    fn new(cancelled: Arc<AtomicBool>, on_cancel: Option<Box<dyn FnOnce() + 'static>>) -> Self {
        Self {
            cancelled,
            on_cancel,
        }
    }

    pub fn cancel(mut self) {
        self.release();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn release(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Deterministic scheduler with a virtual clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    entries: Vec<ManualEntry>,
}

struct ManualEntry {
    id: u64,
    due: Duration,
    period: Option<Duration>,
    task: Task,
    cancelled: Arc<AtomicBool>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of tasks that are still armed.
    pub fn pending(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| !entry.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Moves the clock forward by `by`, running every task that falls due in deadline order.
    /// Returns how many task invocations happened.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().now + by;
        let mut fired = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            fired += 1;
        }
        self.lock().now = target;
        fired
    }

    fn pop_due(&self, target: Duration) -> Option<Task> {
        let mut state = self.lock();
        state
            .entries
            .retain(|entry| !entry.cancelled.load(Ordering::SeqCst));
        let index = state
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= target)
            .min_by_key(|(_, entry)| (entry.due, entry.id))
            .map(|(index, _)| index)?;

        let due = state.entries[index].due;
        state.now = due;
        let task = Arc::clone(&state.entries[index].task);
        match state.entries[index].period {
            Some(period) => state.entries[index].due = due + period,
            None => {
                state.entries.swap_remove(index);
            }
        }
        Some(task)
    }

    fn insert(&self, delay: Duration, period: Option<Duration>, task: Task) -> TaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.entries.push(ManualEntry {
            id,
            due,
            period,
            task,
            cancelled: Arc::clone(&cancelled),
        });
        TaskHandle::new(cancelled, None)
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle {
        self.insert(delay, None, task)
    }

    fn schedule_repeating(&self, period: Duration, task: Task) -> TaskHandle {
        let period = period.max(MIN_PERIOD);
        self.insert(period, Some(period), task)
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .finish()
    }
}

/// Scheduler backed by the browser's timer queue.
#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
#[derive(Clone, Copy, Debug, Default)]
pub struct TimerScheduler;

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
impl Scheduler for TimerScheduler {
    fn schedule_once(&self, delay: Duration, task: Task) -> TaskHandle {
        use gloo_timers::callback::Timeout;

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let timeout = Timeout::new(millis(delay), move || {
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });
        TaskHandle::new(cancelled, Some(Box::new(move || drop(timeout))))
    }

    fn schedule_repeating(&self, period: Duration, task: Task) -> TaskHandle {
        use gloo_timers::callback::Interval;

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let interval = Interval::new(millis(period.max(MIN_PERIOD)), move || {
            if !flag.load(Ordering::SeqCst) {
                task();
            }
        });
        TaskHandle::new(cancelled, Some(Box::new(move || drop(interval))))
    }
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |label: &'static str| {
            let sink = Rc::clone(&sink);
            Arc::new(move || sink.borrow_mut().push(label)) as Task
        };
        (log, make)
    }

    #[test]
    fn tasks_fire_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();
        let _late = scheduler.schedule_once(Duration::from_millis(30), task("late"));
        let _early = scheduler.schedule_once(Duration::from_millis(10), task("early"));
        let _tick = scheduler.schedule_repeating(Duration::from_millis(20), task("tick"));

        assert_eq!(scheduler.advance(Duration::from_millis(45)), 4);
        assert_eq!(*log.borrow(), ["early", "tick", "late", "tick"]);
        assert_eq!(scheduler.now(), Duration::from_millis(45));
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let scheduler = ManualScheduler::new();
        let (log, task) = recorder();
        let once = scheduler.schedule_once(Duration::from_millis(5), task("once"));
        let tick = scheduler.schedule_repeating(Duration::from_millis(5), task("tick"));

        scheduler.advance(Duration::from_millis(5));
        once.cancel();
        drop(tick);

        assert_eq!(scheduler.advance(Duration::from_secs(60)), 0);
        assert_eq!(*log.borrow(), ["once", "tick"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn tasks_may_schedule_more_work() {
        let scheduler = ManualScheduler::new();
        let hits = Rc::new(RefCell::new(0));
        let handles = Rc::new(RefCell::new(Vec::new()));

        let nested_hits = Rc::clone(&hits);
        let nested_scheduler = scheduler.clone();
        let nested_handles = Rc::clone(&handles);
        let _outer = scheduler.schedule_once(
            Duration::from_millis(1),
            Arc::new(move || {
                let hits = Rc::clone(&nested_hits);
                let handle = nested_scheduler.schedule_once(
                    Duration::from_millis(1),
                    Arc::new(move || *hits.borrow_mut() += 1),
                );
                nested_handles.borrow_mut().push(handle);
            }),
        );

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(*hits.borrow(), 1);
    }
}
