//! Deferred and periodic work that runs back inside its session.
//!
//! The host supplies the timer facility through [`Scheduler`]. Callbacks
//! fired by the scheduler re-enter their originating session through
//! [`Session::run`], so failures are isolated like inbound requests.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::HandlerError;
use crate::session::Session;

/// Identifies a scheduled task for cancellation.
pub type TaskId = u64;

/// A one-shot callback handed to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send>;

/// Host timer facility.
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> TaskId;
    /// Cancel a pending task. Returns `false` if it already ran or was
    /// never scheduled.
    fn cancel(&self, id: TaskId) -> bool;
}

// ══════════════════════════════════════════════════════════════════════════════
// Manual scheduler
// ══════════════════════════════════════════════════════════════════════════════

/// Scheduler driven by a virtual clock.
///
/// Nothing runs until [`advance`](Self::advance) moves the clock past a
/// task's due time. Tasks due at the same instant run in scheduling order.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: TaskId,
    pending: BTreeMap<(Duration, TaskId), Task>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Move the clock forward, running every task that falls due, including
    /// tasks scheduled by tasks that ran. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut ran = 0;
        loop {
            let task = {
                let mut state = self.state.lock();
                let next_due = state.pending.first_key_value().map(|(&(due, _), _)| due);
                match next_due {
                    Some(due) if due <= target => {
                        state.now = due;
                        state.pending.pop_first().map(|(_, task)| task)
                    }
                    _ => None,
                }
            };
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        self.state.lock().now = target;
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + delay;
        state.pending.insert((due, id), task);
        id
    }

    fn cancel(&self, id: TaskId) -> bool {
        let mut state = self.state.lock();
        let key = state.pending.keys().find(|(_, task)| *task == id).copied();
        match key {
            Some(key) => state.pending.remove(&key).is_some(),
            None => false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Debouncer
// ══════════════════════════════════════════════════════════════════════════════

type Call = Box<dyn FnOnce() -> Result<(), HandlerError> + Send>;

/// Collapses bursts of calls into one.
///
/// The first call of an idle window schedules a run after the window; calls
/// arriving before it fires replace the pending call without moving the
/// deadline. Only the latest call runs.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebounceShared>,
}

struct DebounceShared {
    session: Session,
    scheduler: Arc<dyn Scheduler>,
    window: Duration,
    pending: Mutex<Option<Call>>,
}

impl Debouncer {
    /// Debounce with the session's configured window.
    pub fn new(session: &Session, scheduler: Arc<dyn Scheduler>) -> Self {
        let window = session.config().debounce_window();
        Self::with_window(session, scheduler, window)
    }

    pub fn with_window(session: &Session, scheduler: Arc<dyn Scheduler>, window: Duration) -> Self {
        Debouncer {
            inner: Arc::new(DebounceShared {
                session: session.clone(),
                scheduler,
                window,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Whether a call is waiting for the window to close.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    pub fn call<F>(&self, f: F)
    where
        F: FnOnce() -> Result<(), HandlerError> + Send + 'static,
    {
        let replaced = self.inner.pending.lock().replace(Box::new(f)).is_some();
        if replaced {
            return;
        }
        let shared = Arc::clone(&self.inner);
        self.inner.scheduler.schedule(
            self.inner.window,
            Box::new(move || {
                let Some(call) = shared.pending.lock().take() else {
                    return;
                };
                shared.session.run(call);
            }),
        );
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Periodic task
// ══════════════════════════════════════════════════════════════════════════════

type Tick = dyn Fn() -> Result<(), HandlerError> + Send + Sync;

/// Runs a callback every period inside its session until cleared.
///
/// A tick that fires after [`clear`](Self::clear), or once the session is
/// closed, does nothing and does not reschedule. Dropping every handle stops
/// the task as well.
#[derive(Clone)]
pub struct PeriodicTask {
    inner: Arc<PeriodicShared>,
}

struct PeriodicShared {
    session: Session,
    scheduler: Arc<dyn Scheduler>,
    period: Duration,
    tick: Box<Tick>,
    timer: Mutex<TimerState>,
}

#[derive(Default)]
struct TimerState {
    handle: Option<TaskId>,
    cleared: bool,
}

impl PeriodicTask {
    /// Create a stopped task; call [`start`](Self::start) to run it.
    pub fn new<F>(session: &Session, scheduler: Arc<dyn Scheduler>, period: Duration, tick: F) -> Self
    where
        F: Fn() -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        PeriodicTask {
            inner: Arc::new(PeriodicShared {
                session: session.clone(),
                scheduler,
                period,
                tick: Box::new(tick),
                timer: Mutex::new(TimerState::default()),
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    pub fn is_cleared(&self) -> bool {
        self.inner.timer.lock().cleared
    }

    /// Schedule the next tick one period from now, replacing a pending one.
    pub fn start(&self) -> &Self {
        self.inner.timer.lock().cleared = false;
        PeriodicShared::arm(&self.inner);
        self
    }

    /// Stop ticking and cancel the pending tick.
    pub fn clear(&self) {
        let handle = {
            let mut timer = self.inner.timer.lock();
            timer.cleared = true;
            timer.handle.take()
        };
        if let Some(handle) = handle {
            self.inner.scheduler.cancel(handle);
        }
    }

    /// Cancel the pending tick and start a fresh period.
    pub fn reset(&self) {
        self.start();
    }
}

impl PeriodicShared {
    /// Schedule the next tick, replacing any pending one.
    fn arm(this: &Arc<Self>) {
        let pending = this.timer.lock().handle.take();
        if let Some(pending) = pending {
            this.scheduler.cancel(pending);
        }
        let weak: Weak<Self> = Arc::downgrade(this);
        let handle = this.scheduler.schedule(
            this.period,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    PeriodicShared::fire(&shared);
                }
            }),
        );
        this.timer.lock().handle = Some(handle);
    }

    fn fire(this: &Arc<Self>) {
        {
            let mut timer = this.timer.lock();
            timer.handle = None;
            if timer.cleared {
                return;
            }
        }
        if this.session.is_closed() {
            tracing::debug!(session = this.session.id(), "session closed, periodic task stopped");
            return;
        }
        this.session.run(|| (this.tick)());
        // The tick may have cleared, reset or restarted the task itself.
        let rearm = {
            let timer = this.timer.lock();
            !timer.cleared && timer.handle.is_none()
        };
        if rearm {
            PeriodicShared::arm(this);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Task {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(value))
    }

    #[test]
    fn manual_scheduler_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.schedule(Duration::from_millis(20), push(&log, 2));
        scheduler.schedule(Duration::from_millis(10), push(&log, 1));
        scheduler.schedule(Duration::from_millis(20), push(&log, 3));

        assert_eq!(scheduler.advance(Duration::from_millis(15)), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(5)), 2);
        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
    }

    #[test]
    fn cancelled_task_never_runs() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = scheduler.schedule(Duration::from_millis(5), push(&log, 1));

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.advance(Duration::from_millis(10)), 0);
        assert!(log.lock().is_empty());
    }
}
