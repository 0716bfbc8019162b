//! Timer Service
//!
//! Schedules callbacks to run after a delay on a dedicated thread. Deadline
//! contexts arm one timer each and stop it when cancelled early.

use crate::error::CtxTreeError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{error, trace};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Identifier of a scheduled timer, unique per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

struct TimerQueue {
    /// Armed callbacks in firing order. Stopping removes the entry.
    armed: BTreeMap<(Instant, TimerId), Callback>,
    next_id: u64,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<TimerQueue>,
    cond: Condvar,
}

/// A background thread firing scheduled callbacks in deadline order.
pub struct TimerService {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

static GLOBAL: OnceLock<TimerService> = OnceLock::new();

impl TimerService {
    /// Start a service whose worker thread carries `name`.
    pub fn start(name: &str) -> Result<Self, CtxTreeError> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(TimerQueue {
                armed: BTreeMap::new(),
                next_id: 1,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });

        let worker = shared.clone();
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(worker))
            .map_err(|e| CtxTreeError::Timer(format!("failed to spawn {}: {}", name, e)))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// The process-wide service used by deadline contexts.
    ///
    /// # Panics
    /// Panics if the timer thread cannot be spawned on first use.
    pub fn global() -> &'static TimerService {
        GLOBAL.get_or_init(|| {
            TimerService::start("ctxtree-timer")
                .unwrap_or_else(|e| panic!("cannot start global timer service: {}", e))
        })
    }

    /// Run `callback` on the timer thread once `after` has elapsed.
    ///
    /// A delay too large to represent never elapses; the callback is dropped
    /// and the returned handle is already inert.
    pub fn schedule<F>(&self, after: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let at = Instant::now().checked_add(after);
        let id = {
            let mut queue = self.shared.queue.lock();
            let id = TimerId(queue.next_id);
            queue.next_id += 1;
            if let Some(at) = at {
                queue.armed.insert((at, id), Box::new(callback));
            }
            id
        };

        match at {
            Some(_) => {
                self.shared.cond.notify_one();
                trace!(timer_id = id.as_u64(), after_ms = after.as_millis() as u64, "Timer armed");
            }
            None => trace!(timer_id = id.as_u64(), "Timer delay out of range; never fires"),
        }

        TimerHandle {
            id,
            at,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of timers still armed.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().armed.len()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.cond.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != std::thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

/// Handle to one scheduled callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    id: TimerId,
    /// `None` for a timer that was never armed.
    at: Option<Instant>,
    shared: Weak<Shared>,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Disarm the timer. Returns true if this call prevented the callback
    /// from running; false if it already ran, was already stopped, or the
    /// service is gone.
    pub fn stop(&self) -> bool {
        let Some(at) = self.at else {
            return false;
        };
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        // Dropped after the queue lock is released.
        let callback = shared.queue.lock().armed.remove(&(at, self.id));
        let stopped = callback.is_some();
        if stopped {
            trace!(timer_id = self.id.as_u64(), "Timer stopped");
        }
        stopped
    }
}

fn run(shared: Arc<Shared>) {
    let mut queue = shared.queue.lock();
    loop {
        if queue.shutdown {
            break;
        }
        let next = queue.armed.first_key_value().map(|(key, _)| *key);
        match next {
            None => shared.cond.wait(&mut queue),
            Some((at, id)) if at <= Instant::now() => {
                if let Some(callback) = queue.armed.remove(&(at, id)) {
                    fire(&mut queue, id, callback);
                }
            }
            Some((at, _)) => {
                shared.cond.wait_until(&mut queue, at);
            }
        }
    }
}

/// Callbacks run without the queue lock so they may stop other timers.
fn fire(queue: &mut MutexGuard<'_, TimerQueue>, id: TimerId, callback: Callback) {
    MutexGuard::unlocked(queue, || {
        trace!(timer_id = id.as_u64(), "Timer fired");
        if catch_unwind(AssertUnwindSafe(callback)).is_err() {
            error!(timer_id = id.as_u64(), "Timer callback panicked");
        }
    });
}
