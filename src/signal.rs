//! Done Signal
//!
//! One-shot broadcast used by contexts to announce cancellation. A signal
//! starts open and is closed exactly once; any number of threads or tasks
//! may observe it, either blocking or by awaiting.

use futures::future::{self, Either};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

struct SignalState {
    closed: AtomicBool,
    /// Guards the condvar handshake for blocking waiters.
    lock: Mutex<()>,
    cond: Condvar,
    /// Wakes async waiters.
    notify: Notify,
}

/// Handle to a one-shot done signal. Clones observe the same signal.
#[derive(Clone)]
pub struct DoneSignal {
    inner: Arc<SignalState>,
}

static CLOSED_SENTINEL: OnceLock<DoneSignal> = OnceLock::new();

/// Owning side of a signal created with [`channel`]. Firing consumes it, so
/// a signal handed out this way is closed at most once.
#[derive(Debug)]
pub struct DoneTrigger {
    signal: DoneSignal,
}

impl DoneTrigger {
    pub fn fire(self) {
        self.signal.close();
    }
}

/// A fresh open signal plus the trigger that closes it. Intended for
/// [`Context`](crate::context::Context) implementations outside this crate.
pub fn channel() -> (DoneTrigger, DoneSignal) {
    let signal = DoneSignal::new();
    (
        DoneTrigger {
            signal: signal.clone(),
        },
        signal,
    )
}

/// Which of two signals closed first in [`wait_either`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum First {
    Left,
    Right,
}

impl DoneSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(SignalState {
                closed: AtomicBool::new(false),
                lock: Mutex::new(()),
                cond: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// The process-wide signal that is already closed.
    ///
    /// Recorded by contexts that get cancelled before anyone asked for their
    /// signal, so later observers see "closed" without a fresh allocation.
    pub fn closed_sentinel() -> Self {
        CLOSED_SENTINEL
            .get_or_init(|| {
                let signal = DoneSignal::new();
                signal.close();
                signal
            })
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the signal and wake every waiter.
    ///
    /// # Panics
    /// Panics if the signal was already closed.
    pub(crate) fn close(&self) {
        {
            let _guard = self.inner.lock.lock();
            let was_closed = self.inner.closed.swap(true, Ordering::AcqRel);
            assert!(!was_closed, "close of closed done signal");
            self.inner.cond.notify_all();
        }
        self.inner.notify.notify_waiters();
    }

    /// Block the current thread until the signal closes.
    pub fn wait(&self) {
        if self.is_closed() {
            return;
        }
        let mut guard = self.inner.lock.lock();
        while !self.is_closed() {
            self.inner.cond.wait(&mut guard);
        }
    }

    /// Block for at most `timeout`. Returns true if the signal is closed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_closed() {
            return true;
        }
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };
        let mut guard = self.inner.lock.lock();
        while !self.is_closed() {
            if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                return self.is_closed();
            }
        }
        true
    }

    /// Resolve once the signal closes. Does not depend on a particular runtime.
    pub async fn closed(&self) {
        loop {
            let mut notified = pin!(self.inner.notify.notified());
            // Register before checking the flag so a concurrent close cannot slip between.
            notified.as_mut().enable();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }

    /// True if both handles refer to the same underlying signal.
    pub fn ptr_eq(&self, other: &DoneSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DoneSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoneSignal")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Resolve when either signal closes, reporting which one did.
pub async fn wait_either(left: &DoneSignal, right: &DoneSignal) -> First {
    let left = pin!(left.closed());
    let right = pin!(right.closed());
    match future::select(left, right).await {
        Either::Left(_) => First::Left,
        Either::Right(_) => First::Right,
    }
}
