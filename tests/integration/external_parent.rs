//! Integration tests for parents implemented outside the crate

use ctxtree::{
    channel, derive_cancelable, derive_timeout, derive_value, CancelError, Context, Ctx,
    DoneSignal, DoneTrigger, Key, Value,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A context with its own signal, cancelled by calling `shutdown`.
struct Shutdown {
    signal: DoneSignal,
    trigger: Mutex<Option<DoneTrigger>>,
    err: Mutex<Option<CancelError>>,
}

impl Shutdown {
    fn new() -> Arc<Self> {
        let (trigger, signal) = channel();
        Arc::new(Self {
            signal,
            trigger: Mutex::new(Some(trigger)),
            err: Mutex::new(None),
        })
    }

    fn shutdown(&self) {
        if let Some(trigger) = self.trigger.lock().take() {
            *self.err.lock() = Some(CancelError::Canceled);
            trigger.fire();
        }
    }
}

impl Context for Shutdown {
    fn done(&self) -> Option<DoneSignal> {
        Some(self.signal.clone())
    }

    fn value(&self, key: &Key) -> Option<Value> {
        if key.as_str() == "service" {
            Some(Arc::new("billing"))
        } else {
            None
        }
    }

    fn err(&self) -> Option<CancelError> {
        *self.err.lock()
    }

    fn deadline(&self) -> Option<Instant> {
        None
    }
}

/// Forwards through an `Arc` so the test keeps a handle on the parent.
struct Shared(Arc<Shutdown>);

impl Context for Shared {
    fn done(&self) -> Option<DoneSignal> {
        self.0.done()
    }

    fn value(&self, key: &Key) -> Option<Value> {
        self.0.value(key)
    }

    fn err(&self) -> Option<CancelError> {
        self.0.err()
    }

    fn deadline(&self) -> Option<Instant> {
        self.0.deadline()
    }
}

#[test]
fn test_external_parent_cancellation_is_forwarded() {
    let parent = Shutdown::new();
    let ctx = Ctx::from_external(Shared(Arc::clone(&parent)));
    let (child, _cancel) = derive_cancelable(&ctx);
    let (grandchild, _) = derive_cancelable(&child);

    assert!(child.err().is_none());
    parent.shutdown();

    assert!(grandchild
        .done()
        .unwrap()
        .wait_timeout(Duration::from_secs(2)));
    assert_eq!(child.err(), Some(CancelError::Canceled));
    assert_eq!(grandchild.err(), Some(CancelError::Canceled));
}

#[test]
fn test_child_cancelled_first_leaves_external_parent_alone() {
    let parent = Shutdown::new();
    let ctx = Ctx::from_external(Shared(Arc::clone(&parent)));
    let (child, cancel) = derive_cancelable(&ctx);

    cancel.cancel();
    assert_eq!(child.err(), Some(CancelError::Canceled));
    assert!(parent.err().is_none());

    // The monitor has already exited; shutting the parent down later is harmless.
    parent.shutdown();
    assert_eq!(child.err(), Some(CancelError::Canceled));
}

#[test]
fn test_already_cancelled_external_parent() {
    let parent = Shutdown::new();
    parent.shutdown();
    let (child, _cancel) = derive_cancelable(&Ctx::from_external(Shared(parent)));

    assert!(child.done().unwrap().wait_timeout(Duration::from_secs(2)));
    assert_eq!(child.err(), Some(CancelError::Canceled));
}

#[test]
fn test_values_resolve_through_external_parent() {
    let ctx = Ctx::from_external(Shared(Shutdown::new()));
    let (child, _cancel) = derive_cancelable(&derive_value(&ctx, "tenant", 7u32));

    assert_eq!(child.value_as::<u32>("tenant").as_deref(), Some(&7));
    assert_eq!(child.value_as::<&str>("service").as_deref(), Some(&"billing"));
    assert!(child.value(&Key::from("missing")).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_parent_under_tokio() {
    let parent = Shutdown::new();
    let ctx = Ctx::from_external(Shared(Arc::clone(&parent)));
    let (child, _cancel) = derive_timeout(&ctx, Duration::from_secs(60));

    parent.shutdown();
    let done = child.done().unwrap();
    tokio::time::timeout(Duration::from_secs(2), done.closed())
        .await
        .expect("monitor task should forward cancellation");
    assert_eq!(child.err(), Some(CancelError::Canceled));
}

#[tokio::test]
async fn test_external_parent_under_current_thread_runtime() {
    let parent = Shutdown::new();
    let ctx = Ctx::from_external(Shared(Arc::clone(&parent)));
    let (child, _cancel) = derive_cancelable(&ctx);

    parent.shutdown();
    tokio::time::timeout(Duration::from_secs(2), child.done().unwrap().closed())
        .await
        .expect("cancellation should reach the child without blocking the runtime");
    assert_eq!(child.err(), Some(CancelError::Canceled));
}

#[test]
fn test_forwarding_outlives_the_deriving_runtime() {
    let parent = Shutdown::new();
    let ctx = Ctx::from_external(Shared(Arc::clone(&parent)));

    let rt = tokio::runtime::Runtime::new().unwrap();
    let (child, _cancel) = rt.block_on(async { derive_cancelable(&ctx) });
    drop(rt);

    parent.shutdown();
    assert!(child.done().unwrap().wait_timeout(Duration::from_secs(2)));
    assert_eq!(child.err(), Some(CancelError::Canceled));
}
