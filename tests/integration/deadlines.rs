//! Integration tests for deadline-bound contexts

use ctxtree::{derive_deadline, derive_timeout, root, CancelError, Context, CtxKind};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_past_deadline_is_observable_without_waiting() {
    let (ctx, _cancel) = derive_deadline(&root(), Instant::now() - Duration::from_millis(1));
    assert!(ctx.done().unwrap().is_closed());
    assert_eq!(ctx.err(), Some(CancelError::DeadlineExceeded));
}

#[test]
fn test_deadline_fires_without_manual_cancel() {
    let started = Instant::now();
    let (ctx, _cancel) = derive_timeout(&root(), Duration::from_millis(30));

    ctx.done().unwrap().wait();

    assert!(started.elapsed() >= Duration::from_millis(30));
    assert_eq!(ctx.err(), Some(CancelError::DeadlineExceeded));
}

#[test]
fn test_manual_cancel_before_deadline_wins() {
    let (ctx, cancel) = derive_timeout(&root(), Duration::from_millis(30));
    thread::sleep(Duration::from_millis(10));
    cancel.cancel();
    assert_eq!(ctx.err(), Some(CancelError::Canceled));

    thread::sleep(Duration::from_millis(60));
    assert_eq!(ctx.err(), Some(CancelError::Canceled));
}

#[test]
fn test_deadline_reported_by_node() {
    let at = Instant::now() + Duration::from_secs(30);
    let (ctx, cancel) = derive_deadline(&root(), at);
    assert_eq!(ctx.kind(), CtxKind::Deadline);
    assert_eq!(ctx.deadline(), Some(at));
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_waiter_observes_timeout() {
    let (ctx, _cancel) = derive_timeout(&root(), Duration::from_millis(20));
    let done = ctx.done().unwrap();
    tokio::time::timeout(Duration::from_secs(2), done.closed())
        .await
        .unwrap();
    assert_eq!(ctx.err(), Some(CancelError::DeadlineExceeded));
}
