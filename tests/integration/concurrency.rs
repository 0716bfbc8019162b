//! Integration tests for cancellation racing with derivation and other cancels

use ctxtree::{derive_cancelable, root, CancelError, Context, Ctx};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn chain(depth: usize) -> Vec<(Ctx, ctxtree::CancelFn)> {
    let mut nodes = Vec::with_capacity(depth);
    let mut parent = root();
    for _ in 0..depth {
        let (child, cancel) = derive_cancelable(&parent);
        parent = child.clone();
        nodes.push((child, cancel));
    }
    nodes
}

#[test]
fn test_concurrent_cancels_on_one_chain_converge() {
    for _ in 0..20 {
        let nodes = Arc::new(chain(32));
        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = [0usize, 8, 16, 31]
            .into_iter()
            .map(|level| {
                let nodes = Arc::clone(&nodes);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    nodes[level].1.cancel();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for (ctx, _) in nodes.iter() {
            assert_eq!(ctx.err(), Some(CancelError::Canceled));
            assert!(ctx.done().unwrap().is_closed());
        }
    }
}

#[test]
fn test_derive_racing_with_cancel_never_leaves_live_child() {
    for _ in 0..20 {
        let (parent, cancel) = derive_cancelable(&root());
        let barrier = Arc::new(Barrier::new(5));

        let derivers: Vec<_> = (0..4)
            .map(|_| {
                let parent = parent.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    (0..50)
                        .map(|_| derive_cancelable(&parent))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        barrier.wait();
        cancel.cancel();

        for deriver in derivers {
            for (child, _) in deriver.join().unwrap() {
                assert!(
                    child.done().unwrap().wait_timeout(Duration::from_secs(2)),
                    "child derived under a cancelled parent stayed open"
                );
                assert_eq!(child.err(), Some(CancelError::Canceled));
            }
        }
    }
}

#[test]
fn test_child_cancel_racing_parent_cancel() {
    for _ in 0..50 {
        let (parent, cancel_parent) = derive_cancelable(&root());
        let children: Vec<_> = (0..16).map(|_| derive_cancelable(&parent)).collect();
        let children = Arc::new(children);

        let child_side = {
            let children = Arc::clone(&children);
            thread::spawn(move || {
                for (_, cancel) in children.iter() {
                    cancel.cancel();
                }
            })
        };
        cancel_parent.cancel();
        child_side.join().unwrap();

        assert_eq!(parent.err(), Some(CancelError::Canceled));
        for (child, _) in children.iter() {
            assert_eq!(child.err(), Some(CancelError::Canceled));
        }
    }
}

#[test]
fn test_many_waiters_observe_one_cancel() {
    let (ctx, cancel) = derive_cancelable(&root());
    let waiters: Vec<_> = (0..16)
        .map(|_| {
            let ctx = ctx.clone();
            thread::spawn(move || {
                ctx.done().unwrap().wait();
                ctx.err()
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(10));
    cancel.cancel();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Some(CancelError::Canceled));
    }
}
