//! Tree maintenance: registering cancelable nodes with their nearest
//! cancelable ancestor and removing them again on explicit cancellation.
//!
//! Lock order is strictly downward: an ancestor may hold its own lock while
//! cancelling a child, but no node ever takes another node's lock while
//! holding its own on the way up. Detaching happens after the child has
//! released its lock.

use super::cancel::CancelCtx;
use super::{Context, Ctx, Node, NodeId};
use crate::error::CancelError;
use crate::signal::{wait_either, DoneSignal, First};
use std::sync::Arc;
use tracing::{debug, trace};

/// A node that can receive a forwarded cancellation.
pub(crate) trait Canceler: Send + Sync {
    fn id(&self) -> NodeId;

    fn cancel(&self, detach: bool, reason: CancelError);

    fn done(&self) -> DoneSignal;
}

/// Walk up through value nodes to the nearest cancelable or deadline-bound node.
pub(super) fn nearest_cancel_ancestor(mut ctx: &Ctx) -> Option<&CancelCtx> {
    loop {
        match ctx.node() {
            Node::Cancel(c) => return Some(c),
            Node::Deadline(d) => return Some(d.base()),
            Node::Value(v) => ctx = v.parent(),
            Node::Root | Node::External(_) => return None,
        }
    }
}

/// Register `child` so that cancelling `parent` reaches it.
pub(super) fn attach(parent: &Ctx, child: Arc<dyn Canceler>) {
    let Some(parent_done) = parent.done() else {
        trace!(node_id = child.id().as_u64(), "Parent never cancels; nothing to attach");
        return;
    };

    match nearest_cancel_ancestor(parent) {
        Some(ancestor) => ancestor.adopt(child),
        None => spawn_monitor(parent.clone(), parent_done, child),
    }
}

/// Remove `child` from the registry of the nearest cancelable ancestor of `parent`.
pub(super) fn detach(parent: &Ctx, child: NodeId) {
    if let Some(ancestor) = nearest_cancel_ancestor(parent) {
        ancestor.release(child);
    }
}

/// Forward cancellation across an opaque parent by waiting on both signals.
///
/// The waiter runs on its own thread so it cannot be dropped with an async
/// runtime the child outlives. It lives until either side is cancelled.
fn spawn_monitor(parent: Ctx, parent_done: DoneSignal, child: Arc<dyn Canceler>) {
    let child_id = child.id();
    let child_done = child.done();
    let watch = async move {
        match wait_either(&parent_done, &child_done).await {
            First::Left => {
                let reason = parent.err().unwrap_or_else(|| {
                    panic!("parent context signalled done without a cancellation reason")
                });
                debug!(node_id = child_id.as_u64(), reason = %reason, "Monitor forwarding cancellation");
                child.cancel(false, reason);
            }
            First::Right => {
                trace!(node_id = child_id.as_u64(), "Monitored child cancelled first");
            }
        }
    };

    debug!(node_id = child_id.as_u64(), "Spawning monitor thread");
    std::thread::Builder::new()
        .name(format!("ctxtree-monitor-{}", child_id.as_u64()))
        .spawn(move || futures::executor::block_on(watch))
        .unwrap_or_else(|e| panic!("cannot spawn context monitor thread: {}", e));
}
