//! Deadline-bound node: a cancelable node that cancels itself with
//! [`CancelError::DeadlineExceeded`] once its deadline passes.

use super::cancel::{derive_cancelable, CancelCtx};
use super::tree::{self, Canceler};
use super::{CancelFn, Context, Ctx, Node, NodeId};
use crate::error::CancelError;
use crate::signal::DoneSignal;
use crate::timer::TimerService;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub(crate) struct DeadlineCtx {
    base: CancelCtx,
    deadline: Instant,
}

impl DeadlineCtx {
    pub(super) fn base(&self) -> &CancelCtx {
        &self.base
    }

    pub(super) fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The base node was never attached on its own; this node was. Detach
    /// is therefore issued here, against this node's parent.
    fn cancel_node(&self, detach: bool, reason: CancelError) {
        self.base.cancel_node(false, reason);
        if detach {
            tree::detach(self.base.parent(), self.base.id());
        }
        if self.base.disarm_timer() {
            debug!(node_id = self.base.id().as_u64(), "Deadline timer disarmed");
        }
    }
}

impl Canceler for DeadlineCtx {
    fn id(&self) -> NodeId {
        self.base.id()
    }

    fn cancel(&self, detach: bool, reason: CancelError) {
        self.cancel_node(detach, reason);
    }

    fn done(&self) -> DoneSignal {
        self.base.done_signal()
    }
}

/// Derive a child of `parent` that is cancelled automatically at `at`.
///
/// If `parent` already has a deadline no later than `at`, the parent will
/// cancel the child in time and a plain cancelable node is returned.
pub fn derive_deadline(parent: &Ctx, at: Instant) -> (Ctx, CancelFn) {
    if let Some(current) = parent.deadline() {
        if current <= at {
            return derive_cancelable(parent);
        }
    }

    let node = Arc::new(DeadlineCtx {
        base: CancelCtx::new(parent.clone()),
        deadline: at,
    });
    tree::attach(parent, node.clone());
    let cancel = CancelFn::new(node.clone());

    let remaining = at.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        node.cancel_node(true, CancelError::DeadlineExceeded);
        return (Ctx::from_node(Node::Deadline(node)), cancel);
    }

    let armed = node.base.arm_timer_with(|| {
        let target = node.clone();
        TimerService::global().schedule(remaining, move || {
            target.cancel_node(true, CancelError::DeadlineExceeded);
        })
    });
    if armed {
        debug!(
            node_id = node.base.id().as_u64(),
            remaining_ms = remaining.as_millis() as u64,
            "Deadline armed"
        );
    }

    (Ctx::from_node(Node::Deadline(node)), cancel)
}

/// Shorthand for `derive_deadline(parent, now + timeout)`. A timeout too
/// large to represent never fires.
pub fn derive_timeout(parent: &Ctx, timeout: Duration) -> (Ctx, CancelFn) {
    match Instant::now().checked_add(timeout) {
        Some(at) => derive_deadline(parent, at),
        None => derive_cancelable(parent),
    }
}
