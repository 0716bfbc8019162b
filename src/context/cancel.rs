//! Cancelable node: owns a lazily created done signal, a terminal error and
//! the registry of dependent cancelable children.

use super::tree::{self, Canceler};
use super::{CancelFn, Ctx, Node, NodeId};
use crate::error::CancelError;
use crate::signal::DoneSignal;
use crate::timer::TimerHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Done signal that is only allocated once someone asks for it.
enum SignalSlot {
    Uninit,
    Open(DoneSignal),
    Closed(DoneSignal),
}

impl SignalSlot {
    fn materialize(&mut self) -> DoneSignal {
        match self {
            SignalSlot::Uninit => {
                let signal = DoneSignal::new();
                *self = SignalSlot::Open(signal.clone());
                signal
            }
            SignalSlot::Open(signal) | SignalSlot::Closed(signal) => signal.clone(),
        }
    }

    fn close(&mut self) {
        *self = match std::mem::replace(self, SignalSlot::Uninit) {
            // Nobody is waiting on a signal that never existed.
            SignalSlot::Uninit => SignalSlot::Closed(DoneSignal::closed_sentinel()),
            SignalSlot::Open(signal) => {
                signal.close();
                SignalSlot::Closed(signal)
            }
            SignalSlot::Closed(_) => unreachable!("done signal closed twice"),
        };
    }
}

struct CancelState {
    err: Option<CancelError>,
    signal: SignalSlot,
    children: HashMap<NodeId, Arc<dyn Canceler>>,
    /// Armed only on deadline-bound nodes.
    timer: Option<TimerHandle>,
}

pub(crate) struct CancelCtx {
    id: NodeId,
    parent: Ctx,
    state: Mutex<CancelState>,
}

impl CancelCtx {
    pub(super) fn new(parent: Ctx) -> Self {
        Self {
            id: NodeId::next(),
            parent,
            state: Mutex::new(CancelState {
                err: None,
                signal: SignalSlot::Uninit,
                children: HashMap::new(),
                timer: None,
            }),
        }
    }

    pub(super) fn id(&self) -> NodeId {
        self.id
    }

    pub(super) fn parent(&self) -> &Ctx {
        &self.parent
    }

    pub(super) fn done_signal(&self) -> DoneSignal {
        self.state.lock().signal.materialize()
    }

    pub(super) fn err(&self) -> Option<CancelError> {
        self.state.lock().err
    }

    /// Set the terminal error, close the signal and cancel every registered
    /// child with the same reason. Later calls are no-ops.
    ///
    /// Children are cancelled without detaching so none of them reaches back
    /// for this node's lock. Detaching this node from its own parent happens
    /// after the lock is released.
    pub(super) fn cancel_node(&self, detach: bool, reason: CancelError) {
        let children = {
            let mut state = self.state.lock();
            if state.err.is_some() {
                return;
            }
            state.err = Some(reason);
            state.signal.close();

            let children = std::mem::take(&mut state.children);
            for child in children.values() {
                child.cancel(false, reason);
            }
            children
        };

        debug!(
            node_id = self.id.as_u64(),
            reason = %reason,
            children = children.len(),
            "Context cancelled"
        );
        drop(children);

        if detach {
            tree::detach(&self.parent, self.id);
        }
    }

    /// Register `child`, or cancel it at once if this node is already cancelled.
    pub(super) fn adopt(&self, child: Arc<dyn Canceler>) {
        let mut state = self.state.lock();
        let err = state.err;
        match err {
            Some(reason) => child.cancel(false, reason),
            None => {
                trace!(
                    node_id = self.id.as_u64(),
                    child_id = child.id().as_u64(),
                    "Child attached"
                );
                state.children.insert(child.id(), child);
            }
        }
    }

    pub(super) fn release(&self, child: NodeId) {
        let removed = self.state.lock().children.remove(&child);
        if removed.is_some() {
            trace!(
                node_id = self.id.as_u64(),
                child_id = child.as_u64(),
                "Child detached"
            );
        }
    }

    /// Store the timer built by `arm` unless the node is already cancelled.
    /// `arm` runs under the node lock so a concurrent cancel cannot miss it.
    pub(super) fn arm_timer_with<F>(&self, arm: F) -> bool
    where
        F: FnOnce() -> TimerHandle,
    {
        let mut state = self.state.lock();
        if state.err.is_some() {
            return false;
        }
        state.timer = Some(arm());
        true
    }

    /// Stop and clear the armed timer, if any.
    pub(super) fn disarm_timer(&self) -> bool {
        let mut state = self.state.lock();
        match state.timer.take() {
            Some(timer) => timer.stop(),
            None => false,
        }
    }

    #[cfg(test)]
    pub(super) fn child_count(&self) -> usize {
        self.state.lock().children.len()
    }

    #[cfg(test)]
    pub(super) fn has_timer(&self) -> bool {
        self.state.lock().timer.is_some()
    }
}

impl Canceler for CancelCtx {
    fn id(&self) -> NodeId {
        self.id
    }

    fn cancel(&self, detach: bool, reason: CancelError) {
        self.cancel_node(detach, reason);
    }

    fn done(&self) -> DoneSignal {
        self.done_signal()
    }
}

/// Derive a child of `parent` that can be cancelled independently and is
/// cancelled whenever `parent` is.
pub fn derive_cancelable(parent: &Ctx) -> (Ctx, CancelFn) {
    let node = Arc::new(CancelCtx::new(parent.clone()));
    tree::attach(parent, node.clone());
    let cancel = CancelFn::new(node.clone());
    (Ctx::from_node(Node::Cancel(node)), cancel)
}
