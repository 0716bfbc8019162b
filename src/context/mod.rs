//! Context Tree
//!
//! A context is one node in a tree rooted at [`root()`]. Cancelable and
//! deadline-bound nodes register with their nearest cancelable ancestor so a
//! single cancel call reaches the whole subtree. Value nodes carry one
//! immutable key/value pair and are transparent to cancellation.

mod cancel;
mod deadline;
mod tree;
mod value;

pub use cancel::derive_cancelable;
pub use deadline::{derive_deadline, derive_timeout};
pub use value::derive_value;

use crate::error::CancelError;
use crate::signal::DoneSignal;
use cancel::CancelCtx;
use deadline::DeadlineCtx;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tree::Canceler;
use value::ValueCtx;

/// Value stored under a key. Read back with [`Ctx::value_as`].
pub type Value = Arc<dyn Any + Send + Sync>;

/// Lookup key for request-scoped values. Must be non-empty when attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&'static str> for Key {
    fn from(key: &'static str) -> Self {
        Key(Cow::Borrowed(key))
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key(Cow::Owned(key))
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capabilities every context exposes.
///
/// Implement this for types that should act as a parent without being one
/// of the built-in node kinds; wrap them with [`Ctx::from_external`].
pub trait Context: Send + Sync {
    /// Signal closed on cancellation, or `None` if this context can never
    /// be cancelled.
    fn done(&self) -> Option<DoneSignal>;

    /// Value stored under `key` on this context or its nearest ancestor.
    fn value(&self, key: &Key) -> Option<Value>;

    /// Terminal reason once cancelled.
    fn err(&self) -> Option<CancelError>;

    /// Instant at which this context cancels itself, if any.
    fn deadline(&self) -> Option<Instant>;
}

/// Identity of a cancelable node, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Node kind behind a [`Ctx`] handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxKind {
    Root,
    Cancel,
    Value,
    Deadline,
    External,
}

impl CtxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CtxKind::Root => "root",
            CtxKind::Cancel => "cancel",
            CtxKind::Value => "value",
            CtxKind::Deadline => "deadline",
            CtxKind::External => "external",
        }
    }
}

#[derive(Clone)]
pub(crate) enum Node {
    Root,
    Cancel(Arc<CancelCtx>),
    Value(Arc<ValueCtx>),
    Deadline(Arc<DeadlineCtx>),
    External(Arc<dyn Context>),
}

/// Cheap-to-clone handle to a context node.
#[derive(Clone)]
pub struct Ctx {
    node: Node,
}

/// The terminal context: never cancelled, carries no values, no deadline.
pub fn root() -> Ctx {
    Ctx::root()
}

impl Ctx {
    pub fn root() -> Self {
        Ctx { node: Node::Root }
    }

    /// Adopt a foreign [`Context`] as a parent. Descendants reach it through
    /// a monitor task instead of the registry walk.
    pub fn from_external<C>(ctx: C) -> Self
    where
        C: Context + 'static,
    {
        Ctx {
            node: Node::External(Arc::new(ctx)),
        }
    }

    pub(crate) fn from_node(node: Node) -> Self {
        Ctx { node }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub fn kind(&self) -> CtxKind {
        match self.node {
            Node::Root => CtxKind::Root,
            Node::Cancel(_) => CtxKind::Cancel,
            Node::Value(_) => CtxKind::Value,
            Node::Deadline(_) => CtxKind::Deadline,
            Node::External(_) => CtxKind::External,
        }
    }

    /// Identity of cancelable and deadline-bound nodes.
    pub fn id(&self) -> Option<NodeId> {
        match &self.node {
            Node::Cancel(c) => Some(c.id()),
            Node::Deadline(d) => Some(d.base().id()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Typed lookup: the value under `key`, if present and of type `T`.
    pub fn value_as<T>(&self, key: impl Into<Key>) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.value(&key.into())?.downcast::<T>().ok()
    }
}

impl Context for Ctx {
    fn done(&self) -> Option<DoneSignal> {
        match &self.node {
            Node::Root => None,
            Node::Cancel(c) => Some(c.done_signal()),
            Node::Deadline(d) => Some(d.base().done_signal()),
            Node::Value(v) => v.parent().done(),
            Node::External(e) => e.done(),
        }
    }

    fn value(&self, key: &Key) -> Option<Value> {
        let mut ctx = self;
        loop {
            match &ctx.node {
                Node::Root => return None,
                Node::Value(v) => {
                    if v.key() == key {
                        return Some(v.value());
                    }
                    ctx = v.parent();
                }
                Node::Cancel(c) => ctx = c.parent(),
                Node::Deadline(d) => ctx = d.base().parent(),
                Node::External(e) => return e.value(key),
            }
        }
    }

    fn err(&self) -> Option<CancelError> {
        match &self.node {
            Node::Root => None,
            Node::Cancel(c) => c.err(),
            Node::Deadline(d) => d.base().err(),
            Node::Value(v) => v.parent().err(),
            Node::External(e) => e.err(),
        }
    }

    fn deadline(&self) -> Option<Instant> {
        match &self.node {
            Node::Root => None,
            Node::Cancel(c) => c.parent().deadline(),
            Node::Deadline(d) => Some(d.deadline()),
            Node::Value(v) => v.parent().deadline(),
            Node::External(e) => e.deadline(),
        }
    }
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Ctx");
        out.field("kind", &self.kind().as_str());
        if let Some(id) = self.id() {
            out.field("id", &id.as_u64());
        }
        if let Node::Value(v) = &self.node {
            out.field("key", &v.key().as_str());
        }
        out.field("err", &self.err()).finish()
    }
}

/// Cancels the context it was returned with. Calling it again is a no-op.
#[derive(Clone)]
pub struct CancelFn {
    target: Arc<dyn Canceler>,
}

impl CancelFn {
    pub(crate) fn new(target: Arc<dyn Canceler>) -> Self {
        Self { target }
    }

    pub fn cancel(&self) {
        self.target.cancel(true, CancelError::Canceled);
    }
}

impl fmt::Debug for CancelFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelFn")
            .field("node", &self.target.id().as_u64())
            .finish()
    }
}
