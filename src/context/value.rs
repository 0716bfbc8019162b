//! Value-carrying node. Transparent to cancellation and deadlines.

use super::{Ctx, Key, Node, Value};
use std::any::Any;
use std::sync::Arc;

pub(crate) struct ValueCtx {
    parent: Ctx,
    key: Key,
    value: Value,
}

impl ValueCtx {
    pub(super) fn parent(&self) -> &Ctx {
        &self.parent
    }

    pub(super) fn key(&self) -> &Key {
        &self.key
    }

    pub(super) fn value(&self) -> Value {
        self.value.clone()
    }
}

/// Derive a child of `parent` carrying `key` → `value`.
///
/// # Panics
/// Panics if `key` is empty.
pub fn derive_value<K, V>(parent: &Ctx, key: K, value: V) -> Ctx
where
    K: Into<Key>,
    V: Any + Send + Sync,
{
    let key = key.into();
    assert!(!key.is_empty(), "derive_value requires a non-empty key");
    Ctx::from_node(Node::Value(Arc::new(ValueCtx {
        parent: parent.clone(),
        key,
        value: Arc::new(value),
    })))
}
