//! ctxtree: Cancellation Trees
//!
//! Linked execution contexts that let a caller cancel a whole subtree of
//! dependent work with one call, attach deadlines that cancel automatically,
//! and carry immutable request-scoped values down to descendants.
//!
//! ```
//! use ctxtree::{derive_cancelable, root, CancelError, Context};
//!
//! let (parent, cancel) = derive_cancelable(&root());
//! let (child, _cancel_child) = derive_cancelable(&parent);
//! cancel.cancel();
//! assert!(child.done().unwrap().is_closed());
//! assert_eq!(child.err(), Some(CancelError::Canceled));
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod logging;
pub mod signal;
pub mod timer;

pub use context::{
    derive_cancelable, derive_deadline, derive_timeout, derive_value, root, CancelFn, Context,
    Ctx, CtxKind, Key, NodeId, Value,
};
pub use error::{CancelError, CtxTreeError};
pub use signal::{channel, DoneSignal, DoneTrigger};
