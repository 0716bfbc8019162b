//! Integration tests for the ctxtree cancellation tree

mod concurrency;
mod deadlines;
mod external_parent;
mod values;
