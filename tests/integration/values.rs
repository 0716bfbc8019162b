//! Integration tests for request-scoped value lookup

use ctxtree::{derive_cancelable, derive_timeout, derive_value, root, Context, Key};
use std::time::Duration;

#[test]
fn test_nested_values() {
    let ctx = derive_value(&derive_value(&root(), "k1", "v1"), "k3", "v3");
    assert_eq!(ctx.value_as::<&str>("k1").as_deref(), Some(&"v1"));
    assert_eq!(ctx.value_as::<&str>("k3").as_deref(), Some(&"v3"));
    assert!(ctx.value(&Key::from("missing")).is_none());
}

#[test]
fn test_deeper_key_found_past_other_keys() {
    let base = derive_value(&root(), "k", 3u32);
    let (cancelable, _cancel) = derive_cancelable(&base);
    let (timed, _cancel_timed) = derive_timeout(&cancelable, Duration::from_secs(60));
    let top = derive_value(&timed, "k1", 1u32);

    assert_eq!(top.value_as::<u32>("k").as_deref(), Some(&3));
    assert_eq!(top.value_as::<u32>("k1").as_deref(), Some(&1));
}

#[test]
fn test_values_survive_cancellation() {
    let (parent, cancel) = derive_cancelable(&root());
    let ctx = derive_value(&parent, "user", "alice".to_string());
    cancel.cancel();
    assert!(ctx.is_cancelled());
    assert_eq!(
        ctx.value_as::<String>("user").as_deref().map(String::as_str),
        Some("alice")
    );
}

#[test]
#[should_panic]
fn test_empty_owned_key_rejected() {
    derive_value(&root(), String::new(), 0u8);
}
