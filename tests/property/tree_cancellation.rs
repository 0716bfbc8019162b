//! Property tests: cancelling one node reaches exactly its subtree

use ctxtree::{
    derive_cancelable, derive_timeout, derive_value, root, CancelError, CancelFn, Context, Ctx,
};
use proptest::prelude::*;
use proptest::sample::Index;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Cancelable,
    Value,
    Timeout,
}

fn shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Cancelable),
        Just(Shape::Value),
        Just(Shape::Timeout),
    ]
}

struct Built {
    ctx: Ctx,
    parent: Option<usize>,
    cancel: Option<CancelFn>,
}

fn build(layout: &[(Option<Index>, Shape)]) -> Vec<Built> {
    let mut nodes: Vec<Built> = Vec::with_capacity(layout.len());
    for (i, (parent_pick, shape)) in layout.iter().enumerate() {
        let parent = match parent_pick {
            Some(pick) if i > 0 => Some(pick.index(i)),
            _ => None,
        };
        let parent_ctx = match parent {
            Some(p) => nodes[p].ctx.clone(),
            None => root(),
        };
        let (ctx, cancel) = match shape {
            Shape::Cancelable => {
                let (ctx, cancel) = derive_cancelable(&parent_ctx);
                (ctx, Some(cancel))
            }
            Shape::Value => (derive_value(&parent_ctx, format!("k{}", i), i), None),
            Shape::Timeout => {
                let (ctx, cancel) = derive_timeout(&parent_ctx, Duration::from_secs(3600));
                (ctx, Some(cancel))
            }
        };
        nodes.push(Built {
            ctx,
            parent,
            cancel,
        });
    }
    nodes
}

fn within(nodes: &[Built], mut node: usize, target: usize) -> bool {
    loop {
        if node == target {
            return true;
        }
        match nodes[node].parent {
            Some(parent) => node = parent,
            None => return false,
        }
    }
}

#[test]
fn test_cancel_reaches_exactly_the_subtree() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec((any::<Option<Index>>(), shape()), 1..40),
                any::<Index>(),
            ),
            |(layout, target_pick)| {
                let nodes = build(&layout);
                let cancelable: Vec<usize> = (0..nodes.len())
                    .filter(|&i| nodes[i].cancel.is_some())
                    .collect();
                prop_assume!(!cancelable.is_empty());
                let target = cancelable[target_pick.index(cancelable.len())];

                if let Some(cancel) = &nodes[target].cancel {
                    cancel.cancel();
                }

                for (i, node) in nodes.iter().enumerate() {
                    if within(&nodes, i, target) {
                        prop_assert_eq!(node.ctx.err(), Some(CancelError::Canceled));
                        prop_assert!(node.ctx.done().map_or(false, |d| d.is_closed()));
                    } else {
                        prop_assert_eq!(node.ctx.err(), None);
                    }
                }

                for node in &nodes {
                    if let Some(cancel) = &node.cancel {
                        cancel.cancel();
                    }
                }
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn test_cancel_order_does_not_change_outcome() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::vec((any::<Option<Index>>(), shape()), 1..30),
                any::<u64>(),
            ),
            |(layout, seed)| {
                let nodes = build(&layout);
                let mut order: Vec<usize> = (0..nodes.len())
                    .filter(|&i| nodes[i].cancel.is_some())
                    .collect();
                if !order.is_empty() {
                    let shift = (seed % order.len() as u64) as usize;
                    order.rotate_left(shift);
                }

                for &i in &order {
                    if let Some(cancel) = &nodes[i].cancel {
                        cancel.cancel();
                    }
                }

                for node in &nodes {
                    // Only roots of the forest with no cancelable ancestor stay live.
                    let live = node.ctx.done().is_none();
                    prop_assert_eq!(node.ctx.err().is_none(), live);
                }
                Ok(())
            },
        )
        .unwrap();
}
