//! Worker Scenarios
//!
//! Small end-to-end runs of the context tree used by the `ctxtree` binary:
//! workers that tick until their context is cancelled, a timeout racing a
//! manual cancel, and value lookups along a mixed chain.

use crate::config::DemoConfig;
use crate::context::{derive_cancelable, derive_timeout, derive_value, root, Context, Ctx};
use serde::Serialize;
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one worker loop.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub ticks: u64,
    pub stopped_after_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelReport {
    pub started_at: String,
    pub cancel_after_ms: u64,
    pub parent_err: Option<String>,
    pub child_err: Option<String>,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeoutReport {
    pub started_at: String,
    pub timeout_ms: u64,
    pub cancel_after_ms: u64,
    pub err: Option<String>,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupRow {
    pub context: String,
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuesReport {
    pub lookups: Vec<LookupRow>,
}

/// Tick every `tick` until `ctx` is cancelled; returns the number of ticks.
///
/// A context that can never be cancelled has nothing to wait for, so the
/// worker returns immediately.
pub fn run_worker(ctx: &Ctx, tick: Duration) -> u64 {
    let Some(done) = ctx.done() else {
        warn!("Worker given a context that never cancels; not starting");
        return 0;
    };
    let mut ticks = 0;
    while !done.wait_timeout(tick) {
        ticks += 1;
        debug!(ticks, "working...");
    }
    ticks
}

fn spawn_workers<F>(ctx: &Ctx, config: &DemoConfig, trigger: F) -> Vec<WorkerReport>
where
    F: FnOnce(),
{
    let started = Instant::now();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..config.workers)
            .map(|worker| {
                let ctx = ctx.clone();
                let tick = config.tick();
                scope.spawn(move || {
                    let ticks = run_worker(&ctx, tick);
                    WorkerReport {
                        worker,
                        ticks,
                        stopped_after_ms: started.elapsed().as_millis() as u64,
                    }
                })
            })
            .collect();

        trigger();

        join_reports(handles)
    })
}

/// Collect worker reports. A worker that panicked has no report; it is
/// logged and left out.
fn join_reports(handles: Vec<ScopedJoinHandle<'_, WorkerReport>>) -> Vec<WorkerReport> {
    handles
        .into_iter()
        .enumerate()
        .filter_map(|(worker, handle)| match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                warn!(worker, "Worker panicked; no report");
                None
            }
        })
        .collect()
}

/// Workers share a child of a cancelable parent; the parent is cancelled
/// after `cancel_after_ms` and the child must follow.
pub fn run_cancel_scenario(config: &DemoConfig) -> CancelReport {
    let started_at = chrono::Utc::now().to_rfc3339();
    let (parent, cancel_parent) = derive_cancelable(&root());
    let (child, _cancel_child) = derive_cancelable(&parent);

    let workers = spawn_workers(&child, config, || {
        thread::sleep(config.cancel_after());
        info!("Cancelling parent context");
        cancel_parent.cancel();
    });

    CancelReport {
        started_at,
        cancel_after_ms: config.cancel_after_ms,
        parent_err: parent.err().map(|e| e.to_string()),
        child_err: child.err().map(|e| e.to_string()),
        workers,
    }
}

/// Workers share a timeout context that is also cancelled manually after
/// `cancel_after_ms`; whichever happens first decides the reported error.
pub fn run_timeout_scenario(config: &DemoConfig) -> TimeoutReport {
    let started_at = chrono::Utc::now().to_rfc3339();
    let (ctx, cancel) = derive_timeout(&root(), config.timeout());

    let workers = spawn_workers(&ctx, config, || {
        thread::sleep(config.cancel_after());
        info!("Cancelling timeout context");
        cancel.cancel();
    });

    TimeoutReport {
        started_at,
        timeout_ms: config.timeout_ms,
        cancel_after_ms: config.cancel_after_ms,
        err: ctx.err().map(|e| e.to_string()),
        workers,
    }
}

/// Lookups along `value(key1) -> cancelable -> value(key3)`.
pub fn run_values_scenario() -> ValuesReport {
    let ctx1 = derive_value(&root(), "key1", "val1".to_string());
    let (ctx2, cancel) = derive_cancelable(&ctx1);
    let ctx3 = derive_value(&ctx2, "key3", "val3".to_string());

    let probes: [(&str, &Ctx, &'static str); 7] = [
        ("ctx1", &ctx1, "key1"),
        ("ctx1", &ctx1, "key2"),
        ("ctx2", &ctx2, "key1"),
        ("ctx2", &ctx2, "key2"),
        ("ctx3", &ctx3, "key1"),
        ("ctx3", &ctx3, "key3"),
        ("ctx3", &ctx3, "kdkd"),
    ];

    let lookups = probes
        .iter()
        .map(|(name, ctx, key)| LookupRow {
            context: name.to_string(),
            key: key.to_string(),
            value: ctx.value_as::<String>(*key).map(|v| v.as_ref().clone()),
        })
        .collect();
    cancel.cancel();

    ValuesReport { lookups }
}
