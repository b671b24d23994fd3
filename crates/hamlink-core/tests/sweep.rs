#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::addr;
use hamlink_core::sweep::LinkPoller;
use hamlink_core::{CoreError, LinkDetails, LinkTarget, SweepOutcome, SweepRunner};
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

/// Blocks every poll until released.
#[derive(Default)]
struct Gated {
    calls: AtomicUsize,
    started: Notify,
    release: Notify,
}

#[async_trait]
impl LinkPoller for Gated {
    async fn poll_link(&self, _target: &LinkTarget) -> Result<LinkDetails, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(LinkDetails::default())
    }
}

fn targets() -> Vec<LinkTarget> {
    vec![LinkTarget {
        name: "hilltop-valley".into(),
        a: addr("44.130.7.1"),
        bs: vec![addr("44.130.7.2")],
    }]
}

#[tokio::test]
async fn overlapping_sweep_is_skipped() {
    let poller = Arc::new(Gated::default());
    let runner = SweepRunner::new(poller.clone());

    let first = {
        let runner = runner.clone();
        tokio::spawn(async move { runner.sweep(&targets()).await })
    };
    poller.started.notified().await;
    assert!(runner.is_running());

    let second = runner.sweep(&targets()).await;
    assert!(matches!(second, SweepOutcome::Skipped));
    assert_eq!(poller.calls.load(Ordering::SeqCst), 1);

    poller.release.notify_one();
    let SweepOutcome::Completed(report) = first.await.unwrap() else {
        panic!("first sweep skipped");
    };
    assert_eq!(report.results.len(), 1);
    assert!(!runner.is_running());

    // The gate is free again for the next tick.
    poller.release.notify_one();
    assert!(matches!(runner.sweep(&targets()).await, SweepOutcome::Completed(_)));
    assert_eq!(poller.calls.load(Ordering::SeqCst), 2);
}

#[derive(Default)]
struct Immediate {
    calls: AtomicUsize,
}

#[async_trait]
impl LinkPoller for Immediate {
    async fn poll_link(&self, _target: &LinkTarget) -> Result<LinkDetails, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(LinkDetails::default())
    }
}

#[tokio::test(start_paused = true)]
async fn periodic_runner_reports_each_sweep_until_cancelled() {
    let poller = Arc::new(Immediate::default());
    let runner = SweepRunner::new(poller.clone());
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(8);

    let task = {
        let runner = runner.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            runner
                .run_periodic(Arc::new(targets()), Duration::from_secs(60), cancel, tx)
                .await;
        })
    };

    for _ in 0..3 {
        let report = rx.recv().await.unwrap();
        assert_eq!(report.results.len(), 1);
    }
    cancel.cancel();
    task.await.unwrap();
    assert!(poller.calls.load(Ordering::SeqCst) >= 3);
}
