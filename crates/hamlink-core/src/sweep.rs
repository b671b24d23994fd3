// ── Sweep runner ──
//
// A sweep polls every configured link once on a bounded pool of workers.
// Sweeps never overlap: a sweep triggered while another is running is
// skipped, not queued.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::link::LinkDetails;
use crate::model::DeviceAddress;
use crate::querier::Querier;

pub const DEFAULT_POOL_WIDTH: usize = 4;

/// One physical link: a device and the candidate devices at the far end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub name: String,
    pub a: DeviceAddress,
    pub bs: Vec<DeviceAddress>,
}

/// Polls one link end to end.
#[async_trait]
pub trait LinkPoller: Send + Sync {
    async fn poll_link(&self, target: &LinkTarget) -> Result<LinkDetails, CoreError>;
}

#[async_trait]
impl LinkPoller for Querier {
    async fn poll_link(&self, target: &LinkTarget) -> Result<LinkDetails, CoreError> {
        self.fetch_link_details(target.a, &target.bs).await
    }
}

/// Backoff bookkeeping lives outside the core; it is only asked whether a
/// link may be polled now.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    fn is_retry_feasible(&self, target: &LinkTarget) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFeasible;

impl RetryPolicy for AlwaysFeasible {
    fn is_retry_feasible(&self, _target: &LinkTarget) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct LinkResult {
    pub target: LinkTarget,
    pub outcome: Result<LinkDetails, CoreError>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub results: Vec<LinkResult>,
    /// Names of links the retry policy held back.
    pub deferred: Vec<String>,
    pub elapsed: Duration,
}

impl SweepReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_err()).count()
    }
}

#[derive(Debug)]
pub enum SweepOutcome {
    /// Another sweep held the gate; nothing was started.
    Skipped,
    Completed(SweepReport),
}

#[derive(Clone)]
pub struct SweepRunner {
    poller: Arc<dyn LinkPoller>,
    policy: Arc<dyn RetryPolicy>,
    width: usize,
    gate: Arc<Mutex<()>>,
}

impl fmt::Debug for SweepRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SweepRunner")
            .field("width", &self.width)
            .field("policy", &self.policy)
            .field("busy", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl SweepRunner {
    pub fn new(poller: Arc<dyn LinkPoller>) -> Self {
        Self {
            poller,
            policy: Arc::new(AlwaysFeasible),
            width: DEFAULT_POOL_WIDTH,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Pool width; values below 1 are raised to 1.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Polls every target once unless a sweep is already in progress.
    pub async fn sweep(&self, targets: &[LinkTarget]) -> SweepOutcome {
        let Ok(_guard) = self.gate.try_lock() else {
            info!("sweep already in progress, skipping");
            return SweepOutcome::Skipped;
        };

        let started = Instant::now();
        let slots = Arc::new(Semaphore::new(self.width));
        let mut tasks = JoinSet::new();
        let mut report = SweepReport::default();

        for target in targets {
            if !self.policy.is_retry_feasible(target) {
                debug!(link = %target.name, "retry not yet feasible");
                report.deferred.push(target.name.clone());
                continue;
            }
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let poller = Arc::clone(&self.poller);
            let target = target.clone();
            tasks.spawn(async move {
                let outcome = poller.poll_link(&target).await;
                drop(permit);
                LinkResult { target, outcome }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let Err(e) = &result.outcome {
                        warn!(link = %result.target.name, error = %e, "link poll failed");
                    }
                    report.results.push(result);
                }
                Err(e) => warn!(error = %e, "link task aborted"),
            }
        }

        report.elapsed = started.elapsed();
        info!(
            links = report.results.len(),
            failures = report.failures(),
            deferred = report.deferred.len(),
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "sweep finished"
        );
        SweepOutcome::Completed(report)
    }

    /// Starts a sweep on every tick until `cancel` fires. Each tick spawns
    /// its sweep, so a long sweep makes the following ticks skip.
    pub async fn run_periodic(
        &self,
        targets: Arc<Vec<LinkTarget>>,
        interval: Duration,
        cancel: CancellationToken,
        reports: mpsc::Sender<SweepReport>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("sweep loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let runner = self.clone();
                    let targets = Arc::clone(&targets);
                    let reports = reports.clone();
                    tokio::spawn(async move {
                        if let SweepOutcome::Completed(report) = runner.sweep(&targets).await {
                            if reports.send(report).await.is_err() {
                                debug!("sweep report receiver dropped");
                            }
                        }
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LinkPoller for Counting {
        async fn poll_link(&self, _target: &LinkTarget) -> Result<LinkDetails, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(LinkDetails::default())
        }
    }

    #[derive(Debug)]
    struct Never;

    impl RetryPolicy for Never {
        fn is_retry_feasible(&self, _target: &LinkTarget) -> bool {
            false
        }
    }

    fn targets(n: u8) -> Vec<LinkTarget> {
        (0..n)
            .map(|i| LinkTarget {
                name: format!("link-{i}"),
                a: format!("44.0.0.{i}").parse().unwrap(),
                bs: vec![format!("44.0.1.{i}").parse().unwrap()],
            })
            .collect()
    }

    #[tokio::test]
    async fn pool_width_bounds_concurrency() {
        let poller = Arc::new(Counting::default());
        let runner = SweepRunner::new(poller.clone()).with_width(2);
        let SweepOutcome::Completed(report) = runner.sweep(&targets(6)).await else {
            panic!("sweep skipped");
        };
        assert_eq!(report.results.len(), 6);
        assert_eq!(poller.calls.load(Ordering::SeqCst), 6);
        assert!(poller.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn retry_policy_defers_links() {
        let poller = Arc::new(Counting::default());
        let runner = SweepRunner::new(poller.clone()).with_retry_policy(Arc::new(Never));
        let SweepOutcome::Completed(report) = runner.sweep(&targets(3)).await else {
            panic!("sweep skipped");
        };
        assert_eq!(report.deferred.len(), 3);
        assert_eq!(poller.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn width_is_at_least_one() {
        let runner = SweepRunner::new(Arc::new(Counting::default())).with_width(0);
        assert_eq!(runner.width(), 1);
        assert_eq!(DEFAULT_POOL_WIDTH, 4);
    }
}
