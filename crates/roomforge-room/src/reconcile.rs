//! The background reconciliation task.

use std::sync::Arc;

use roomforge_backend::{Launcher, StatusProbe};
use roomforge_registry::Registry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::RoomOrchestrator;

/// Runs [`RoomOrchestrator::reconcile`] on a fixed interval until told to stop.
///
/// The reconciler only talks to the orchestrator, never to a shared global,
/// so it can be driven in tests with in-memory collaborators and a paused
/// clock.
pub struct Reconciler<L, R, P> {
    orchestrator: Arc<RoomOrchestrator<L, R, P>>,
}

impl<L, R, P> Reconciler<L, R, P>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    pub fn new(orchestrator: Arc<RoomOrchestrator<L, R, P>>) -> Self {
        Self { orchestrator }
    }

    /// Starts [`run`](Self::run) on a new Tokio task.
    pub fn spawn(
        orchestrator: Arc<RoomOrchestrator<L, R, P>>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self::new(orchestrator).run(shutdown))
    }

    /// Sweeps every `interval` until `shutdown` turns `true` or its sender
    /// is dropped.
    ///
    /// The first sweep happens one interval after start, or immediately
    /// when `run_on_start` is set. A sweep that overruns the interval
    /// causes the missed ticks to be skipped, not replayed. A sweep that
    /// is already running is allowed to finish before shutdown is noticed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let config = self.orchestrator.config().reconcile.clone();
        let start = if config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + config.interval
        };
        let mut ticker = time::interval_at(start, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = config.interval.as_secs(),
            "reconciler started"
        );

        if *shutdown.borrow() {
            info!("reconciler stopped");
            return;
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.orchestrator.reconcile().await;
                    if report.reaped > 0 {
                        info!(
                            reaped = report.reaped,
                            remaining = report.probed - report.reaped,
                            "idle rooms reaped"
                        );
                    } else {
                        debug!(probed = report.probed, "nothing to reap");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("reconciler stopped");
    }
}
