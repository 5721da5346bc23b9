//! RoomOrchestrator: the create/list/get/reconcile service.
//!
//! The orchestrator holds no lock of its own. Every piece of shared
//! state lives behind the registry or the launcher, so request handlers
//! and the reconciliation task can call into one `Arc<RoomOrchestrator>`
//! concurrently.
//!
//! Two ordering rules keep records and instances in step:
//!
//! - create spawns first and persists second; if persisting fails the
//!   fresh instance is destroyed again;
//! - reaping destroys first and deletes second, so a failure leaves an
//!   instance without a record rather than a record without an instance.

use std::time::Duration;

use futures_util::future::join_all;
use roomforge_backend::{Launcher, StatusProbe};
use roomforge_protocol::{CodeGenerator, CreateRoom, Room, RoomCode};
use roomforge_registry::{Registry, RoomFilter};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::{OrchestratorConfig, RoomError};

// ---------------------------------------------------------------------------
// SweepReport
// ---------------------------------------------------------------------------

/// What a sweep decided for one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepOutcome {
    /// The probe reported this many players (> 0). Nothing was done.
    Occupied(u32),
    /// The room was empty; its instance was destroyed and its record deleted.
    Reaped,
    /// The probe failed or timed out. The room is retried next sweep.
    Skipped,
    /// The room was empty, but its record was already gone when the
    /// sweep came to delete it.
    Vanished,
    /// The room was empty but its record could not be deleted.
    Failed,
}

/// Totals for one reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub probed: usize,
    pub occupied: usize,
    pub reaped: usize,
    pub skipped: usize,
    pub vanished: usize,
    pub failed: usize,
    /// Codes of the rooms removed by this sweep.
    pub reaped_codes: Vec<RoomCode>,
}

impl SweepReport {
    fn record(&mut self, code: &RoomCode, outcome: SweepOutcome) {
        self.probed += 1;
        match outcome {
            SweepOutcome::Occupied(_) => self.occupied += 1,
            SweepOutcome::Reaped => {
                self.reaped += 1;
                self.reaped_codes.push(code.clone());
            }
            SweepOutcome::Skipped => self.skipped += 1,
            SweepOutcome::Vanished => self.vanished += 1,
            SweepOutcome::Failed => self.failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomOrchestrator
// ---------------------------------------------------------------------------

/// Creates rooms on a compute backend and keeps the registry honest.
pub struct RoomOrchestrator<L, R, P> {
    launcher: L,
    registry: R,
    probe: P,
    codes: CodeGenerator,
    config: OrchestratorConfig,
}

impl<L, R, P> RoomOrchestrator<L, R, P>
where
    L: Launcher,
    R: Registry,
    P: StatusProbe,
{
    /// Creates an orchestrator. `config` is validated first.
    pub fn new(launcher: L, registry: R, probe: P, config: OrchestratorConfig) -> Self {
        let config = config.validated();
        Self {
            launcher,
            registry,
            probe,
            codes: CodeGenerator::new(config.code_length),
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Starts an instance for `request` and registers it as a room.
    ///
    /// # Errors
    /// - [`RoomError::Validation`]: nothing was started.
    /// - [`RoomError::Allocation`] / [`RoomError::Spawn`]: the launcher
    ///   failed; the registry was not touched.
    /// - [`RoomError::Persistence`]: the instance started but its record
    ///   was rejected. The instance has been destroyed once, best-effort.
    pub async fn create_room(&self, request: CreateRoom) -> Result<Room, RoomError> {
        let request = request.validate_with_default(self.config.default_max_players)?;
        let code = self.codes.generate();

        let endpoint = self
            .launcher
            .spawn(&code, request.max_players, &request.name)
            .await
            .inspect_err(|e| warn!(%code, error = %e, "instance failed to start"))?;

        let room = Room::new(code, endpoint, &request);
        if let Err(e) = self.registry.insert(&room).await {
            warn!(code = %room.code, error = %e, "room insert failed, destroying instance");
            self.destroy_instance(&room.code, self.config.destroy_timeout)
                .await;
            return Err(RoomError::Persistence(e));
        }

        info!(
            code = %room.code,
            name = %room.name,
            max_players = room.max_players,
            private = room.private,
            query_port = room.query_port,
            game_port = room.game_port,
            "room created"
        );
        Ok(room)
    }

    /// Every non-private room.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, RoomError> {
        Ok(self.registry.list(RoomFilter::Public).await?)
    }

    /// Looks up one room, private or not.
    ///
    /// A malformed code is reported as [`RoomError::NotFound`], the same as
    /// a well-formed code with no record.
    pub async fn get_room(&self, code: &str) -> Result<Room, RoomError> {
        let parsed = RoomCode::parse(code).map_err(|_| RoomError::NotFound(code.to_string()))?;
        self.registry
            .get(&parsed)
            .await?
            .ok_or_else(|| RoomError::NotFound(code.to_string()))
    }

    /// Runs one reconciliation sweep.
    ///
    /// Every registered room is probed concurrently. Rooms reporting zero
    /// players are reaped, occupied rooms are left alone, and rooms whose
    /// probe fails or times out are kept for the next sweep. One room's
    /// failure never stops the others.
    pub async fn reconcile(&self) -> SweepReport {
        let rooms = match self.registry.list(RoomFilter::All).await {
            Ok(rooms) => rooms,
            Err(e) => {
                error!(error = %e, "sweep aborted, could not list rooms");
                return SweepReport::default();
            }
        };

        let outcomes = join_all(rooms.iter().map(|room| self.reconcile_room(room))).await;

        let mut report = SweepReport::default();
        for (room, outcome) in rooms.iter().zip(outcomes) {
            report.record(&room.code, outcome);
        }
        debug!(
            probed = report.probed,
            occupied = report.occupied,
            reaped = report.reaped,
            skipped = report.skipped,
            vanished = report.vanished,
            failed = report.failed,
            "sweep finished"
        );
        report
    }

    async fn reconcile_room(&self, room: &Room) -> SweepOutcome {
        let code = &room.code;
        let endpoint = room.endpoint();
        let status = match timeout(
            self.config.reconcile.probe_timeout,
            self.probe.probe(&endpoint),
        )
        .await
        {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                warn!(%code, error = %e, "probe failed, keeping room");
                return SweepOutcome::Skipped;
            }
            Err(_) => {
                warn!(%code, "probe timed out, keeping room");
                return SweepOutcome::Skipped;
            }
        };

        if !status.is_empty() {
            debug!(%code, players = status.players, "room occupied");
            return SweepOutcome::Occupied(status.players);
        }

        self.destroy_instance(code, self.config.reconcile.destroy_timeout)
            .await;
        match self.registry.delete(code).await {
            Ok(true) => {
                info!(%code, "room reaped");
                SweepOutcome::Reaped
            }
            Ok(false) => {
                debug!(%code, "room record already removed");
                SweepOutcome::Vanished
            }
            Err(e) => {
                warn!(%code, error = %e, "could not delete reaped room");
                SweepOutcome::Failed
            }
        }
    }

    /// Destroys `code`'s instance, giving up after `limit`. Failures are
    /// logged and otherwise ignored.
    async fn destroy_instance(&self, code: &RoomCode, limit: Duration) {
        match timeout(limit, self.launcher.destroy(code)).await {
            Ok(Ok(())) => debug!(%code, "instance destroyed"),
            Ok(Err(e)) => warn!(%code, error = %e, "instance destroy failed"),
            Err(_) => warn!(
                %code,
                timeout_ms = limit.as_millis() as u64,
                "instance destroy timed out"
            ),
        }
    }
}
