//! Orchestrator and reconciliation settings.

use std::time::Duration;

use roomforge_protocol::{DEFAULT_CODE_LENGTH, DEFAULT_MAX_PLAYERS};
use tracing::warn;

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Settings for a [`RoomOrchestrator`](crate::RoomOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Characters per generated room code.
    pub code_length: usize,

    /// Capacity given to rooms whose request leaves it unset or `<= 0`.
    pub default_max_players: u32,

    /// Upper bound on the compensating destroy after a failed insert.
    pub destroy_timeout: Duration,

    /// Settings for the background sweep.
    pub reconcile: ReconcileConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            default_max_players: DEFAULT_MAX_PLAYERS,
            destroy_timeout: Duration::from_secs(10),
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Shortest accepted room code. Codes double as container names,
    /// which need at least two characters.
    pub const MIN_CODE_LENGTH: usize = 2;

    /// Longest accepted room code.
    pub const MAX_CODE_LENGTH: usize = 32;

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called by [`RoomOrchestrator::new`](crate::RoomOrchestrator::new).
    /// Rules:
    /// - `code_length` kept within `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
    /// - `default_max_players` of 0 becomes [`DEFAULT_MAX_PLAYERS`].
    /// - A zero `destroy_timeout` becomes the default.
    /// - `reconcile` is validated too.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        let clamped = self.code_length.clamp(Self::MIN_CODE_LENGTH, Self::MAX_CODE_LENGTH);
        if clamped != self.code_length {
            warn!(
                code_length = self.code_length,
                clamped, "code_length out of range, clamping"
            );
            self.code_length = clamped;
        }
        if self.default_max_players == 0 {
            warn!(
                fallback = DEFAULT_MAX_PLAYERS,
                "default_max_players is zero, using fallback"
            );
            self.default_max_players = DEFAULT_MAX_PLAYERS;
        }
        if self.destroy_timeout.is_zero() {
            warn!("destroy_timeout is zero, using default");
            self.destroy_timeout = defaults.destroy_timeout;
        }
        self.reconcile = self.reconcile.validated();
        self
    }
}

// ---------------------------------------------------------------------------
// ReconcileConfig
// ---------------------------------------------------------------------------

/// Settings for the reconciliation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Time between sweeps.
    pub interval: Duration,

    /// How long one room's probe may take before the room is skipped.
    pub probe_timeout: Duration,

    /// How long reaping one room's instance may take.
    pub destroy_timeout: Duration,

    /// Sweep immediately on start instead of after the first interval.
    pub run_on_start: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(2),
            destroy_timeout: Duration::from_secs(10),
            run_on_start: false,
        }
    }
}

impl ReconcileConfig {
    /// Shortest allowed sweep interval.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// A config sweeping every `interval` with default timeouts.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// - `interval` raised to at least [`Self::MIN_INTERVAL`].
    /// - Zero timeouts replaced by the defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "reconcile interval below minimum, clamping to 1s"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if self.probe_timeout.is_zero() {
            warn!("probe_timeout is zero, using default");
            self.probe_timeout = defaults.probe_timeout;
        }
        if self.destroy_timeout.is_zero() {
            warn!("reconcile destroy_timeout is zero, using default");
            self.destroy_timeout = defaults.destroy_timeout;
        }
        self
    }
}
