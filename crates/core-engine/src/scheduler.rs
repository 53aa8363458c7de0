//! Reconciliation pass scheduler.
//!
//! Single-flight, frame-coalesced gate in front of the reconciler. Every event
//! source (menu mutation, pin toggle, sort button, palette open) calls
//! `request_pass`; the embedder's frame tick calls `begin_frame` and, when it
//! returns `true`, runs exactly one pass followed by `finish_pass`.
//!
//! State machine:
//! - `Idle --request--> Scheduled`
//! - `Scheduled --request--> Scheduled` (deduplicated into the upcoming pass)
//! - `Scheduled --frame--> Running`
//! - `Running --request--> Running { rerun: true }` (never dropped)
//! - `Running --finish--> Idle`, or `Scheduled` when a rerun was requested
//! - `* --cancel--> Idle`
//!
//! The reconciler's own writes come back as menu mutations and therefore as
//! requests. Because a pass on an unchanged desired state performs no writes,
//! the loop settles after at most one extra (no-op) pass.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Idle,
    Scheduled,
    Running {
        rerun: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerMetricsSnapshot {
    /// All `request_pass` calls.
    pub requests: u64,
    /// Requests folded into an already scheduled pass.
    pub coalesced: u64,
    /// Requests that arrived mid-pass and forced a rerun.
    pub deferred: u64,
    pub passes: u64,
    /// Scheduled (or rerun-pending) work discarded by `cancel`.
    pub cancelled: u64,
}

#[derive(Debug, Default)]
pub struct PassScheduler {
    state: PassState,
    metrics: SchedulerMetricsSnapshot,
}

impl PassScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn metrics_snapshot(&self) -> SchedulerMetricsSnapshot {
        self.metrics
    }

    pub fn is_idle(&self) -> bool {
        self.state == PassState::Idle
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, PassState::Running { .. })
    }

    /// Idempotent request. Returns `true` only when this call moved the
    /// scheduler out of `Idle`.
    pub fn request_pass(&mut self) -> bool {
        self.metrics.requests += 1;
        let (next, newly) = match self.state {
            PassState::Idle => (PassState::Scheduled, true),
            PassState::Scheduled => {
                self.metrics.coalesced += 1;
                (PassState::Scheduled, false)
            }
            PassState::Running { .. } => {
                self.metrics.deferred += 1;
                (PassState::Running { rerun: true }, false)
            }
        };
        trace!(target: "engine.scheduler", from = ?self.state, to = ?next, "pass_request");
        self.state = next;
        newly
    }

    /// Frame tick. Returns `true` when the caller must run a pass now.
    pub fn begin_frame(&mut self) -> bool {
        if self.state != PassState::Scheduled {
            return false;
        }
        self.state = PassState::Running { rerun: false };
        self.metrics.passes += 1;
        true
    }

    /// Close the running pass. Returns the resulting state.
    pub fn finish_pass(&mut self) -> PassState {
        self.state = match self.state {
            PassState::Running { rerun: true } => PassState::Scheduled,
            PassState::Running { rerun: false } => PassState::Idle,
            other => other,
        };
        self.state
    }

    /// Drop scheduled work (palette close). A pass already running is not
    /// interrupted by this; its rerun request is discarded.
    pub fn cancel(&mut self) {
        if matches!(
            self.state,
            PassState::Scheduled | PassState::Running { rerun: true }
        ) {
            self.metrics.cancelled += 1;
        }
        trace!(target: "engine.scheduler", from = ?self.state, "pass_cancel");
        self.state = PassState::Idle;
    }
}
