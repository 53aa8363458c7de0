//! Pin/sort reconciliation engine for a host-rendered command palette.
//!
//! The host owns the palette DOM and re-renders it at will; this crate only
//! augments it in place through the `HostTree` capability:
//!
//! * `identity` derives a stable key per row from its rendered text.
//! * `observers` watch for the palette root and its row-list, feeding
//!   requests into the single-flight `scheduler`.
//! * `reconcile` runs one pass: stars, grouping, sorting, separator, one
//!   batched reorder (or none when already in order), sort controls.
//! * `selection` keeps the keyboard highlight attached to an identity across
//!   reorders and takes over arrow navigation while the list is reordered.
//!
//! All per-open state lives in `session::Session`; closing the palette drops
//! it. `Engine` is the facade an embedder drives.
//!
//! Failure model: there is none at this layer. Missing structure or corrupt
//! preferences degrade to a no-op for the affected step and the next pass
//! retries.

pub mod controls;
mod engine;
pub mod identity;
pub mod observers;
pub mod reconcile;
pub mod scheduler;
pub mod selection;
pub mod session;

pub use engine::{ClickOutcome, Engine, FrameReport, KeyOutcome, Lifecycle};
pub use identity::{IdentityResolver, ResolvedRow, normalize};
pub use reconcile::{OrderPlan, PassSummary, RowMeta, plan_order};
pub use scheduler::{PassScheduler, PassState, SchedulerMetricsSnapshot};
pub use session::Session;
