//! `intel_core`: deterministic intelligence-operation world.
//!
//! No IO except the metrics CSV writer. The world is a pure function of the
//! content catalog and the wall clock; player state is overlaid on top.

mod achievements;
mod actions;
mod assembler;
pub mod catalog;
pub mod clock;
mod connections;
mod consequences;
mod entities;
mod events;
mod investigation;
pub mod metrics;
mod narrative;
pub mod objectives;
mod persist;
mod reconcile;
mod relationships;
pub mod rng;
mod session;
mod sources;
mod types;

pub use achievements::{calculate_score, initial_achievements, AchievementFacts, SessionStats};
pub use actions::{
    apply_command, ActionOutcome, EntityAction, PlayerCommand, Rejection, DISRUPT_COST,
    INVESTIGATE_COST, INVESTIGATE_PATH_COST, NEUTRALIZE_COST, WATCHLIST_COST,
};
pub use assembler::{assemble, assemble_entities};
pub use catalog::Catalog;
pub use investigation::{evidence_quality, max_investigation_level, threat_reduction};
pub use metrics::{
    compute_metrics, compute_projections, MetricsFileWriter, MetricsSnapshot, Projections,
};
pub use persist::{MemoryStore, PlayerStore};
pub use reconcile::{capture, reconcile, DisruptedLink, EntityState, PersistedState};
pub use relationships::{connection_health, network_fragmentation, ConnectionHealth};
pub use session::{Scheduler, Session, Task, TickReport, VIEWS};
pub use sources::{source_stats, SourceStats};
pub use types::*;

/// `floor(value)` as a count; negative and NaN inputs give 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn floor_to_u64(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
