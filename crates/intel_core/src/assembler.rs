//! Builds a complete world snapshot from `(now, speed)`.
//!
//! Every generator is a pure function of the elapsed counters, so the same
//! input always yields the same snapshot and a later input only adds to it.

use crate::achievements::{calculate_score, initial_achievements};
use crate::clock::{elapsed_at, sim_time};
use crate::connections::generate_connections;
use crate::entities::{generate_base_entities, generate_spawned_entities, update_risk_scores};
use crate::events::{generate_alerts, generate_events};
use crate::narrative::operation_phase;
use crate::objectives::{
    create_objective_chains, generate_hidden_objectives, generate_objectives,
    generate_procedural_objectives,
};
use crate::sources::generate_data_sources;
use crate::{Catalog, Elapsed, Entity, SimulationState, TimeSpeed};

/// Entities alive after `elapsed`: base set, spawned set, then minute drift.
pub fn assemble_entities(catalog: &Catalog, elapsed: &Elapsed) -> Vec<Entity> {
    let mut entities = generate_base_entities(catalog);
    entities.extend(generate_spawned_entities(catalog, elapsed.hours));
    update_risk_scores(&mut entities, elapsed.minutes);
    entities
}

/// The world regenerated for `now_ms`, with starting resources and a fresh
/// objective set issued at the current minute.
pub fn assemble(catalog: &Catalog, now_ms: i64, time_speed: TimeSpeed) -> SimulationState {
    let elapsed = elapsed_at(now_ms, time_speed);
    let entities = assemble_entities(catalog, &elapsed);
    let connections = generate_connections(catalog, &entities, elapsed.hours);
    let events = generate_events(catalog, &entities, elapsed.minutes);
    let alerts = generate_alerts(catalog, &entities, elapsed.minutes, sim_time(elapsed.millis));
    let sources = generate_data_sources(catalog, elapsed.minutes);
    let phase = operation_phase(catalog, elapsed.days);

    let mut objectives = generate_objectives(&entities, elapsed.minutes);
    objectives.extend(generate_procedural_objectives(&entities, elapsed.minutes));

    let mut state = SimulationState {
        elapsed,
        time_speed,
        entities,
        connections,
        events,
        alerts,
        sources,
        phase,
        resources: catalog.constants.starting_resources.clone(),
        objectives,
        objective_chains: create_objective_chains(elapsed.minutes),
        hidden_objectives: generate_hidden_objectives(elapsed.minutes),
        achievements: initial_achievements(),
        consequence_logs: Vec::new(),
        score: 0,
    };
    state.score = calculate_score(
        &state.achievements,
        state.objective_counts(),
        &state.entities,
        &state.resources,
    );
    state
}
