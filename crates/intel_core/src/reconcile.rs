//! Overlay of player-authored state onto a regenerated world.
//!
//! The world itself is never stored. [`capture`] records what the player
//! changed; [`reconcile`] re-applies it to a fresh snapshot entity by entity
//! and objective by objective.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::clock::DAY_MS;
use crate::relationships::disrupt_connection;
use crate::{
    clamp_risk, Connection, EntityId, EventId, GameObjective, InvestigationBranch,
    ObjectiveStates, ObjectiveStatus, PlayerFlags, PlayerResources, ResponseKind,
    SimulationState, ThreatLevel,
};

/// Persisted records older than this are discarded.
pub const FRESHNESS_WINDOW_MS: i64 = DAY_MS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub investigation_level: u8,
    #[serde(default)]
    pub flags: PlayerFlags,
    #[serde(default)]
    pub risk_adjustment: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<InvestigationBranch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptedLink {
    pub from: EntityId,
    pub to: EntityId,
    pub permanent: bool,
    pub disrupted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub player_resources: PlayerResources,
    #[serde(default)]
    pub entity_states: BTreeMap<EntityId, EntityState>,
    #[serde(default)]
    pub dismissed_alerts: BTreeSet<EventId>,
    #[serde(default)]
    pub objective_states: ObjectiveStates,
    #[serde(default)]
    pub responded_alerts: BTreeMap<EventId, ResponseKind>,
    #[serde(default)]
    pub revealed_links: Vec<Connection>,
    #[serde(default)]
    pub disrupted_links: Vec<DisruptedLink>,
    pub saved_at: i64,
}

impl PersistedState {
    /// Saved within the freshness window. A timestamp from the future counts
    /// as fresh.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.saved_at < FRESHNESS_WINDOW_MS
    }
}

/// Record everything the player has changed in `state`.
pub fn capture(
    state: &SimulationState,
    dismissed_alerts: &BTreeSet<EventId>,
    now_ms: i64,
) -> PersistedState {
    let entity_states = state
        .entities
        .iter()
        .filter(|e| {
            e.flags.any()
                || e.investigation_level > 0
                || e.risk_adjustment != 0
                || !e.branches.is_empty()
        })
        .map(|e| {
            (
                e.id,
                EntityState {
                    investigation_level: e.investigation_level,
                    flags: e.flags,
                    risk_adjustment: e.risk_adjustment,
                    branches: e.branches.clone(),
                },
            )
        })
        .collect();

    let objective_states = all_objectives(state)
        .map(|o| (o.id.clone(), o.status))
        .collect();

    let responded_alerts = state
        .events
        .iter()
        .filter_map(|e| e.player_response.map(|kind| (e.id, kind)))
        .collect();

    let disrupted_links = state
        .connections
        .iter()
        .filter_map(|c| {
            let meta = c.meta.as_ref().filter(|meta| meta.disrupted)?;
            Some(DisruptedLink {
                from: c.from,
                to: c.to,
                permanent: !meta.can_reform,
                disrupted_at: meta.disrupted_at.unwrap_or(now_ms),
            })
        })
        .collect();

    PersistedState {
        player_resources: state.resources.clone(),
        entity_states,
        dismissed_alerts: dismissed_alerts.clone(),
        objective_states,
        responded_alerts,
        revealed_links: state
            .connections
            .iter()
            .filter(|c| c.revealed)
            .cloned()
            .collect(),
        disrupted_links,
        saved_at: now_ms,
    }
}

/// Standalone objectives, every chain step and discovered hidden objectives.
fn all_objectives(state: &SimulationState) -> impl Iterator<Item = &GameObjective> {
    state
        .objectives
        .iter()
        .chain(state.objective_chains.iter().flat_map(|c| c.steps.iter()))
        .chain(
            state
                .hidden_objectives
                .iter()
                .filter(|h| h.discovered)
                .map(|h| &h.objective),
        )
}

fn restore_status(objective: &mut GameObjective, states: &ObjectiveStates) -> bool {
    let Some(&status) = states.get(&objective.id) else {
        return false;
    };
    if status.is_terminal() {
        objective.status = status;
        if status == ObjectiveStatus::Completed {
            objective.progress = 100;
        }
    }
    true
}

/// Apply `persisted` to a freshly assembled `state`.
///
/// Risk is rebuilt from the generated base plus the persisted adjustment, so
/// applying the same record twice gives the same result. Entities and links
/// missing from the snapshot are skipped.
pub fn reconcile(state: &mut SimulationState, persisted: &PersistedState) {
    state.resources = persisted.player_resources.clone();
    state.resources.clamp();

    for entity in &mut state.entities {
        let Some(saved) = persisted.entity_states.get(&entity.id) else {
            continue;
        };
        let base = i64::from(entity.risk) - i64::from(entity.risk_adjustment);
        entity.risk = clamp_risk(base + i64::from(saved.risk_adjustment));
        entity.risk_adjustment = saved.risk_adjustment;
        entity.threat = ThreatLevel::from_risk(entity.risk);
        entity.investigation_level = saved.investigation_level;
        entity.flags = saved.flags;
        entity.branches.clone_from(&saved.branches);
    }

    for event in &mut state.events {
        if let Some(&kind) = persisted.responded_alerts.get(&event.id) {
            event.player_response = Some(kind);
        }
    }

    for link in &persisted.revealed_links {
        if let Some(existing) = state.connections.iter_mut().find(|c| c.key() == link.key()) {
            existing.revealed = true;
        } else if state.entity(link.from).is_some() && state.entity(link.to).is_some() {
            state.connections.push(link.clone());
        }
    }

    for link in &persisted.disrupted_links {
        let key = crate::pair_key(link.from, link.to);
        if let Some(connection) = state.connections.iter_mut().find(|c| c.key() == key) {
            if !connection.is_disrupted() {
                disrupt_connection(connection, link.permanent, link.disrupted_at);
            }
        }
    }

    let states = &persisted.objective_states;
    for objective in &mut state.objectives {
        restore_status(objective, states);
    }
    for chain in &mut state.objective_chains {
        for step in &mut chain.steps {
            restore_status(step, states);
        }
        chain.current_step = chain
            .steps
            .iter()
            .take_while(|s| s.status == ObjectiveStatus::Completed)
            .count();
    }
    for hidden in &mut state.hidden_objectives {
        if restore_status(&mut hidden.objective, states) {
            hidden.discovered = true;
        }
    }
}
