//! Player commands: validation, spending and consequences.
//!
//! A command either applies in full or is rejected with the state untouched.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consequences::{apply_alert_response_consequences, apply_investigation_consequences};
use crate::investigation::{investigate_path, revealed_neighbours, MAX_BRANCH_LEVEL};
use crate::relationships::{apply_network_effects, disrupt_connection};
use crate::{
    pair_key, ConsequenceKind, ConsequenceLog, EntityId, EventId, InvestigationPath,
    ResourceCost, ResponseKind, SimulationState,
};

pub const MAX_INVESTIGATION_LEVEL: u8 = 3;
pub const CONSEQUENCE_LOG_LIMIT: usize = 500;

pub const INVESTIGATE_COST: ResourceCost = ResourceCost {
    budget: 100,
    agents: 0,
    data_credits: 1,
};
pub const INVESTIGATE_PATH_COST: ResourceCost = ResourceCost {
    budget: 150,
    agents: 0,
    data_credits: 1,
};
pub const NEUTRALIZE_COST: ResourceCost = ResourceCost {
    budget: 1000,
    agents: 2,
    data_credits: 0,
};
pub const DISRUPT_COST: ResourceCost = ResourceCost {
    budget: 0,
    agents: 1,
    data_credits: 1,
};
pub const WATCHLIST_COST: ResourceCost = ResourceCost {
    budget: 0,
    agents: 1,
    data_credits: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityAction {
    TogglePriority,
    Investigate,
    ToggleWatchlist,
    ToggleResolved,
    InvestigatePath { path: InvestigationPath },
    Neutralize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    EntityAction {
        entity_id: EntityId,
        action: EntityAction,
    },
    DisruptLink {
        from: EntityId,
        to: EntityId,
        permanent: bool,
    },
    RespondToAlert {
        event_id: EventId,
        option: ResponseKind,
    },
    DismissAlert {
        event_id: EventId,
    },
    ReviewAlert {
        event_id: EventId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("unknown event {0}")]
    UnknownEvent(EventId),
    #[error("no connection between {0} and {1}")]
    UnknownConnection(EntityId, EntityId),
    #[error(
        "not enough resources: needs {} budget, {} agents, {} data credits",
        .0.budget, .0.agents, .0.data_credits
    )]
    InsufficientResources(ResourceCost),
    #[error("investigation of entity {0} is already at the maximum level")]
    MaxLevel(EntityId),
    #[error("entity {0} is already resolved")]
    AlreadyResolved(EntityId),
    #[error("connection between {0} and {1} is already disrupted")]
    AlreadyDisrupted(EntityId, EntityId),
    #[error("event {0} does not take a response")]
    NotInteractive(EventId),
    #[error("event {0} has already been answered")]
    AlreadyAnswered(EventId),
    #[error("response window for event {0} has closed")]
    DeadlinePassed(EventId),
    #[error("response `{1:?}` is not offered for event {0}")]
    OptionNotOffered(EventId, ResponseKind),
}

impl Rejection {
    pub fn is_cost(&self) -> bool {
        matches!(self, Rejection::InsufficientResources(_))
    }
}

/// What an accepted command did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub spent: ResourceCost,
    pub logs: Vec<ConsequenceLog>,
}

fn spend(state: &mut SimulationState, cost: ResourceCost) -> Result<(), Rejection> {
    if state.resources.spend(&cost) {
        Ok(())
    } else {
        Err(Rejection::InsufficientResources(cost))
    }
}

fn record(state: &mut SimulationState, outcome: &mut ActionOutcome, log: ConsequenceLog) {
    state.consequence_logs.push(log.clone());
    let overflow = state
        .consequence_logs
        .len()
        .saturating_sub(CONSEQUENCE_LOG_LIMIT);
    state.consequence_logs.drain(..overflow);
    outcome.logs.push(log);
}

/// Apply `command` to `state`. `dismissed` is the session's dismissed-alert
/// set.
pub fn apply_command(
    state: &mut SimulationState,
    dismissed: &mut BTreeSet<EventId>,
    command: &PlayerCommand,
    now_ms: i64,
) -> Result<ActionOutcome, Rejection> {
    match *command {
        PlayerCommand::EntityAction { entity_id, action } => {
            apply_entity_action(state, entity_id, action, now_ms)
        }
        PlayerCommand::DisruptLink {
            from,
            to,
            permanent,
        } => disrupt_link(state, from, to, permanent, now_ms),
        PlayerCommand::RespondToAlert { event_id, option } => {
            respond_to_alert(state, event_id, option, now_ms)
        }
        PlayerCommand::DismissAlert { event_id } => {
            if state.event(event_id).is_none() {
                return Err(Rejection::UnknownEvent(event_id));
            }
            dismissed.insert(event_id);
            Ok(ActionOutcome::default())
        }
        PlayerCommand::ReviewAlert { event_id } => {
            dismissed.remove(&event_id);
            Ok(ActionOutcome::default())
        }
    }
}

fn apply_entity_action(
    state: &mut SimulationState,
    entity_id: EntityId,
    action: EntityAction,
    now_ms: i64,
) -> Result<ActionOutcome, Rejection> {
    let index = state
        .entity_index(entity_id)
        .ok_or(Rejection::UnknownEntity(entity_id))?;
    let mut outcome = ActionOutcome::default();

    match action {
        EntityAction::TogglePriority => {
            let flags = &mut state.entities[index].flags;
            flags.priority = !flags.priority;
        }
        EntityAction::ToggleResolved => {
            let flags = &mut state.entities[index].flags;
            flags.resolved = !flags.resolved;
        }
        EntityAction::ToggleWatchlist => {
            if state.entities[index].flags.watchlist {
                state.resources.add_agents(WATCHLIST_COST.agents);
            } else {
                spend(state, WATCHLIST_COST)?;
                outcome.spent = WATCHLIST_COST;
            }
            let flags = &mut state.entities[index].flags;
            flags.watchlist = !flags.watchlist;
        }
        EntityAction::Investigate => {
            let previous = state.entities[index].investigation_level;
            if previous >= MAX_INVESTIGATION_LEVEL {
                return Err(Rejection::MaxLevel(entity_id));
            }
            spend(state, INVESTIGATE_COST)?;
            outcome.spent = INVESTIGATE_COST;
            let entity = &mut state.entities[index];
            entity.investigation_level = previous + 1;
            entity.flags.investigated = true;
            raise_level_consequences(state, index, previous, now_ms, &mut outcome);
        }
        EntityAction::InvestigatePath { path } => {
            let maxed = state.entities[index]
                .branch(path)
                .is_some_and(|b| b.level >= MAX_BRANCH_LEVEL);
            if maxed {
                return Err(Rejection::MaxLevel(entity_id));
            }
            spend(state, INVESTIGATE_PATH_COST)?;
            outcome.spent = INVESTIGATE_PATH_COST;

            let minute = state.elapsed.minutes;
            let entity = &mut state.entities[index];
            let previous = entity.investigation_level;
            let advance = investigate_path(entity, path, minute, now_ms);
            entity.investigation_level = previous.max(entity.max_branch_level());
            entity.flags.investigated = true;

            if advance.is_some_and(|a| a.unlocks_connections) {
                let revealed = revealed_neighbours(&state.entities[index], &state.connections);
                for connection in &mut state.connections {
                    if connection
                        .other(entity_id)
                        .is_some_and(|other| revealed.contains(&other))
                    {
                        connection.revealed = true;
                    }
                }
            }
            raise_level_consequences(state, index, previous, now_ms, &mut outcome);
        }
        EntityAction::Neutralize => {
            if state.entities[index].flags.resolved {
                return Err(Rejection::AlreadyResolved(entity_id));
            }
            spend(state, NEUTRALIZE_COST)?;
            outcome.spent = NEUTRALIZE_COST;
            state.entities[index].flags.resolved = true;
            let name = state.entities[index].name.clone();
            let effects =
                apply_network_effects(entity_id, &mut state.entities, &mut state.connections, now_ms);
            let message = if effects.is_empty() {
                format!("{name} neutralized with no active network links")
            } else {
                format!("{name} neutralized; network disrupted")
            };
            let log = ConsequenceLog {
                id: format!("consequence_net_{entity_id}_{now_ms}"),
                timestamp: now_ms,
                kind: ConsequenceKind::Network,
                entity_id: Some(entity_id),
                message,
                effects,
            };
            record(state, &mut outcome, log);
        }
    }
    Ok(outcome)
}

/// Run investigation consequences when the legacy level rose to 2 or 3.
fn raise_level_consequences(
    state: &mut SimulationState,
    index: usize,
    previous: u8,
    now_ms: i64,
    outcome: &mut ActionOutcome,
) {
    let level = state.entities[index].investigation_level;
    if level <= previous || level < 2 {
        return;
    }
    let result = apply_investigation_consequences(
        &state.entities[index],
        &state.entities,
        &state.connections,
        level,
        now_ms,
    );
    state.entities[index] = result.entity;
    state.connections.extend(result.new_connections);
    if let Some(log) = result.log {
        record(state, outcome, log);
    }
}

fn disrupt_link(
    state: &mut SimulationState,
    from: EntityId,
    to: EntityId,
    permanent: bool,
    now_ms: i64,
) -> Result<ActionOutcome, Rejection> {
    let key = pair_key(from, to);
    let index = state
        .connections
        .iter()
        .position(|c| c.key() == key)
        .ok_or(Rejection::UnknownConnection(key.0, key.1))?;
    if state.connections[index].is_disrupted() {
        return Err(Rejection::AlreadyDisrupted(key.0, key.1));
    }
    spend(state, DISRUPT_COST)?;

    let connection = &mut state.connections[index];
    disrupt_connection(connection, permanent, now_ms);
    let name = |id| state.entity(id).map_or_else(|| id.to_string(), |e| e.name.clone());
    let message = format!(
        "{} link between {} and {} disrupted{}",
        state.connections[index].kind,
        name(key.0),
        name(key.1),
        if permanent { " permanently" } else { "" }
    );
    let mut outcome = ActionOutcome {
        spent: DISRUPT_COST,
        logs: Vec::new(),
    };
    let log = ConsequenceLog {
        id: format!("consequence_link_{}_{}_{now_ms}", key.0, key.1),
        timestamp: now_ms,
        kind: ConsequenceKind::Network,
        entity_id: None,
        message,
        effects: Vec::new(),
    };
    record(state, &mut outcome, log);
    Ok(outcome)
}

fn respond_to_alert(
    state: &mut SimulationState,
    event_id: EventId,
    option: ResponseKind,
    now_ms: i64,
) -> Result<ActionOutcome, Rejection> {
    let sim_now = state.sim_now();
    let index = state
        .events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or(Rejection::UnknownEvent(event_id))?;
    let event = &state.events[index];
    if !event.requires_response {
        return Err(Rejection::NotInteractive(event_id));
    }
    if event.player_response.is_some() {
        return Err(Rejection::AlreadyAnswered(event_id));
    }
    if event.response_deadline.is_some_and(|deadline| deadline <= sim_now) {
        return Err(Rejection::DeadlinePassed(event_id));
    }
    let cost = event
        .option(option)
        .ok_or(Rejection::OptionNotOffered(event_id, option))?
        .cost;
    if !state.resources.can_afford(&cost) {
        return Err(Rejection::InsufficientResources(cost));
    }

    let result = apply_alert_response_consequences(event, option, &state.entities, now_ms);
    spend(state, cost)?;
    state.events[index].player_response = Some(option);

    let mut outcome = ActionOutcome {
        spent: cost,
        logs: Vec::new(),
    };
    if let Some(result) = result {
        if let Some(entity) = state.entities.iter_mut().find(|e| e.id == result.entity.id) {
            *entity = result.entity;
        }
        record(state, &mut outcome, result.log);
    }
    Ok(outcome)
}
