use super::*;
use crate::clock::{EPOCH_MS, HOUR_MS, MINUTE_MS};
use crate::test_fixtures::{base_catalog, make_rng};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;


// --- Shared test helpers ------------------------------------------------

fn world_at(hours: i64) -> SimulationState {
    assemble(&base_catalog(), EPOCH_MS + hours * HOUR_MS, TimeSpeed::REALTIME)
}

fn random_entity_action(rng: &mut ChaCha8Rng) -> EntityAction {
    match rng.gen_range(0..6) {
        0 => EntityAction::TogglePriority,
        1 => EntityAction::Investigate,
        2 => EntityAction::ToggleWatchlist,
        3 => EntityAction::ToggleResolved,
        4 => EntityAction::InvestigatePath {
            path: InvestigationPath::ALL[rng.gen_range(0..InvestigationPath::ALL.len())],
        },
        _ => EntityAction::Neutralize,
    }
}

/// A command against `state`; roughly one in ten targets an unknown id.
fn random_command(state: &SimulationState, rng: &mut ChaCha8Rng) -> PlayerCommand {
    let bogus = rng.gen_bool(0.1);
    let entity_id = if bogus || state.entities.is_empty() {
        EntityId(9_999)
    } else {
        state.entities[rng.gen_range(0..state.entities.len())].id
    };
    let event_id = if bogus || state.events.is_empty() {
        EventId(9_999)
    } else {
        state.events[rng.gen_range(0..state.events.len())].id
    };

    match rng.gen_range(0..10) {
        0..=5 => PlayerCommand::EntityAction {
            entity_id,
            action: random_entity_action(rng),
        },
        6 => match state.connections.get(rng.gen_range(0..state.connections.len().max(1))) {
            Some(link) if !bogus => PlayerCommand::DisruptLink {
                from: link.from,
                to: link.to,
                permanent: rng.gen_bool(0.5),
            },
            _ => PlayerCommand::DisruptLink {
                from: entity_id,
                to: EntityId(9_998),
                permanent: false,
            },
        },
        7 => PlayerCommand::RespondToAlert {
            event_id,
            option: [ResponseKind::Investigate, ResponseKind::Monitor, ResponseKind::Dismiss]
                [rng.gen_range(0..3)],
        },
        8 => PlayerCommand::DismissAlert { event_id },
        _ => PlayerCommand::ReviewAlert { event_id },
    }
}

fn terminal_statuses(state: &SimulationState) -> Vec<(ObjectiveId, ObjectiveStatus)> {
    state
        .objectives
        .iter()
        .chain(state.objective_chains.iter().flat_map(|c| c.steps.iter()))
        .filter(|o| o.status.is_terminal())
        .map(|o| (o.id.clone(), o.status))
        .collect()
}

fn assert_resources_bounded(resources: &PlayerResources) {
    assert!(resources.budget <= resources.max_budget, "{resources:?}");
    assert!(resources.agents <= resources.max_agents, "{resources:?}");
    assert!(
        resources.data_credits <= resources.max_data_credits,
        "{resources:?}"
    );
}
