use std::collections::BTreeSet;

use intel_core::{
    Entity, EntityAction, EntityId, EntityType, EventId, InvestigationPath, PlayerCommand,
    PlayerResources, ResourceCost, ResponseKind, SimulationState, ThreatLevel, TimelineEvent,
    INVESTIGATE_COST, INVESTIGATE_PATH_COST, NEUTRALIZE_COST,
};

pub trait ActionSource {
    fn generate_actions(
        &mut self,
        state: &SimulationState,
        dismissed: &BTreeSet<EventId>,
    ) -> Vec<PlayerCommand>;
}

/// Plays the operation automatically, one pass per call:
/// 1. Answer the most urgent pending alert.
/// 2. Flag critical entities as priority.
/// 3. Deepen the riskiest open investigation.
/// 4. Neutralize fully investigated critical entities.
/// 5. Close out investigated high-threat entities.
#[derive(Debug, Clone)]
pub struct AutoAnalyst {
    /// Budget that discretionary spending never dips below.
    budget_reserve: u32,
}

/// Matches the starter "maintain budget" objective.
const DEFAULT_BUDGET_RESERVE: u32 = 5_000;
const MAX_LEVEL: u8 = 3;

impl AutoAnalyst {
    pub fn new(budget_reserve: u32) -> Self {
        Self { budget_reserve }
    }
}

impl Default for AutoAnalyst {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET_RESERVE)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Resources left after the commands already emitted this pass.
struct Wallet {
    resources: PlayerResources,
}

impl Wallet {
    fn try_spend(&mut self, cost: &ResourceCost, reserve: u32) -> bool {
        if self.resources.budget.saturating_sub(cost.budget) < reserve {
            return false;
        }
        self.resources.spend(cost)
    }
}

fn entity_command(entity_id: EntityId, action: EntityAction) -> PlayerCommand {
    PlayerCommand::EntityAction { entity_id, action }
}

/// Pending, not dismissed, critical first then newest.
fn most_urgent_alert<'a>(
    state: &'a SimulationState,
    dismissed: &BTreeSet<EventId>,
) -> Option<&'a TimelineEvent> {
    let sim_now = state.sim_now();
    state
        .events
        .iter()
        .filter(|e| e.is_pending(sim_now) && !dismissed.contains(&e.id))
        .max_by(|a, b| a.severity.cmp(&b.severity).then(a.time.cmp(&b.time)))
}

/// Investigate when affordable, otherwise monitor. Dismissing escalates, so
/// an unaffordable alert is left to expire.
fn alert_response(
    state: &SimulationState,
    dismissed: &BTreeSet<EventId>,
    wallet: &mut Wallet,
) -> Option<PlayerCommand> {
    let event = most_urgent_alert(state, dismissed)?;
    [ResponseKind::Investigate, ResponseKind::Monitor]
        .into_iter()
        .filter_map(|kind| event.option(kind))
        .find(|option| wallet.try_spend(&option.cost, 0))
        .map(|option| PlayerCommand::RespondToAlert {
            event_id: event.id,
            option: option.id,
        })
}

fn priority_flags(state: &SimulationState) -> Vec<PlayerCommand> {
    state
        .entities
        .iter()
        .filter(|e| e.threat == ThreatLevel::Critical && !e.flags.priority && !e.flags.resolved)
        .map(|e| entity_command(e.id, EntityAction::TogglePriority))
        .collect()
}

fn preferred_path(entity: &Entity) -> Option<InvestigationPath> {
    let path = match entity.kind {
        EntityType::Financial | EntityType::Company => InvestigationPath::Financial,
        EntityType::Cyber | EntityType::Comms => InvestigationPath::Cyber,
        _ => return None,
    };
    let open = entity.branch(path).is_none_or(|b| b.level < MAX_LEVEL);
    open.then_some(path)
}

/// Riskiest unresolved entity below max level. Financial and cyber targets
/// go down their matching branch; everything else uses the plain level.
fn investigation(
    state: &SimulationState,
    wallet: &mut Wallet,
    reserve: u32,
) -> Option<PlayerCommand> {
    let target = state
        .entities
        .iter()
        .filter(|e| !e.flags.resolved && e.investigation_level < MAX_LEVEL)
        .max_by(|a, b| a.risk.cmp(&b.risk).then(b.id.cmp(&a.id)))?;

    let (action, cost) = match preferred_path(target) {
        Some(path) => (EntityAction::InvestigatePath { path }, INVESTIGATE_PATH_COST),
        None => (EntityAction::Investigate, INVESTIGATE_COST),
    };
    wallet
        .try_spend(&cost, reserve)
        .then(|| entity_command(target.id, action))
}

fn neutralization(
    state: &SimulationState,
    wallet: &mut Wallet,
    reserve: u32,
) -> Option<PlayerCommand> {
    let target = state.entities.iter().find(|e| {
        e.threat == ThreatLevel::Critical
            && e.investigation_level >= MAX_LEVEL
            && !e.flags.resolved
    })?;
    wallet
        .try_spend(&NEUTRALIZE_COST, reserve)
        .then(|| entity_command(target.id, EntityAction::Neutralize))
}

fn resolutions(state: &SimulationState) -> Vec<PlayerCommand> {
    state
        .entities
        .iter()
        .filter(|e| {
            e.threat == ThreatLevel::High && e.investigation_level >= 2 && !e.flags.resolved
        })
        .map(|e| entity_command(e.id, EntityAction::ToggleResolved))
        .collect()
}

// ---------------------------------------------------------------------------
// AutoAnalyst
// ---------------------------------------------------------------------------

impl ActionSource for AutoAnalyst {
    fn generate_actions(
        &mut self,
        state: &SimulationState,
        dismissed: &BTreeSet<EventId>,
    ) -> Vec<PlayerCommand> {
        let mut wallet = Wallet {
            resources: state.resources.clone(),
        };
        let mut commands = Vec::new();

        // Priority 1: an alert about to expire outranks everything.
        commands.extend(alert_response(state, dismissed, &mut wallet));

        // Priority 2: free bookkeeping.
        commands.extend(priority_flags(state));

        // Priority 3: deepen the riskiest investigation.
        commands.extend(investigation(state, &mut wallet, self.budget_reserve));

        // Priority 4: take out maxed critical nodes.
        commands.extend(neutralization(state, &mut wallet, self.budget_reserve));

        // Priority 5: close investigated high-threat entities.
        commands.extend(resolutions(state));

        commands
    }
}
