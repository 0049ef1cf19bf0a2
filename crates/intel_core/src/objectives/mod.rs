//! Objectives: the starter set, procedural side objectives, progress rules,
//! rewards and failure consequences. Chains and hidden objectives build on the
//! same rule evaluator.

mod chains;
mod hidden;

pub use chains::{create_objective_chains, update_chains};
pub use hidden::{
    discovery_met, generate_hidden_objectives, update_hidden_objectives, HiddenUpdate,
};

use serde::{Deserialize, Serialize};

use crate::rng::{wrap_seed, Mulberry32};
use crate::{
    Connection, ConsequenceKind, ConsequenceLog, Entity, EntityType, GameObjective, ObjectiveCounts,
    ObjectiveId, ObjectiveReward, ObjectiveRule, ObjectiveStatus, ObjectiveTarget, ObjectiveType,
    PlayerResources, SimulationState, ThreatLevel,
};

const PREVENT_FAILURE_RISK: i64 = 15;
const PROCEDURAL_SEED_SALT: u64 = 0x5EED;

/// Read-only view the progress rules evaluate against.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveContext<'a> {
    pub entities: &'a [Entity],
    pub connections: &'a [Connection],
    pub resources: &'a PlayerResources,
    pub counts: ObjectiveCounts,
    /// Simulated minutes since the epoch.
    pub elapsed_minutes: u64,
    /// Simulated minutes since the session started.
    pub session_minutes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Measure {
    progress: u32,
    satisfied: bool,
}

/// What one objective check changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveReport {
    pub completed: Vec<ObjectiveId>,
    pub failed: Vec<ObjectiveId>,
    pub discovered: Vec<ObjectiveId>,
    pub logs: Vec<ConsequenceLog>,
}

impl ObjectiveReport {
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
            && self.failed.is_empty()
            && self.discovered.is_empty()
            && self.logs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

pub(crate) struct ObjectiveSpec<'a> {
    pub id: &'a str,
    pub kind: ObjectiveType,
    pub title: &'a str,
    pub description: String,
    pub target: ObjectiveTarget,
    pub reward: ObjectiveReward,
    pub rule: ObjectiveRule,
}

pub(crate) fn build(spec: ObjectiveSpec<'_>, issued_minute: u64) -> GameObjective {
    let progress = match spec.rule {
        ObjectiveRule::HoldBudget { .. } => 100,
        _ => 0,
    };
    GameObjective {
        id: ObjectiveId::new(spec.id),
        kind: spec.kind,
        title: spec.title.to_string(),
        description: spec.description,
        target: spec.target,
        progress,
        status: ObjectiveStatus::Active,
        reward: spec.reward,
        rule: spec.rule,
        issued_minute,
        resolved_at_ms: None,
    }
}

fn count_threat(entities: &[Entity], threat: ThreatLevel) -> usize {
    entities.iter().filter(|e| e.threat == threat).count()
}

fn as_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// The opening objectives for a snapshot of `entities`.
pub fn generate_objectives(entities: &[Entity], elapsed_minutes: u64) -> Vec<GameObjective> {
    let mut objectives = Vec::new();

    let critical = count_threat(entities, ThreatLevel::Critical);
    if critical > 0 {
        objectives.push(build(
            ObjectiveSpec {
                id: "obj_prevent_critical",
                kind: ObjectiveType::Prevent,
                title: "PREVENT: Operation Ghost Protocol",
                description: "Investigate all critical entities before they execute their operation"
                    .to_string(),
                target: ObjectiveTarget {
                    count: Some(as_count(critical)),
                    time_limit: Some(60),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 100,
                    budget: 2000,
                },
                rule: ObjectiveRule::HandleAllCritical,
            },
            elapsed_minutes,
        ));
    }

    if count_threat(entities, ThreatLevel::High) >= 3 {
        objectives.push(build(
            ObjectiveSpec {
                id: "obj_resolve_high",
                kind: ObjectiveType::Resolve,
                title: "RESOLVE: Network Disruption",
                description: "Mark 3 high-priority entities as resolved through investigation"
                    .to_string(),
                target: ObjectiveTarget {
                    count: Some(3),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 50,
                    budget: 1000,
                },
                rule: ObjectiveRule::ResolveAtThreat {
                    threat: ThreatLevel::High,
                    count: 3,
                },
            },
            elapsed_minutes,
        ));
    }

    objectives.push(build(
        ObjectiveSpec {
            id: "obj_maintain_budget",
            kind: ObjectiveType::Maintain,
            title: "MAINTAIN: Resource Management",
            description: "Keep budget above $5,000 for the next 30 minutes".to_string(),
            target: ObjectiveTarget {
                count: Some(5000),
                time_limit: Some(30),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 25,
                budget: 0,
            },
            rule: ObjectiveRule::HoldBudget { floor: 5000 },
        },
        elapsed_minutes,
    ));

    objectives.push(build(
        ObjectiveSpec {
            id: "obj_investigate_deep",
            kind: ObjectiveType::Investigate,
            title: "INVESTIGATE: Deep Analysis Protocol",
            description: "Reach investigation level 3 on any 2 entities".to_string(),
            target: ObjectiveTarget {
                count: Some(2),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 40,
                budget: 500,
            },
            rule: ObjectiveRule::DeepInvestigations { count: 2 },
        },
        elapsed_minutes,
    ));

    objectives
}

/// Situational side objectives, seeded by the session's starting minute.
/// Two or three of the candidates are kept.
pub fn generate_procedural_objectives(
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Vec<GameObjective> {
    let mut rng = Mulberry32::new(wrap_seed(elapsed_minutes ^ PROCEDURAL_SEED_SALT));
    let mut objectives = Vec::new();
    objectives.extend(city_objective(&mut rng, entities, elapsed_minutes));
    objectives.extend(transaction_objective(&mut rng, entities, elapsed_minutes));
    objectives.extend(network_objective(&mut rng, entities, elapsed_minutes));
    objectives.extend(cyber_objective(&mut rng, entities, elapsed_minutes));

    let keep = usize::try_from(rng.range(2, 2)).unwrap_or(2);
    objectives.truncate(keep);
    objectives
}

fn city_objective(
    rng: &mut Mulberry32,
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Option<GameObjective> {
    let cities = cities_with_pairs(entities);
    if cities.is_empty() || rng.next_f64() <= 0.5 {
        return None;
    }
    let (city, members) = rng.pick(&cities)?;
    let hot = members.iter().filter(|e| e.threat.is_elevated()).count();
    if hot == 0 {
        return None;
    }
    let slug = city.split_whitespace().collect::<Vec<_>>().join("_");
    let id = format!("obj_proc_city_{}", slug.to_lowercase());
    let hot = as_count(hot);
    Some(build(
        ObjectiveSpec {
            id: &id,
            kind: ObjectiveType::Investigate,
            title: &format!("INTERCEPT: {city} Operation"),
            description: format!(
                "Investigate suspicious activity in {city} - {hot} entity(s) detected"
            ),
            target: ObjectiveTarget {
                count: Some(hot),
                time_limit: Some(45),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 30 + hot * 10,
                budget: 800,
            },
            rule: ObjectiveRule::SecureCity {
                city: (*city).to_string(),
            },
        },
        elapsed_minutes,
    ))
}

fn transaction_objective(
    rng: &mut Mulberry32,
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Option<GameObjective> {
    let financial: Vec<&Entity> = entities.iter().filter(|e| e.kind.is_financial()).collect();
    if financial.is_empty() || rng.next_f64() <= 0.6 {
        return None;
    }
    let target = rng.pick(&financial)?;
    Some(build(
        ObjectiveSpec {
            id: &format!("obj_proc_transaction_{}", target.id),
            kind: ObjectiveType::Prevent,
            title: "URGENT: Financial Transaction",
            description: format!(
                "Stop suspicious transaction from {} within 30 minutes",
                target.name
            ),
            target: ObjectiveTarget {
                entity_id: Some(target.id),
                time_limit: Some(30),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 50,
                budget: 1200,
            },
            rule: ObjectiveRule::HandleEntity {
                entity_id: target.id,
            },
        },
        elapsed_minutes,
    ))
}

fn network_objective(
    rng: &mut Mulberry32,
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Option<GameObjective> {
    let high = count_threat(entities, ThreatLevel::High);
    if high < 4 || rng.next_f64() <= 0.4 {
        return None;
    }
    let count = as_count(high.min(5));
    Some(build(
        ObjectiveSpec {
            id: "obj_proc_network_disrupt",
            kind: ObjectiveType::Resolve,
            title: "DISRUPT: Criminal Network",
            description: format!("Neutralize {count} high-threat entities in the network"),
            target: ObjectiveTarget {
                count: Some(count),
                time_limit: Some(60),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 75,
                budget: 1500,
            },
            rule: ObjectiveRule::ResolveAtThreat {
                threat: ThreatLevel::High,
                count,
            },
        },
        elapsed_minutes,
    ))
}

fn cyber_objective(
    rng: &mut Mulberry32,
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Option<GameObjective> {
    let cyber = entities.iter().filter(|e| e.kind == EntityType::Cyber).count();
    if cyber < 2 || rng.next_f64() <= 0.5 {
        return None;
    }
    let cyber = as_count(cyber);
    Some(build(
        ObjectiveSpec {
            id: "obj_proc_cyber_response",
            kind: ObjectiveType::Investigate,
            title: "DEFEND: Cyber Attack",
            description: format!("Investigate {cyber} cyber threats before systems are compromised"),
            target: ObjectiveTarget {
                count: Some(cyber),
                time_limit: Some(40),
                ..ObjectiveTarget::default()
            },
            reward: ObjectiveReward {
                influence: 60,
                budget: 1000,
            },
            rule: ObjectiveRule::HandleAllOfType {
                kind: EntityType::Cyber,
            },
        },
        elapsed_minutes,
    ))
}

/// Cities with at least two entities, in first-seen order.
fn cities_with_pairs(entities: &[Entity]) -> Vec<(&str, Vec<&Entity>)> {
    let mut groups: Vec<(&str, Vec<&Entity>)> = Vec::new();
    for entity in entities {
        match groups.iter_mut().find(|(city, _)| *city == entity.city) {
            Some((_, members)) => members.push(entity),
            None => groups.push((entity.city.as_str(), vec![entity])),
        }
    }
    groups.retain(|(_, members)| members.len() >= 2);
    groups
}

// ---------------------------------------------------------------------------
// Progress rules
// ---------------------------------------------------------------------------

fn ratio(achieved: usize, needed: u32) -> u32 {
    if needed == 0 {
        return 100;
    }
    let pct = (achieved as f64 / f64::from(needed) * 100.0).round().min(100.0);
    // Bounded to 0..=100 above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pct = pct as u32;
    pct
}

fn reached(achieved: usize, needed: u32) -> Measure {
    Measure {
        progress: ratio(achieved, needed),
        satisfied: achieved >= needed as usize,
    }
}

/// Share of `pool` that has been investigated or resolved; an empty pool
/// counts as done.
fn handled_share<'a>(pool: impl Iterator<Item = &'a Entity>) -> Measure {
    let (total, handled) = pool.fold((0_usize, 0_usize), |(total, handled), entity| {
        (total + 1, handled + usize::from(entity.flags.handled()))
    });
    if total == 0 {
        return Measure {
            progress: 100,
            satisfied: true,
        };
    }
    let progress = ratio(handled, as_count(total));
    Measure {
        progress,
        satisfied: progress >= 100,
    }
}

fn count_where(entities: &[Entity], predicate: impl Fn(&Entity) -> bool) -> usize {
    entities.iter().filter(|e| predicate(e)).count()
}

fn measure(rule: &ObjectiveRule, ctx: &ObjectiveContext<'_>) -> Measure {
    let entities = ctx.entities;
    match rule {
        ObjectiveRule::HandleAllCritical => {
            handled_share(entities.iter().filter(|e| e.threat == ThreatLevel::Critical))
        }
        ObjectiveRule::ResolveAtThreat { threat, count } => reached(
            count_where(entities, |e| e.threat == *threat && e.flags.resolved),
            *count,
        ),
        ObjectiveRule::HoldBudget { floor } => {
            let budget = ctx.resources.budget;
            Measure {
                progress: if budget >= *floor {
                    100
                } else {
                    ratio(budget as usize, *floor)
                },
                satisfied: budget >= *floor,
            }
        }
        ObjectiveRule::DeepInvestigations { count } => {
            reached(count_where(entities, |e| e.investigation_level >= 3), *count)
        }
        ObjectiveRule::SecureCity { city } => handled_share(
            entities
                .iter()
                .filter(|e| e.city.eq_ignore_ascii_case(city) && e.threat.is_elevated()),
        ),
        ObjectiveRule::HandleEntity { entity_id } => {
            let handled = entities
                .iter()
                .any(|e| e.id == *entity_id && e.flags.handled());
            Measure {
                progress: if handled { 100 } else { 0 },
                satisfied: handled,
            }
        }
        ObjectiveRule::HandleAllOfType { kind } => {
            handled_share(entities.iter().filter(|e| e.kind == *kind))
        }
        ObjectiveRule::FlagPriority { count } => {
            reached(count_where(entities, |e| e.flags.priority), *count)
        }
        ObjectiveRule::PriorityAtLevel { level, count } => reached(
            count_where(entities, |e| {
                e.flags.priority && e.investigation_level >= *level
            }),
            *count,
        ),
        ObjectiveRule::ResolvePriority { count } => reached(
            count_where(entities, |e| e.flags.priority && e.flags.resolved),
            *count,
        ),
        ObjectiveRule::InvestigateFinancial { count } => reached(
            count_where(entities, |e| e.kind.is_financial() && e.flags.investigated),
            *count,
        ),
        ObjectiveRule::FinancialBranches { count } => reached(
            count_where(entities, |e| {
                e.branch(crate::InvestigationPath::Financial)
                    .is_some_and(|b| b.level > 0)
            }),
            *count,
        ),
        ObjectiveRule::FlawlessCompletions { count } => {
            if ctx.counts.failed > 0 {
                Measure {
                    progress: 0,
                    satisfied: false,
                }
            } else {
                reached(ctx.counts.completed as usize, *count)
            }
        }
        ObjectiveRule::RapidCompletions { count } => {
            reached(ctx.counts.completed as usize, *count)
        }
        ObjectiveRule::MaxedBranches { count } => reached(
            count_where(entities, |e| e.branches.iter().any(|b| b.level >= 3)),
            *count,
        ),
        ObjectiveRule::DisruptedLinks { count } => reached(
            ctx.connections.iter().filter(|c| c.is_disrupted()).count(),
            *count,
        ),
    }
}

/// Re-measure one objective. Returns the new status when it just became
/// terminal; terminal objectives are never touched again.
pub fn update_objective(
    objective: &mut GameObjective,
    ctx: &ObjectiveContext<'_>,
    now_ms: i64,
) -> Option<ObjectiveStatus> {
    if objective.status.is_terminal() {
        return None;
    }

    let measured = measure(&objective.rule, ctx);
    objective.progress = measured.progress;

    let expired = objective
        .target
        .time_limit
        .is_some_and(|limit| ctx.elapsed_minutes >= objective.issued_minute + limit);

    let next = if let ObjectiveRule::HoldBudget { .. } = objective.rule {
        if !measured.satisfied {
            Some(ObjectiveStatus::Failed)
        } else if expired {
            Some(ObjectiveStatus::Completed)
        } else {
            None
        }
    } else if measured.satisfied {
        objective.progress = 100;
        Some(ObjectiveStatus::Completed)
    } else if expired {
        Some(ObjectiveStatus::Failed)
    } else {
        None
    };

    if let Some(status) = next {
        objective.status = status;
        objective.resolved_at_ms = Some(now_ms);
    }
    next
}

/// Credit a completed objective's reward. Budget is capped at its maximum.
pub fn apply_reward(resources: &mut PlayerResources, reward: &ObjectiveReward) {
    resources.influence = resources.influence.saturating_add(reward.influence);
    resources.add_budget(reward.budget);
}

/// Side effects of a failed objective. Failed `prevent` objectives push every
/// critical or high entity 15 points further.
pub fn apply_failure_consequences(
    objective: &GameObjective,
    entities: &mut [Entity],
    now_ms: i64,
) -> ConsequenceLog {
    let mut effects = Vec::new();
    let message = match (&objective.rule, objective.kind) {
        (ObjectiveRule::HandleEntity { .. }, _) => {
            "Transaction completed - criminal network gained $5000".to_string()
        }
        (_, ObjectiveType::Prevent) => {
            for entity in entities.iter_mut().filter(|e| e.threat.is_elevated()) {
                let before = entity.risk;
                entity.shift_risk(i64::from(before) + PREVENT_FAILURE_RISK);
                effects.push(format!("{}: risk {before} → {}", entity.name, entity.risk));
            }
            "Failed to prevent operation - threat levels increased by 15%".to_string()
        }
        (_, ObjectiveType::Maintain) => {
            "Resource management failure - operational effectiveness reduced".to_string()
        }
        _ => format!("Objective failed: {}", objective.title),
    };
    ConsequenceLog {
        id: format!("consequence_objective_{}_{now_ms}", objective.id),
        timestamp: now_ms,
        kind: ConsequenceKind::Objective,
        entity_id: objective.target.entity_id,
        message,
        effects,
    }
}

// ---------------------------------------------------------------------------
// Objective check
// ---------------------------------------------------------------------------

/// One pass of the objective check: standalone objectives, chains, hidden
/// objectives; then rewards and failure consequences for every transition.
pub fn check_objectives(
    state: &mut SimulationState,
    session_minutes: u64,
    now_ms: i64,
) -> ObjectiveReport {
    let counts = state.objective_counts();
    let mut report = ObjectiveReport::default();

    let transitions = {
        let ctx = ObjectiveContext {
            entities: &state.entities,
            connections: &state.connections,
            resources: &state.resources,
            counts,
            elapsed_minutes: state.elapsed.minutes,
            session_minutes,
        };

        let mut transitions: Vec<(GameObjective, ObjectiveStatus)> = Vec::new();
        for objective in &mut state.objectives {
            if let Some(status) = update_objective(objective, &ctx, now_ms) {
                transitions.push((objective.clone(), status));
            }
        }
        transitions.extend(update_chains(&mut state.objective_chains, &ctx, now_ms));
        let hidden = update_hidden_objectives(&mut state.hidden_objectives, &ctx, now_ms);
        report.discovered = hidden.discovered;
        transitions.extend(hidden.transitions);
        transitions
    };

    for (objective, status) in transitions {
        match status {
            ObjectiveStatus::Completed => {
                apply_reward(&mut state.resources, &objective.reward);
                report.completed.push(objective.id);
            }
            ObjectiveStatus::Failed => {
                let log = apply_failure_consequences(&objective, &mut state.entities, now_ms);
                report.logs.push(log);
                report.failed.push(objective.id);
            }
            ObjectiveStatus::Active => {}
        }
    }
    report
}

#[cfg(test)]
mod tests;
