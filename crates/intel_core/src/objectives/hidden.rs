use super::{build, update_objective, ObjectiveContext, ObjectiveSpec};
use crate::{
    DiscoveryCondition, GameObjective, HiddenObjective, ObjectiveId, ObjectiveReward,
    ObjectiveRule, ObjectiveStatus, ObjectiveTarget, ObjectiveType,
};

#[derive(Debug, Default)]
pub struct HiddenUpdate {
    pub discovered: Vec<ObjectiveId>,
    pub transitions: Vec<(GameObjective, ObjectiveStatus)>,
}

fn hidden(
    spec: ObjectiveSpec<'_>,
    condition: DiscoveryCondition,
    issued_minute: u64,
) -> HiddenObjective {
    HiddenObjective {
        objective: build(spec, issued_minute),
        discovered: false,
        condition,
    }
}

pub fn generate_hidden_objectives(issued_minute: u64) -> Vec<HiddenObjective> {
    vec![
        hidden(
            ObjectiveSpec {
                id: "hidden_perfectionist",
                kind: ObjectiveType::Investigate,
                title: "HIDDEN: Perfectionist",
                description: "Complete 5 objectives without any failures".to_string(),
                target: ObjectiveTarget {
                    count: Some(5),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 100,
                    budget: 3000,
                },
                rule: ObjectiveRule::FlawlessCompletions { count: 5 },
            },
            DiscoveryCondition::CompletedWithoutFailure { min_completed: 3 },
            issued_minute,
        ),
        hidden(
            ObjectiveSpec {
                id: "hidden_speed_runner",
                kind: ObjectiveType::Investigate,
                title: "HIDDEN: Speed Runner",
                description: "Complete 3 objectives in under 20 minutes".to_string(),
                target: ObjectiveTarget {
                    count: Some(3),
                    time_limit: Some(20),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 80,
                    budget: 2000,
                },
                rule: ObjectiveRule::RapidCompletions { count: 3 },
            },
            DiscoveryCondition::EarlyCompletion {
                within_minutes: 20,
                min_completed: 1,
            },
            issued_minute,
        ),
        hidden(
            ObjectiveSpec {
                id: "hidden_master_investigator",
                kind: ObjectiveType::Investigate,
                title: "HIDDEN: Master Investigator",
                description: "Reach max investigation level on 5 entities using all 3 paths"
                    .to_string(),
                target: ObjectiveTarget {
                    count: Some(5),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 150,
                    budget: 5000,
                },
                rule: ObjectiveRule::MaxedBranches { count: 5 },
            },
            DiscoveryCondition::MaxedBranches { min_entities: 2 },
            issued_minute,
        ),
        hidden(
            ObjectiveSpec {
                id: "hidden_network_breaker",
                kind: ObjectiveType::Resolve,
                title: "HIDDEN: Network Breaker",
                description: "Disrupt 10 connections in the criminal network".to_string(),
                target: ObjectiveTarget {
                    count: Some(10),
                    ..ObjectiveTarget::default()
                },
                reward: ObjectiveReward {
                    influence: 120,
                    budget: 3500,
                },
                rule: ObjectiveRule::DisruptedLinks { count: 10 },
            },
            DiscoveryCondition::DisruptedLinks { min_links: 3 },
            issued_minute,
        ),
    ]
}

pub fn discovery_met(condition: &DiscoveryCondition, ctx: &ObjectiveContext<'_>) -> bool {
    match condition {
        DiscoveryCondition::CompletedWithoutFailure { min_completed } => {
            ctx.counts.completed >= *min_completed && ctx.counts.failed == 0
        }
        DiscoveryCondition::EarlyCompletion {
            within_minutes,
            min_completed,
        } => ctx.session_minutes <= *within_minutes && ctx.counts.completed >= *min_completed,
        DiscoveryCondition::MaxedBranches { min_entities } => {
            let maxed = ctx
                .entities
                .iter()
                .filter(|e| e.branches.iter().any(|b| b.level >= 3))
                .count();
            maxed >= *min_entities as usize
        }
        DiscoveryCondition::DisruptedLinks { min_links } => {
            let disrupted = ctx.connections.iter().filter(|c| c.is_disrupted()).count();
            disrupted >= *min_links as usize
        }
    }
}

/// Reveal hidden objectives whose condition now holds and evaluate the ones
/// already revealed. A freshly revealed objective is issued at the current
/// minute.
pub fn update_hidden_objectives(
    objectives: &mut [HiddenObjective],
    ctx: &ObjectiveContext<'_>,
    now_ms: i64,
) -> HiddenUpdate {
    let mut update = HiddenUpdate::default();
    for hidden in objectives.iter_mut() {
        if !hidden.discovered {
            if !discovery_met(&hidden.condition, ctx) {
                continue;
            }
            hidden.discovered = true;
            hidden.objective.issued_minute = ctx.elapsed_minutes;
            update.discovered.push(hidden.objective.id.clone());
        }
        if let Some(status) = update_objective(&mut hidden.objective, ctx, now_ms) {
            update.transitions.push((hidden.objective.clone(), status));
        }
    }
    update
}
