use std::collections::BTreeMap;

use super::{build, update_objective, ObjectiveContext, ObjectiveSpec};
use crate::{
    ChainId, ChainUnlock, GameObjective, ObjectiveChain, ObjectiveReward, ObjectiveRule,
    ObjectiveStatus, ObjectiveTarget, ObjectiveType,
};

struct StepSpec {
    id: &'static str,
    kind: ObjectiveType,
    title: &'static str,
    description: &'static str,
    count: u32,
    reward: (u32, u32),
    rule: ObjectiveRule,
}

fn steps(specs: Vec<StepSpec>, issued_minute: u64) -> Vec<GameObjective> {
    specs
        .into_iter()
        .map(|step| {
            build(
                ObjectiveSpec {
                    id: step.id,
                    kind: step.kind,
                    title: step.title,
                    description: step.description.to_string(),
                    target: ObjectiveTarget {
                        count: Some(step.count),
                        ..ObjectiveTarget::default()
                    },
                    reward: ObjectiveReward {
                        influence: step.reward.0,
                        budget: step.reward.1,
                    },
                    rule: step.rule,
                },
                issued_minute,
            )
        })
        .collect()
}

/// The two multi-step operations. The takedown chain is open from the start;
/// the money trail opens once the first takedown step is done.
pub fn create_objective_chains(issued_minute: u64) -> Vec<ObjectiveChain> {
    let takedown = ChainId::new("chain_operation_takedown");
    vec![
        ObjectiveChain {
            id: takedown.clone(),
            name: "Operation Takedown".to_string(),
            description: "Systematically dismantle the criminal organization".to_string(),
            steps: steps(
                vec![
                    StepSpec {
                        id: "chain_takedown_1",
                        kind: ObjectiveType::Investigate,
                        title: "CHAIN 1: Identify Leaders",
                        description: "Flag 3 priority targets in the organization",
                        count: 3,
                        reward: (20, 500),
                        rule: ObjectiveRule::FlagPriority { count: 3 },
                    },
                    StepSpec {
                        id: "chain_takedown_2",
                        kind: ObjectiveType::Investigate,
                        title: "CHAIN 2: Gather Evidence",
                        description: "Reach investigation level 2 on all flagged targets",
                        count: 3,
                        reward: (40, 1000),
                        rule: ObjectiveRule::PriorityAtLevel { level: 2, count: 3 },
                    },
                    StepSpec {
                        id: "chain_takedown_3",
                        kind: ObjectiveType::Resolve,
                        title: "CHAIN 3: Execute Takedown",
                        description: "Mark all targets as resolved",
                        count: 3,
                        reward: (100, 2500),
                        rule: ObjectiveRule::ResolvePriority { count: 3 },
                    },
                ],
                issued_minute,
            ),
            current_step: 0,
            unlocked: true,
            unlock: ChainUnlock::Always,
        },
        ObjectiveChain {
            id: ChainId::new("chain_financial_trail"),
            name: "Follow the Money".to_string(),
            description: "Track financial transactions to expose money laundering".to_string(),
            steps: steps(
                vec![
                    StepSpec {
                        id: "chain_financial_1",
                        kind: ObjectiveType::Investigate,
                        title: "CHAIN 1: Identify Transactions",
                        description: "Investigate 2 financial entities",
                        count: 2,
                        reward: (30, 800),
                        rule: ObjectiveRule::InvestigateFinancial { count: 2 },
                    },
                    StepSpec {
                        id: "chain_financial_2",
                        kind: ObjectiveType::Investigate,
                        title: "CHAIN 2: Trace the Network",
                        description: "Use financial investigation path on 3 entities",
                        count: 3,
                        reward: (50, 1200),
                        rule: ObjectiveRule::FinancialBranches { count: 3 },
                    },
                ],
                issued_minute,
            ),
            current_step: 0,
            unlocked: false,
            unlock: ChainUnlock::AfterStep {
                chain: takedown,
                step: 0,
            },
        },
    ]
}

/// Unlock chains whose prerequisite step is done, then evaluate the live step
/// of every unlocked chain. A completed step moves the cursor on and issues
/// the next step at the current minute.
pub fn update_chains(
    chains: &mut [ObjectiveChain],
    ctx: &ObjectiveContext<'_>,
    now_ms: i64,
) -> Vec<(GameObjective, ObjectiveStatus)> {
    let cursors: BTreeMap<ChainId, usize> = chains
        .iter()
        .map(|chain| (chain.id.clone(), chain.current_step))
        .collect();
    let mut transitions = Vec::new();

    for chain in chains.iter_mut() {
        if !chain.unlocked {
            chain.unlocked = match &chain.unlock {
                ChainUnlock::Always => true,
                ChainUnlock::AfterStep { chain: other, step } => {
                    cursors.get(other).is_some_and(|cursor| cursor > step)
                }
            };
            if !chain.unlocked {
                continue;
            }
            if let Some(step) = chain.steps.get_mut(chain.current_step) {
                step.issued_minute = ctx.elapsed_minutes;
            }
        }

        let cursor = chain.current_step;
        let Some(step) = chain.steps.get_mut(cursor) else {
            continue;
        };
        let Some(status) = update_objective(step, ctx, now_ms) else {
            continue;
        };
        transitions.push((step.clone(), status));
        if status == ObjectiveStatus::Completed {
            chain.current_step += 1;
            if let Some(next) = chain.steps.get_mut(chain.current_step) {
                next.issued_minute = ctx.elapsed_minutes;
            }
        }
    }

    transitions
}
