//! Achievements and score.
//!
//! Each achievement is a row in a static rule table evaluated against
//! [`AchievementFacts`]. Unlocks are monotonic; `completionist` unlocks once
//! every other row has.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    Achievement, AchievementCategory, AchievementId, AchievementTier, Entity, EventId,
    ObjectiveCounts, PlayerResources, SimulationState,
};

const COMPLETIONIST: &str = "completionist";
const BALANCE_RATIO: f64 = 0.8;
const MINUTE_MS: i64 = 60_000;

/// Cumulative facts achievements are checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AchievementFacts {
    pub investigated_entities: u32,
    pub maxed_entities: u32,
    pub responded_alerts: u32,
    pub resolved_entities: u32,
    pub priority_entities: u32,
    pub objectives: ObjectiveCounts,
    /// Lowest budget / max budget observed this session.
    pub min_budget_ratio: f64,
    pub longest_balanced_ms: i64,
    pub efficient_completions: u32,
    pub first_completion_ms: Option<i64>,
    pub completions_within_15_min: u32,
    pub fast_responses: u32,
    pub views_visited: u32,
    pub enabled_sources: u32,
    pub total_sources: u32,
    pub session_ms: i64,
}

enum Goal {
    Reached(fn(&AchievementFacts) -> bool),
    Progress(u32, fn(&AchievementFacts) -> u32),
}

struct Rule {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: AchievementCategory,
    tier: AchievementTier,
    points: u32,
    hidden: bool,
    goal: Goal,
}

const fn rule(
    id: &'static str,
    title: &'static str,
    description: &'static str,
    category: AchievementCategory,
    tier: AchievementTier,
    points: u32,
    goal: Goal,
) -> Rule {
    Rule {
        id,
        title,
        description,
        category,
        tier,
        points,
        hidden: false,
        goal,
    }
}

use AchievementCategory::{Investigation, Mastery, Special, Speed, Strategy};
use AchievementTier::{Bronze, Gold, Platinum, Silver};

const RULES: [Rule; 19] = [
    rule("first_investigation", "First Steps", "Complete your first entity investigation",
        Investigation, Bronze, 10, Goal::Reached(|f| f.investigated_entities > 0)),
    rule("master_investigator", "Master Investigator", "Reach investigation level 3 on any entity",
        Investigation, Silver, 25, Goal::Reached(|f| f.maxed_entities > 0)),
    rule("deep_dive", "Deep Dive", "Investigate 10 different entities",
        Investigation, Gold, 50, Goal::Progress(10, |f| f.investigated_entities)),
    rule("thorough_analyst", "Thorough Analyst", "Reach max investigation level on 5 entities",
        Investigation, Platinum, 100, Goal::Progress(5, |f| f.maxed_entities)),
    rule("first_alert", "Rapid Response", "Respond to your first critical alert",
        Strategy, Bronze, 10, Goal::Reached(|f| f.responded_alerts > 0)),
    rule("resource_manager", "Resource Manager", "Never let budget drop below 50%",
        Strategy, Silver, 30,
        Goal::Reached(|f| f.min_budget_ratio >= 0.5 && f.session_ms >= 30 * MINUTE_MS)),
    rule("no_waste", "Efficient Operator", "Complete 5 objectives without wasting resources",
        Strategy, Gold, 50, Goal::Progress(5, |f| f.efficient_completions)),
    rule("perfect_balance", "Perfect Balance", "Maintain all resources above 80% for 10 minutes",
        Strategy, Platinum, 100, Goal::Reached(|f| f.longest_balanced_ms >= 10 * MINUTE_MS)),
    rule("quick_start", "Quick Start", "Complete first objective within 5 minutes",
        Speed, Bronze, 15,
        Goal::Reached(|f| f.first_completion_ms.is_some_and(|at| at <= 5 * MINUTE_MS))),
    rule("speed_runner", "Speed Runner", "Complete 3 objectives in under 15 minutes",
        Speed, Silver, 40, Goal::Reached(|f| f.completions_within_15_min >= 3)),
    rule("lightning_fast", "Lightning Fast", "Respond to 5 alerts within 30 seconds each",
        Speed, Gold, 60, Goal::Progress(5, |f| f.fast_responses)),
    rule("first_objective", "Mission Complete", "Complete your first objective",
        Mastery, Bronze, 15, Goal::Reached(|f| f.objectives.completed > 0)),
    rule("objective_master", "Objective Master", "Complete all available objectives",
        Mastery, Gold, 75,
        Goal::Reached(|f| f.objectives.total > 0 && f.objectives.completed == f.objectives.total)),
    rule("perfect_operation", "Perfect Operation", "Complete all objectives without any failures",
        Mastery, Platinum, 150,
        Goal::Reached(|f| {
            f.objectives.total > 0
                && f.objectives.completed == f.objectives.total
                && f.objectives.failed == 0
        })),
    rule("threat_eliminator", "Threat Eliminator", "Resolve 20 entities marked as threats",
        Mastery, Gold, 80, Goal::Progress(20, |f| f.resolved_entities)),
    rule("eagle_eye", "Eagle Eye", "Flag 10 entities as priority",
        Special, Bronze, 20, Goal::Progress(10, |f| f.priority_entities)),
    rule("network_analyst", "Network Analyst", "View all 5 analytical views",
        Special, Bronze, 10, Goal::Reached(|f| f.views_visited >= 5)),
    rule("data_hoarder", "Data Hoarder", "Enable all 8 data sources simultaneously",
        Special, Silver, 25,
        Goal::Reached(|f| f.total_sources > 0 && f.enabled_sources >= f.total_sources)),
    Rule {
        hidden: true,
        ..rule("persistence", "Persistence Pays Off", "Play for 30 consecutive minutes",
            Special, Gold, 50, Goal::Reached(|f| f.session_ms >= 30 * MINUTE_MS))
    },
];

const COMPLETIONIST_RULE: Rule = Rule {
    hidden: true,
    ..rule(COMPLETIONIST, "Completionist", "Unlock all other achievements",
        Special, Platinum, 200, Goal::Reached(|_| false))
};

pub fn initial_achievements() -> Vec<Achievement> {
    RULES
        .iter()
        .chain(std::iter::once(&COMPLETIONIST_RULE))
        .map(|rule| {
            let max_progress = match rule.goal {
                Goal::Progress(max, _) => Some(max),
                Goal::Reached(_) => None,
            };
            Achievement {
                id: AchievementId::new(rule.id),
                title: rule.title.to_string(),
                description: rule.description.to_string(),
                category: rule.category,
                tier: rule.tier,
                points: rule.points,
                unlocked: false,
                unlocked_at: None,
                progress: max_progress.map(|_| 0),
                max_progress,
                hidden: rule.hidden,
            }
        })
        .collect()
}

fn unlock(achievement: &mut Achievement, now_ms: i64, unlocked: &mut Vec<AchievementId>) {
    if !achievement.unlocked {
        achievement.unlocked = true;
        achievement.unlocked_at = Some(now_ms);
        unlocked.push(achievement.id.clone());
    }
}

/// Update progress and unlock what the facts now satisfy. Returns the ids
/// unlocked by this call.
pub fn check_achievements(
    achievements: &mut [Achievement],
    facts: &AchievementFacts,
    now_ms: i64,
) -> Vec<AchievementId> {
    let mut unlocked = Vec::new();

    for achievement in achievements.iter_mut().filter(|a| !a.unlocked) {
        let Some(rule) = RULES.iter().find(|rule| achievement.id.0 == rule.id) else {
            continue;
        };
        let reached = match rule.goal {
            Goal::Reached(test) => test(facts),
            Goal::Progress(max, current) => {
                let current = current(facts);
                achievement.progress = Some(current.min(max));
                achievement.max_progress = Some(max);
                current >= max
            }
        };
        if reached {
            unlock(achievement, now_ms, &mut unlocked);
        }
    }

    let others_done = achievements
        .iter()
        .filter(|a| a.id.0 != COMPLETIONIST)
        .all(|a| a.unlocked);
    if others_done {
        if let Some(meta) = achievements.iter_mut().find(|a| a.id.0 == COMPLETIONIST) {
            unlock(meta, now_ms, &mut unlocked);
        }
    }
    unlocked
}

/// Unlocked points, 100 per completed objective, 25 per investigation level,
/// plus up to 100 for keeping resources topped up.
pub fn calculate_score(
    achievements: &[Achievement],
    counts: ObjectiveCounts,
    entities: &[Entity],
    resources: &PlayerResources,
) -> u32 {
    let points: u32 = achievements
        .iter()
        .filter(|a| a.unlocked)
        .map(|a| a.points)
        .sum();
    let depth: u32 = entities
        .iter()
        .map(|e| u32::from(e.investigation_level) * 25)
        .sum();
    let efficiency = (resource_ratio(resources) * 100.0).floor();
    points + counts.completed * 100 + depth + u32::try_from(crate::floor_to_u64(efficiency)).unwrap_or(0)
}

fn ratio(value: u32, max: u32) -> f64 {
    if max == 0 {
        0.0
    } else {
        f64::from(value) / f64::from(max)
    }
}

/// Mean fill level of budget, agents and data credits.
pub fn resource_ratio(resources: &PlayerResources) -> f64 {
    (ratio(resources.budget, resources.max_budget)
        + ratio(resources.agents, resources.max_agents)
        + ratio(resources.data_credits, resources.max_data_credits))
        / 3.0
}

// ---------------------------------------------------------------------------
// Session stats
// ---------------------------------------------------------------------------

/// Facts only a running session can observe. Times are wall-clock ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub started_at_ms: i64,
    pub min_budget_ratio: f64,
    #[serde(default)]
    pub balanced_since_ms: Option<i64>,
    #[serde(default)]
    pub longest_balanced_ms: i64,
    /// Session-relative completion times.
    #[serde(default)]
    pub completion_times_ms: Vec<i64>,
    #[serde(default)]
    pub efficient_completions: u32,
    #[serde(default)]
    pub rejected_for_cost: u32,
    #[serde(default)]
    pub alert_first_seen_ms: BTreeMap<EventId, i64>,
    #[serde(default)]
    pub fast_responses: u32,
    #[serde(default)]
    pub views_visited: BTreeSet<String>,
}

impl SessionStats {
    pub fn new(started_at_ms: i64) -> Self {
        Self {
            started_at_ms,
            min_budget_ratio: 1.0,
            balanced_since_ms: None,
            longest_balanced_ms: 0,
            completion_times_ms: Vec::new(),
            efficient_completions: 0,
            rejected_for_cost: 0,
            alert_first_seen_ms: BTreeMap::new(),
            fast_responses: 0,
            views_visited: BTreeSet::new(),
        }
    }

    pub fn session_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.started_at_ms).max(0)
    }

    pub fn observe_resources(&mut self, resources: &PlayerResources, now_ms: i64) {
        self.min_budget_ratio = self
            .min_budget_ratio
            .min(ratio(resources.budget, resources.max_budget));

        let balanced = ratio(resources.budget, resources.max_budget) >= BALANCE_RATIO
            && ratio(resources.agents, resources.max_agents) >= BALANCE_RATIO
            && ratio(resources.data_credits, resources.max_data_credits) >= BALANCE_RATIO;
        if balanced {
            let since = *self.balanced_since_ms.get_or_insert(now_ms);
            self.longest_balanced_ms = self.longest_balanced_ms.max(now_ms - since);
        } else {
            self.balanced_since_ms = None;
        }
    }

    pub fn record_completions(&mut self, count: usize, now_ms: i64) {
        let at = self.session_ms(now_ms);
        for _ in 0..count {
            self.completion_times_ms.push(at);
            self.efficient_completions += 1;
        }
    }

    /// A command refused for lack of resources breaks the efficient streak.
    pub fn record_rejected_for_cost(&mut self) {
        self.rejected_for_cost += 1;
        self.efficient_completions = 0;
    }

    /// Drop first-seen times for events no longer in the log.
    pub fn forget_alerts(&mut self, live: &BTreeSet<EventId>) {
        self.alert_first_seen_ms.retain(|id, _| live.contains(id));
    }

    pub fn record_alert_seen(&mut self, event: EventId, now_ms: i64) {
        self.alert_first_seen_ms.entry(event).or_insert(now_ms);
    }

    pub fn record_response(&mut self, event: EventId, now_ms: i64) {
        let seen = self.alert_first_seen_ms.get(&event).copied().unwrap_or(now_ms);
        if now_ms - seen <= 30_000 {
            self.fast_responses += 1;
        }
    }

    pub fn visit_view(&mut self, view: &str) {
        self.views_visited.insert(view.to_string());
    }

    /// `enabled_sources` is the number of sources the player has switched on.
    pub fn facts(
        &self,
        state: &SimulationState,
        enabled_sources: usize,
        now_ms: i64,
    ) -> AchievementFacts {
        let count = |predicate: &dyn Fn(&Entity) -> bool| {
            u32::try_from(state.entities.iter().filter(|e| predicate(e)).count())
                .unwrap_or(u32::MAX)
        };
        let as_u32 = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);

        AchievementFacts {
            investigated_entities: count(&|e| e.investigation_level > 0),
            maxed_entities: count(&|e| e.investigation_level >= 3),
            responded_alerts: as_u32(
                state
                    .events
                    .iter()
                    .filter(|e| e.requires_response && e.player_response.is_some())
                    .count(),
            ),
            resolved_entities: count(&|e| e.flags.resolved),
            priority_entities: count(&|e| e.flags.priority),
            objectives: state.objective_counts(),
            min_budget_ratio: self.min_budget_ratio,
            longest_balanced_ms: self.longest_balanced_ms,
            efficient_completions: self.efficient_completions,
            first_completion_ms: self.completion_times_ms.first().copied(),
            completions_within_15_min: as_u32(
                self.completion_times_ms
                    .iter()
                    .filter(|&&at| at < 15 * MINUTE_MS)
                    .count(),
            ),
            fast_responses: self.fast_responses,
            views_visited: as_u32(self.views_visited.len()),
            enabled_sources: as_u32(enabled_sources),
            total_sources: as_u32(state.sources.len()),
            session_ms: self.session_ms(now_ms),
        }
    }
}
