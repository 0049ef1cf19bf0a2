//! A running session: the live snapshot, the cooperative scheduler and the
//! session-only bookkeeping (dismissed alerts, disabled sources, stats).

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::achievements::{calculate_score, check_achievements, SessionStats};
use crate::actions::{apply_command, ActionOutcome, PlayerCommand, Rejection};
use crate::assembler::assemble;
use crate::clock::elapsed_at;
use crate::metrics::{compute_projections, Projections};
use crate::objectives::{check_objectives, ObjectiveReport};
use crate::persist::PlayerStore;
use crate::reconcile::{capture, reconcile, PersistedState};
use crate::relationships::update_all_connections;
use crate::sources::update_source_counters;
use crate::{
    AchievementId, Catalog, Elapsed, EventId, SimulationState, SourceId, SourceStatus,
    ThreatLevel, TimeSpeed, TimelineEvent,
};

/// Analytical views a player can open.
pub const VIEWS: [&str; 5] = ["graph", "map", "analytics", "timeline", "query"];

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Fast,
    Regenerate,
    Budget,
    Agents,
    Credits,
    Network,
    Objectives,
    Persist,
}

impl Task {
    /// Run order within one advance.
    pub const ALL: [Task; 8] = [
        Task::Fast,
        Task::Regenerate,
        Task::Budget,
        Task::Agents,
        Task::Credits,
        Task::Network,
        Task::Objectives,
        Task::Persist,
    ];

    pub fn period_ms(self, speed: TimeSpeed) -> i64 {
        match self {
            Task::Fast => 1_000,
            Task::Regenerate => (30_000 / i64::from(speed.get())).max(1_000),
            Task::Budget => 60_000,
            Task::Agents => 300_000,
            Task::Credits => 120_000,
            Task::Network => 30_000,
            Task::Objectives => 5_000,
            Task::Persist => 10_000,
        }
    }
}

/// Wall-clock timers for the periodic tasks. `due` reports how many whole
/// periods each task has accumulated and consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    last_run: BTreeMap<Task, i64>,
}

impl Scheduler {
    pub fn new(now_ms: i64) -> Self {
        Self {
            last_run: Task::ALL.into_iter().map(|task| (task, now_ms)).collect(),
        }
    }

    pub fn due(&mut self, now_ms: i64, speed: TimeSpeed) -> Vec<(Task, u64)> {
        let mut due = Vec::new();
        for task in Task::ALL {
            let period = task.period_ms(speed);
            let last = self.last_run.entry(task).or_insert(now_ms);
            if now_ms < *last {
                // Clock went backwards; restart the timer.
                *last = now_ms;
                continue;
            }
            let periods = (now_ms - *last) / period;
            if periods > 0 {
                *last += periods * period;
                due.push((task, u64::try_from(periods).unwrap_or_default()));
            }
        }
        due
    }

    pub fn reset(&mut self, task: Task, now_ms: i64) {
        self.last_run.insert(task, now_ms);
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What one `advance` did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub now_ms: i64,
    pub elapsed: Elapsed,
    pub tasks: Vec<(Task, u64)>,
    pub regenerated: bool,
    pub objectives: ObjectiveReport,
    pub achievements_unlocked: Vec<AchievementId>,
    pub pending_alert: Option<EventId>,
    pub save_due: bool,
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct Session {
    catalog: Catalog,
    state: SimulationState,
    scheduler: Scheduler,
    stats: SessionStats,
    dismissed: BTreeSet<EventId>,
    disabled_sources: BTreeSet<SourceId>,
    started_minute: u64,
}

impl Session {
    /// Assemble the world for `now_ms` and overlay `persisted` when it is
    /// still fresh.
    pub fn new(
        catalog: Catalog,
        now_ms: i64,
        time_speed: TimeSpeed,
        persisted: Option<&PersistedState>,
    ) -> Self {
        let mut state = assemble(&catalog, now_ms, time_speed);
        let mut dismissed = BTreeSet::new();
        if let Some(persisted) = persisted.filter(|p| p.is_fresh(now_ms)) {
            reconcile(&mut state, persisted);
            dismissed.clone_from(&persisted.dismissed_alerts);
        }
        let started_minute = state.elapsed.minutes;
        let mut session = Self {
            catalog,
            state,
            scheduler: Scheduler::new(now_ms),
            stats: SessionStats::new(now_ms),
            dismissed,
            disabled_sources: BTreeSet::new(),
            started_minute,
        };
        session.refresh_score();
        session
    }

    /// Load from `store` and start a session.
    pub fn resume(
        catalog: Catalog,
        now_ms: i64,
        time_speed: TimeSpeed,
        store: &dyn PlayerStore,
    ) -> Self {
        let persisted = store.load();
        Self::new(catalog, now_ms, time_speed, persisted.as_ref())
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn dismissed_alerts(&self) -> &BTreeSet<EventId> {
        &self.dismissed
    }

    pub fn time_speed(&self) -> TimeSpeed {
        self.state.time_speed
    }

    pub fn session_minutes(&self) -> u64 {
        self.state.elapsed.minutes.saturating_sub(self.started_minute)
    }

    pub fn is_source_enabled(&self, id: &SourceId) -> bool {
        !self.disabled_sources.contains(id)
    }

    pub fn enabled_source_count(&self) -> usize {
        self.state
            .sources
            .iter()
            .filter(|s| self.is_source_enabled(&s.id))
            .count()
    }

    /// Dashboard aggregates over the live snapshot and enabled sources.
    pub fn projections(&self) -> Projections {
        compute_projections(&self.state, |id| self.is_source_enabled(id))
    }

    /// Run every task whose period has elapsed since it last ran.
    pub fn advance(&mut self, now_ms: i64) -> TickReport {
        let speed = self.state.time_speed;
        let tasks = self.scheduler.due(now_ms, speed);
        let mut report = TickReport {
            now_ms,
            tasks: tasks.clone(),
            ..TickReport::default()
        };
        let constants = &self.catalog.constants;
        let (budget_regen, agent_regen, credit_regen) =
            (constants.budget_regen, constants.agent_regen, constants.credit_regen);

        for (task, periods) in tasks {
            let periods32 = u32::try_from(periods).unwrap_or(u32::MAX);
            match task {
                Task::Fast => {
                    let seconds = periods as f64 * f64::from(speed.get());
                    let disabled = &self.disabled_sources;
                    for source in self
                        .state
                        .sources
                        .iter_mut()
                        .filter(|s| !disabled.contains(&s.id))
                    {
                        update_source_counters(std::slice::from_mut(source), seconds);
                    }
                    self.state.elapsed = elapsed_at(now_ms, speed);
                    self.stats.observe_resources(&self.state.resources, now_ms);
                }
                Task::Regenerate => {
                    self.regenerate(now_ms);
                    report.regenerated = true;
                }
                Task::Budget => self
                    .state
                    .resources
                    .add_budget(budget_regen.saturating_mul(periods32)),
                Task::Agents => self
                    .state
                    .resources
                    .add_agents(agent_regen.saturating_mul(periods32)),
                Task::Credits => self
                    .state
                    .resources
                    .add_data_credits(credit_regen.saturating_mul(periods32)),
                Task::Network => {
                    let delta_ms = i64::try_from(periods).unwrap_or(i64::MAX)
                        * task.period_ms(speed);
                    update_all_connections(&mut self.state.connections, delta_ms, now_ms);
                }
                Task::Objectives => {
                    report.objectives = self.check_progress(now_ms, &mut report.achievements_unlocked);
                }
                Task::Persist => report.save_due = true,
            }
        }

        report.pending_alert = self.pending_alert().map(|event| event.id);
        if let Some(id) = report.pending_alert {
            self.stats.record_alert_seen(id, now_ms);
        }
        report.elapsed = self.state.elapsed;
        report.score = self.state.score;
        report
    }

    fn check_progress(
        &mut self,
        now_ms: i64,
        unlocked: &mut Vec<AchievementId>,
    ) -> ObjectiveReport {
        let session_minutes = self.session_minutes();
        let objectives = check_objectives(&mut self.state, session_minutes, now_ms);
        self.stats.record_completions(objectives.completed.len(), now_ms);
        self.state
            .consequence_logs
            .extend(objectives.logs.iter().cloned());
        unlocked.extend(self.check_achievements(now_ms));
        self.refresh_score();
        objectives
    }

    fn check_achievements(&mut self, now_ms: i64) -> Vec<AchievementId> {
        let facts = self
            .stats
            .facts(&self.state, self.enabled_source_count(), now_ms);
        check_achievements(&mut self.state.achievements, &facts, now_ms)
    }

    fn refresh_score(&mut self) {
        self.state.score = calculate_score(
            &self.state.achievements,
            self.state.objective_counts(),
            &self.state.entities,
            &self.state.resources,
        );
    }

    /// Rebuild the world for `now_ms` and carry the live session over it.
    fn regenerate(&mut self, now_ms: i64) {
        let mut fresh = assemble(&self.catalog, now_ms, self.state.time_speed);
        let overlay = capture(&self.state, &self.dismissed, now_ms);
        reconcile(&mut fresh, &overlay);

        for connection in &mut fresh.connections {
            let live = self
                .state
                .connections
                .iter()
                .find(|c| c.key() == connection.key());
            if let Some(live) = live.filter(|c| c.meta.is_some()) {
                connection.meta.clone_from(&live.meta);
                connection.strength = live.strength;
            }
        }
        for source in &mut fresh.sources {
            if self.disabled_sources.contains(&source.id) {
                source.status = SourceStatus::Offline;
            }
        }

        let live = &mut self.state;
        fresh.objectives = std::mem::take(&mut live.objectives);
        fresh.objective_chains = std::mem::take(&mut live.objective_chains);
        fresh.hidden_objectives = std::mem::take(&mut live.hidden_objectives);
        fresh.achievements = std::mem::take(&mut live.achievements);
        fresh.consequence_logs = std::mem::take(&mut live.consequence_logs);
        fresh.score = live.score;
        self.state = fresh;

        let live_events: BTreeSet<EventId> = self.state.events.iter().map(|e| e.id).collect();
        self.dismissed.retain(|id| live_events.contains(id));
        self.stats.forget_alerts(&live_events);
    }

    /// Apply a player command. Cost rejections are counted for the
    /// efficiency achievement.
    pub fn apply(
        &mut self,
        command: &PlayerCommand,
        now_ms: i64,
    ) -> Result<ActionOutcome, Rejection> {
        let result = apply_command(&mut self.state, &mut self.dismissed, command, now_ms);
        match &result {
            Ok(_) => {
                if let PlayerCommand::RespondToAlert { event_id, .. } = command {
                    self.stats.record_response(*event_id, now_ms);
                }
                self.refresh_score();
            }
            Err(rejection) if rejection.is_cost() => self.stats.record_rejected_for_cost(),
            Err(_) => {}
        }
        result
    }

    /// Change speed and rebuild the world at the new elapsed time.
    pub fn set_time_speed(&mut self, time_speed: TimeSpeed, now_ms: i64) {
        self.state.time_speed = time_speed;
        self.regenerate(now_ms);
        self.scheduler.reset(Task::Regenerate, now_ms);
    }

    /// Flip a source on or off. Returns the new enabled state, or `None` for
    /// an unknown source.
    pub fn toggle_source(&mut self, id: &SourceId) -> Option<bool> {
        let source = self.state.sources.iter_mut().find(|s| &s.id == id)?;
        if self.disabled_sources.remove(id) {
            source.status = SourceStatus::Active;
            Some(true)
        } else {
            self.disabled_sources.insert(id.clone());
            source.status = SourceStatus::Offline;
            Some(false)
        }
    }

    /// Record a visit to one of [`VIEWS`]. Returns false for unknown views.
    pub fn visit_view(&mut self, view: &str) -> bool {
        if !VIEWS.contains(&view) {
            return false;
        }
        self.stats.visit_view(view);
        true
    }

    /// The interactive alert to surface: pending, not dismissed, critical
    /// first.
    pub fn pending_alert(&self) -> Option<&TimelineEvent> {
        let sim_now = self.state.sim_now();
        let mut pending = self
            .state
            .events
            .iter()
            .filter(|e| e.is_pending(sim_now) && !self.dismissed.contains(&e.id));
        let first = pending.clone().next();
        pending
            .find(|e| e.severity == ThreatLevel::Critical)
            .or(first)
    }

    pub fn capture(&self, now_ms: i64) -> PersistedState {
        capture(&self.state, &self.dismissed, now_ms)
    }

    pub fn save(&self, store: &mut dyn PlayerStore, now_ms: i64) {
        store.save(&self.capture(now_ms));
    }
}

#[cfg(test)]
mod tests;
