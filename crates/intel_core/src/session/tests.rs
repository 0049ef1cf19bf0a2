use super::*;
use crate::actions::EntityAction;
use crate::clock::{DAY_MS, EPOCH_MS, HOUR_MS};
use crate::persist::MemoryStore;
use crate::test_fixtures::base_catalog;
use crate::{EntityId, EventId};

const START: i64 = EPOCH_MS + 6 * HOUR_MS;

fn session() -> Session {
    Session::new(base_catalog(), START, TimeSpeed::REALTIME, None)
}

fn act(session: &mut Session, id: u64, action: EntityAction, now_ms: i64) -> Result<ActionOutcome, Rejection> {
    let command = PlayerCommand::EntityAction {
        entity_id: EntityId(id),
        action,
    };
    session.apply(&command, now_ms)
}

// --- Scheduler ---

#[test]
fn scheduler_reports_whole_periods_only() {
    let mut scheduler = Scheduler::new(0);
    assert!(scheduler.due(999, TimeSpeed::REALTIME).is_empty());
    assert_eq!(scheduler.due(1_000, TimeSpeed::REALTIME), vec![(Task::Fast, 1)]);

    let due = scheduler.due(5_500, TimeSpeed::REALTIME);
    assert_eq!(due, vec![(Task::Fast, 4), (Task::Objectives, 1)]);
}

#[test]
fn regeneration_speeds_up_with_time_speed() {
    let fast = TimeSpeed::try_from(10).unwrap();
    let fastest = TimeSpeed::try_from(50).unwrap();
    assert_eq!(Task::Regenerate.period_ms(TimeSpeed::REALTIME), 30_000);
    assert_eq!(Task::Regenerate.period_ms(fast), 3_000);
    assert_eq!(Task::Regenerate.period_ms(fastest), 1_000);
    assert_eq!(Task::Budget.period_ms(fastest), 60_000);
}

#[test]
fn clock_going_backwards_restarts_timers() {
    let mut scheduler = Scheduler::new(10_000);
    assert!(scheduler.due(5_000, TimeSpeed::REALTIME).is_empty());
    assert!(scheduler.due(5_500, TimeSpeed::REALTIME).is_empty());
    assert_eq!(scheduler.due(6_000, TimeSpeed::REALTIME), vec![(Task::Fast, 1)]);
}

// --- Periodic tasks ---

#[test]
fn budget_regenerates_each_minute() {
    let mut session = session();
    act(&mut session, 1, EntityAction::Investigate, START).unwrap();
    assert_eq!(session.state().resources.budget, 9_900);

    let report = session.advance(START + 60_000);
    assert!(report.tasks.contains(&(Task::Budget, 1)));
    assert!(report.regenerated);
    assert_eq!(session.state().resources.budget, 10_000);
}

#[test]
fn regeneration_keeps_player_state() {
    let mut session = session();
    act(&mut session, 2, EntityAction::TogglePriority, START).unwrap();
    let before = session.state().entities.len();

    let report = session.advance(START + 30_000);
    assert!(report.regenerated);
    assert!(session.state().entities.len() >= before);
    let entity = session.state().entity(EntityId(2)).unwrap();
    assert!(entity.flags.priority);
}

#[test]
fn persist_task_signals_save() {
    let mut session = session();
    assert!(!session.advance(START + 9_000).save_due);
    assert!(session.advance(START + 10_000).save_due);
}

#[test]
fn elapsed_follows_the_clock() {
    let mut session = session();
    let report = session.advance(START + 2 * 60_000);
    assert_eq!(report.elapsed.minutes, 6 * 60 + 2);
    assert_eq!(session.session_minutes(), 2);
}

// --- Sources and views ---

#[test]
fn disabled_source_stays_offline_across_regeneration() {
    let mut session = session();
    let total = session.enabled_source_count();
    let id = session.state().sources[0].id.clone();

    assert_eq!(session.toggle_source(&SourceId::new("NOPE")), None);
    assert_eq!(session.toggle_source(&id), Some(false));
    assert_eq!(session.enabled_source_count(), total - 1);

    let records = session.state().sources[0].records;
    session.advance(START + 30_000);
    let source = &session.state().sources[0];
    assert_eq!(source.status, SourceStatus::Offline);
    assert!(!session.is_source_enabled(&id));
    assert!(session.projections().source_stats.active_sources < u32::try_from(total).unwrap());
    assert_eq!(source.records, records);

    assert_eq!(session.toggle_source(&id), Some(true));
    assert_eq!(session.enabled_source_count(), total);
}

#[test]
fn only_known_views_are_recorded() {
    let mut session = session();
    assert!(session.visit_view("graph"));
    assert!(session.visit_view("graph"));
    assert!(!session.visit_view("settings"));
    assert_eq!(session.stats().views_visited.len(), 1);
}

// --- Alerts ---

#[test]
fn pending_alert_prefers_critical_and_skips_dismissed() {
    let mut session = Session::new(base_catalog(), START + 2 * DAY_MS, TimeSpeed::REALTIME, None);
    let sim_now = session.state().sim_now();
    let Some(first) = session.pending_alert().map(|e| (e.id, e.severity)) else {
        return;
    };
    let any_critical = session
        .state()
        .events
        .iter()
        .any(|e| e.is_pending(sim_now) && e.severity == ThreatLevel::Critical);
    assert_eq!(first.1 == ThreatLevel::Critical, any_critical);

    session
        .apply(&PlayerCommand::DismissAlert { event_id: first.0 }, START)
        .unwrap();
    assert_ne!(session.pending_alert().map(|e| e.id), Some(first.0));
}

#[test]
fn regeneration_forgets_alerts_that_left_the_log() {
    let mut session = session();
    let live = session.state().events.last().map(|e| e.id).unwrap();
    let gone = EventId(u64::MAX);
    for id in [live, gone] {
        session.dismissed.insert(id);
        session.stats.record_alert_seen(id, START);
    }

    assert!(session.advance(START + 30_000).regenerated);
    assert!(session.dismissed_alerts().contains(&live));
    assert!(!session.dismissed_alerts().contains(&gone));
    assert!(session.stats().alert_first_seen_ms.contains_key(&live));
    assert!(!session.stats().alert_first_seen_ms.contains_key(&gone));
}

// --- Persistence ---

#[test]
fn saved_state_resumes_into_new_session() {
    let mut session = session();
    let mut store = MemoryStore::default();
    act(&mut session, 3, EntityAction::Investigate, START).unwrap();
    session.save(&mut store, START);
    assert_eq!(store.saves, 1);

    let resumed = Session::resume(base_catalog(), START + HOUR_MS, TimeSpeed::REALTIME, &store);
    assert_eq!(resumed.state().resources.budget, 9_900);
    assert_eq!(resumed.state().entity(EntityId(3)).unwrap().investigation_level, 1);
}

#[test]
fn stale_saves_are_ignored() {
    let mut session = session();
    let mut store = MemoryStore::default();
    act(&mut session, 3, EntityAction::Investigate, START).unwrap();
    session.save(&mut store, START);

    let resumed = Session::resume(base_catalog(), START + DAY_MS, TimeSpeed::REALTIME, &store);
    assert_eq!(resumed.state().resources.budget, 10_000);
    assert_eq!(resumed.state().entity(EntityId(3)).unwrap().investigation_level, 0);
}
