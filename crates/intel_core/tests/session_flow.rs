//! A headless session driven for a few simulated hours, saved and resumed.

use intel_core::clock::{EPOCH_MS, HOUR_MS};
use intel_core::metrics::{append_metrics_row, write_metrics_header};
use intel_core::test_fixtures::base_catalog;
use intel_core::{
    compute_metrics, EntityAction, MemoryStore, PlayerCommand, PlayerStore, Session, TimeSpeed,
};

const START: i64 = EPOCH_MS + 4 * HOUR_MS;

fn drive(session: &mut Session, store: &mut MemoryStore, from: i64, seconds: i64) -> i64 {
    let mut now = from;
    for _ in 0..seconds {
        now += 1_000;
        let report = session.advance(now);
        if report.save_due {
            session.save(store, now);
        }
    }
    now
}

#[test]
fn headless_session_saves_and_resumes() {
    let speed = TimeSpeed::try_from(10).unwrap();
    let mut store = MemoryStore::default();
    let mut session = Session::new(base_catalog(), START, speed, None);

    let target = session.state().entities[0].id;
    let investigate = PlayerCommand::EntityAction {
        entity_id: target,
        action: EntityAction::Investigate,
    };
    session.apply(&investigate, START).unwrap();
    let now = drive(&mut session, &mut store, START, 120);
    assert_eq!(store.saves, 12);

    let saved = store.load().unwrap();
    assert_eq!(saved.saved_at, now);
    assert_eq!(saved.entity_states[&target].investigation_level, 1);

    let resumed = Session::resume(base_catalog(), now, speed, &store);
    assert_eq!(resumed.state().resources, session.state().resources);
    assert_eq!(
        resumed.state().entity(target).unwrap().investigation_level,
        1
    );
}

#[test]
fn sessions_advance_simulated_time_by_speed() {
    let speed = TimeSpeed::try_from(20).unwrap();
    let mut store = MemoryStore::default();
    let mut session = Session::new(base_catalog(), START, speed, None);
    let before = session.state().elapsed.minutes;
    drive(&mut session, &mut store, START, 60);
    assert_eq!(session.state().elapsed.minutes, before + 20);
    assert_eq!(session.session_minutes(), 20);
}

#[test]
fn metrics_rows_follow_the_session() {
    let mut store = MemoryStore::default();
    let mut session = Session::new(base_catalog(), START, TimeSpeed::REALTIME, None);
    let mut csv = Vec::new();
    write_metrics_header(&mut csv).unwrap();
    let mut now = START;
    for _ in 0..3 {
        now = drive(&mut session, &mut store, now, 30);
        append_metrics_row(&mut csv, &compute_metrics(session.state())).unwrap();
    }
    let text = String::from_utf8(csv).unwrap();
    assert_eq!(text.lines().count(), 4);

    let json = serde_json::to_value(session.projections()).unwrap();
    assert!(json["key_nodes"].is_array());
    assert!(json["source_stats"]["total_events_per_sec"].is_number());
}
