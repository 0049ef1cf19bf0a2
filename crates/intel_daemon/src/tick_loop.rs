use crate::state::AppState;
use std::time::Duration;

/// Advance the session once per `tick_ms` and broadcast every report. Saves
/// the session asks for are written off the async workers.
pub async fn run_tick_loop(app_state: AppState, max_ticks: Option<u64>) {
    let mut interval = tokio::time::interval(Duration::from_millis(app_state.tick_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ticks = 0u64;

    loop {
        interval.tick().await;
        let now_ms = app_state.now_ms();
        let (report, snapshot) = {
            let mut session = app_state.session.lock();
            let report = session.advance(now_ms);
            let snapshot = report.save_due.then(|| session.capture(now_ms));
            (report, snapshot)
        };

        if let Some(snapshot) = snapshot {
            let store = app_state.store.clone();
            tokio::task::spawn_blocking(move || store.lock().save(&snapshot));
        }

        if report.regenerated {
            tracing::debug!(minutes = report.elapsed.minutes, "world regenerated");
        }
        for id in &report.achievements_unlocked {
            tracing::info!(achievement = %id, "achievement unlocked");
        }
        for id in &report.objectives.completed {
            tracing::info!(objective = %id, "objective completed");
        }

        // No subscribers is fine.
        let _ = app_state.report_tx.send(report);

        ticks += 1;
        if max_ticks.is_some_and(|max| ticks >= max) {
            break;
        }
    }
}
