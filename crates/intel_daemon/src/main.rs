mod routes;
mod state;
mod tick_loop;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use intel_core::{MemoryStore, PlayerStore, Session, TimeSpeed};
use intel_world::{load_catalog, JsonFileStore};
use routes::make_router_with_cors;
use state::AppState;
use tick_loop::run_tick_loop;

#[derive(Parser)]
#[command(name = "intel_daemon", about = "Intelligence operation simulator HTTP daemon")]
struct Args {
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Persist player state in this directory. Without it state lives in
    /// memory for the lifetime of the process.
    #[arg(long)]
    state_dir: Option<String>,
    #[arg(long, default_value_t = 1)]
    speed: u32,
    /// Wall-clock milliseconds between scheduler passes.
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let catalog = load_catalog(&args.content_dir)?;
    let speed = TimeSpeed::try_from(args.speed).context("parsing --speed")?;
    let cors_origin: HeaderValue = args
        .cors_origin
        .parse()
        .with_context(|| format!("parsing --cors-origin {}", args.cors_origin))?;

    let store: Box<dyn PlayerStore + Send> = match &args.state_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {dir}"))?;
            Box::new(JsonFileStore::new(dir))
        }
        None => Box::new(MemoryStore::default()),
    };

    let now_ms = state::wall_clock();
    let session = Session::resume(catalog, now_ms, speed, store.as_ref());
    tracing::info!(
        content_version = %session.catalog().content_version,
        speed = speed.get(),
        elapsed_minutes = session.state().elapsed.minutes,
        entities = session.state().entities.len(),
        "session started"
    );

    let app_state = AppState::new(session, store, args.tick_ms);
    tokio::spawn(run_tick_loop(app_state.clone(), None));

    let app = make_router_with_cors(app_state.clone(), cors_origin);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.context("serving")?;

    app_state.save();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use http_body_util::BodyExt;
    use intel_core::clock::{EPOCH_MS, HOUR_MS};
    use intel_core::test_fixtures::base_catalog;
    use intel_core::{EntityAction, EntityId, PlayerCommand};
    use routes::make_router;
    use tower::ServiceExt;

    fn fixed_clock() -> i64 {
        EPOCH_MS + 6 * HOUR_MS
    }

    fn make_test_state() -> AppState {
        let speed = TimeSpeed::try_from(10).unwrap();
        let session = Session::new(base_catalog(), fixed_clock(), speed, None);
        let mut app_state = AppState::new(session, Box::new(MemoryStore::default()), 10);
        app_state.clock = fixed_clock;
        app_state
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    // --- Reads ---

    #[tokio::test]
    async fn test_meta_reports_speed_and_version() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/meta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["time_speed"], 10);
        assert_eq!(json["elapsed_minutes"], 3_600);
        assert!(json["content_version"].is_string());
        assert_eq!(json["tick_ms"], 10);
    }

    #[tokio::test]
    async fn test_snapshot_is_the_session_state() {
        let app_state = make_test_state();
        let expected = serde_json::to_value(app_state.session.lock().state()).unwrap();
        let (status, json) = get_json(make_router(app_state), "/api/v1/snapshot").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["entities"].as_array().map(Vec::len),
            expected["entities"].as_array().map(Vec::len)
        );
        assert_eq!(json["resources"], expected["resources"]);
        assert_eq!(json["score"], expected["score"]);
    }

    #[tokio::test]
    async fn test_projections_include_key_nodes() {
        let (status, json) = get_json(make_router(make_test_state()), "/api/v1/projections").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["key_nodes"].is_array());
        assert!(json["source_stats"].is_object());
    }

    #[tokio::test]
    async fn test_pending_alert_matches_session() {
        let app_state = make_test_state();
        let expected = app_state
            .session
            .lock()
            .pending_alert()
            .map(|event| event.id);
        let (status, json) = get_json(make_router(app_state), "/api/v1/alerts/pending").await;
        assert_eq!(status, StatusCode::OK);
        match expected {
            Some(id) => assert_eq!(json["id"], serde_json::json!(id)),
            None => assert!(json.is_null()),
        }
    }

    // --- Commands ---

    #[tokio::test]
    async fn test_command_toggles_priority() {
        let app_state = make_test_state();
        let entity_id = app_state.session.lock().state().entities[0].id;
        let before = app_state.session.lock().state().entities[0].flags.priority;
        let command = serde_json::json!({
            "EntityAction": { "entity_id": entity_id, "action": "TogglePriority" }
        });
        let (status, _) = post_json(make_router(app_state.clone()), "/api/v1/commands", &command).await;
        assert_eq!(status, StatusCode::OK);
        let session = app_state.session.lock();
        assert_eq!(session.state().entities[0].flags.priority, !before);
    }

    #[tokio::test]
    async fn test_command_unknown_entity_is_unprocessable() {
        let command = serde_json::json!({
            "EntityAction": { "entity_id": EntityId(999_999), "action": "Investigate" }
        });
        let (status, json) =
            post_json(make_router(make_test_state()), "/api/v1/commands", &command).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["error"].as_str().unwrap().contains("999999"));
    }

    #[tokio::test]
    async fn test_command_over_budget_is_conflict() {
        let app_state = make_test_state();
        let target = {
            let mut session = app_state.session.lock();
            let ids: Vec<EntityId> = session.state().entities.iter().map(|e| e.id).collect();
            // Watchlisting every other entity spends all agents.
            for &entity_id in &ids[1..] {
                let command = PlayerCommand::EntityAction {
                    entity_id,
                    action: EntityAction::ToggleWatchlist,
                };
                if session.apply(&command, fixed_clock()).is_err() {
                    break;
                }
            }
            assert_eq!(session.state().resources.agents, 0);
            ids[0]
        };
        let command = serde_json::json!({
            "EntityAction": { "entity_id": target, "action": "Neutralize" }
        });
        let (status, json) = post_json(make_router(app_state), "/api/v1/commands", &command).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(json["error"].as_str().unwrap().starts_with("not enough resources"));
    }

    #[tokio::test]
    async fn test_malformed_command_is_rejected() {
        let command = serde_json::json!({ "Launch": {} });
        let (status, _) =
            post_json(make_router(make_test_state()), "/api/v1/commands", &command).await;
        assert!(status.is_client_error());
    }

    // --- Sources, views, speed ---

    #[tokio::test]
    async fn test_toggle_source_round_trip() {
        let app_state = make_test_state();
        let id = app_state.session.lock().state().sources[0].id.clone();
        let uri = format!("/api/v1/sources/{id}/toggle");
        let empty = serde_json::json!({});

        let (status, json) = post_json(make_router(app_state.clone()), &uri, &empty).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], false);

        let (_, json) = post_json(make_router(app_state.clone()), &uri, &empty).await;
        assert_eq!(json["enabled"], true);
        assert!(app_state.session.lock().is_source_enabled(&id));
    }

    #[tokio::test]
    async fn test_toggle_unknown_source_is_not_found() {
        let (status, _) = post_json(
            make_router(make_test_state()),
            "/api/v1/sources/NOPE/toggle",
            &serde_json::json!({}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_views_known_and_unknown() {
        let app_state = make_test_state();
        let empty = serde_json::json!({});
        let (status, _) = post_json(make_router(app_state.clone()), "/api/v1/views/graph", &empty).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = post_json(make_router(app_state), "/api/v1/views/settings", &empty).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_time_speed_rebuilds_world() {
        let app_state = make_test_state();
        let (status, json) = post_json(
            make_router(app_state.clone()),
            "/api/v1/time-speed",
            &serde_json::json!({ "speed": 20 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["speed"], 20);
        assert_eq!(json["elapsed_minutes"], 7_200);
        assert_eq!(app_state.session.lock().time_speed().get(), 20);
    }

    #[tokio::test]
    async fn test_time_speed_outside_allowed_set() {
        let app_state = make_test_state();
        let (status, _) = post_json(
            make_router(app_state.clone()),
            "/api/v1/time-speed",
            &serde_json::json!({ "speed": 3 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(app_state.session.lock().time_speed().get(), 10);
    }

    // --- Persistence ---

    #[tokio::test]
    async fn test_save_writes_to_store() {
        let app_state = make_test_state();
        let (status, json) =
            post_json(make_router(app_state.clone()), "/api/v1/save", &serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["saved_at"], fixed_clock());
        let saved = app_state.store.lock().load().unwrap();
        assert_eq!(saved.saved_at, fixed_clock());
    }

    #[tokio::test]
    async fn test_tutorial_flag_round_trip() {
        let app_state = make_test_state();
        let (_, json) = get_json(make_router(app_state.clone()), "/api/v1/tutorial").await;
        assert_eq!(json["complete"], false);

        let (status, _) = post_json(
            make_router(app_state.clone()),
            "/api/v1/tutorial",
            &serde_json::json!({ "complete": true }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, json) = get_json(make_router(app_state), "/api/v1/tutorial").await;
        assert_eq!(json["complete"], true);
    }

    // --- Tick loop ---

    #[tokio::test]
    async fn test_tick_loop_broadcasts_reports() {
        let app_state = make_test_state();
        let mut rx = app_state.report_tx.subscribe();
        run_tick_loop(app_state.clone(), Some(3)).await;
        let report = rx.recv().await.unwrap();
        assert_eq!(report.now_ms, fixed_clock());
        assert_eq!(report.elapsed.minutes, 3_600);
    }
}
