//! Shared test fixtures for intel_core and downstream crates.
//!
//! `base_catalog()` parses the shipped `content/` directory, so tests see the
//! same pools and tunables as a real run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;

use crate::catalog::{Catalog, Constants, TemplateTables};
use crate::clock::{sim_time, MINUTE_MS};
use crate::{
    Entity, EntityId, EntityType, EventId, PlayerFlags, PlayerResources, SourceId, SourceList,
    ThreatLevel, TimelineEvent,
};

fn parse<T: DeserializeOwned>(name: &str, raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|err| panic!("content/{name}: {err}"))
}

#[derive(serde::Deserialize)]
struct VersionOnly {
    content_version: String,
}

/// The catalog shipped in `content/`.
pub fn base_catalog() -> Catalog {
    let constants_raw = include_str!("../../../content/constants.json");
    Catalog {
        content_version: parse::<VersionOnly>("constants.json", constants_raw).content_version,
        constants: parse::<Constants>("constants.json", constants_raw),
        names: parse("names.json", include_str!("../../../content/names.json")),
        cities: parse("cities.json", include_str!("../../../content/cities.json")),
        templates: parse::<TemplateTables>(
            "templates.json",
            include_str!("../../../content/templates.json"),
        ),
        sources: parse("sources.json", include_str!("../../../content/sources.json")),
        phases: parse("phases.json", include_str!("../../../content/phases.json")),
    }
}

/// A catalog with no cities; generators that need a location yield nothing.
pub fn empty_catalog() -> Catalog {
    let mut catalog = base_catalog();
    catalog.cities.clear();
    catalog
}

/// Starting resources from `content/constants.json`.
pub fn base_resources() -> PlayerResources {
    PlayerResources {
        budget: 10_000,
        max_budget: 10_000,
        agents: 8,
        max_agents: 10,
        data_credits: 10,
        max_data_credits: 20,
        influence: 50,
    }
}

/// A Vienna-based person at `risk`, seen by SIGINT.
pub fn entity_at(id: u64, risk: u32) -> Entity {
    let mut sources = SourceList::new();
    sources.push(SourceId::new("SIGINT"));
    Entity {
        id: EntityId(id),
        name: format!("Subject {id}"),
        kind: EntityType::Person,
        threat: ThreatLevel::from_risk(risk),
        risk,
        x: 400,
        y: 300,
        lat: 48.2082,
        lng: 16.3738,
        city: "Vienna".to_string(),
        desc: String::new(),
        sources,
        spawned_at: None,
        investigation_level: 0,
        flags: PlayerFlags::default(),
        risk_adjustment: 0,
        branches: Vec::new(),
    }
}

/// A critical interactive event at the epoch with a three-minute window and
/// the catalog's critical response options.
pub fn interactive_event(id: EventId, entity: EntityId) -> TimelineEvent {
    let catalog = base_catalog();
    TimelineEvent {
        id,
        time: sim_time(0),
        label: "Intercepted transfer instructions".to_string(),
        entity,
        severity: ThreatLevel::Critical,
        source: SourceId::new("SIGINT"),
        requires_response: true,
        response_options: catalog
            .templates
            .response_options
            .get("critical")
            .cloned()
            .unwrap_or_default(),
        response_deadline: Some(sim_time(3 * MINUTE_MS)),
        player_response: None,
    }
}

/// Deterministic RNG for randomized test drivers.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
