//! Entity population: the fixed base set, hourly spawns, and minute drift.

use crate::rng::Mulberry32;
use crate::{Catalog, Entity, EntityId, EntityType, SourceList, ThreatLevel};

const SPAWN_SEED_STRIDE: u64 = 7919;
const SPAWNED_ID_OFFSET: u64 = 100;
const DRIFT_SEED_STRIDE: u64 = 1000;
const RISK_FLOOR: i64 = 5;
const RISK_CEILING: i64 = 100;

/// The base entities, identical on every call for a given catalog.
pub fn generate_base_entities(catalog: &Catalog) -> Vec<Entity> {
    let mut rng = Mulberry32::new(catalog.constants.base_entity_seed);
    catalog
        .constants
        .base_entity_types
        .iter()
        .zip(1_u64..)
        .filter_map(|(&kind, id)| create_entity(catalog, EntityId(id), kind, &mut rng, None))
        .collect()
}

/// Entities that appeared during the first `elapsed_hours` hours.
///
/// Each hour rolls independently from its own seed, so the result for `h` is
/// always a prefix of the result for any later hour count.
pub fn generate_spawned_entities(catalog: &Catalog, elapsed_hours: u64) -> Vec<Entity> {
    let base_count = catalog.constants.base_entity_types.len();
    let mut spawned = Vec::new();

    for hour in 0..elapsed_hours {
        let mut rng = Mulberry32::from_wide(hour.wrapping_mul(SPAWN_SEED_STRIDE));
        if rng.next_f64() > catalog.constants.spawn_skip_above {
            continue;
        }
        if base_count + spawned.len() >= catalog.constants.max_entities {
            break;
        }
        let kind = spawn_type(rng.next_f64());
        let id = EntityId(SPAWNED_ID_OFFSET + hour);
        if let Some(entity) = create_entity(catalog, id, kind, &mut rng, Some(hour)) {
            spawned.push(entity);
        }
    }

    spawned
}

fn spawn_type(roll: f64) -> EntityType {
    if roll < 0.25 {
        EntityType::Person
    } else if roll < 0.45 {
        EntityType::Company
    } else if roll < 0.60 {
        EntityType::Location
    } else if roll < 0.75 {
        EntityType::Financial
    } else if roll < 0.85 {
        EntityType::Cyber
    } else {
        EntityType::Comms
    }
}

/// Apply this minute's drift (−3..=+5) to every entity, clamped to 5–100.
pub fn update_risk_scores(entities: &mut [Entity], elapsed_minutes: u64) {
    for entity in entities {
        let seed = entity
            .id
            .0
            .wrapping_mul(DRIFT_SEED_STRIDE)
            .wrapping_add(elapsed_minutes);
        let mut rng = Mulberry32::from_wide(seed);
        let drift = i64::from(rng.range(0, 9)) - 3;
        let risk = (i64::from(entity.risk) + drift).clamp(RISK_FLOOR, RISK_CEILING);
        entity.risk = crate::clamp_risk(risk);
        entity.threat = ThreatLevel::from_risk(entity.risk);
    }
}

/// Draw one entity. Returns `None` when the catalog has no cities.
fn create_entity(
    catalog: &Catalog,
    id: EntityId,
    kind: EntityType,
    rng: &mut Mulberry32,
    spawned_at: Option<u64>,
) -> Option<Entity> {
    let city = rng.pick(&catalog.cities)?.clone();
    let risk = rng.range(20, 60);
    let name = rng
        .pick(catalog.name_pool(kind))
        .cloned()
        .unwrap_or_else(|| format!("Subject {id}"));
    let x = rng.range(50, 700);
    let y = rng.range(50, 450);
    let desc = rng
        .pick(catalog.descriptions(kind))
        .cloned()
        .unwrap_or_default();
    let sources = pick_sources(catalog, rng);

    Some(Entity {
        id,
        name,
        kind,
        threat: ThreatLevel::from_risk(risk),
        risk,
        x,
        y,
        lat: city.lat,
        lng: city.lng,
        city: city.name,
        desc,
        sources,
        spawned_at,
        investigation_level: 0,
        flags: crate::PlayerFlags::default(),
        risk_adjustment: 0,
        branches: Vec::new(),
    })
}

/// One to three draws from the source list, duplicates dropped.
fn pick_sources(catalog: &Catalog, rng: &mut Mulberry32) -> SourceList {
    let count = rng.range(1, 3);
    let mut sources = SourceList::new();
    for _ in 0..count {
        let Some(def) = rng.pick(&catalog.sources) else {
            break;
        };
        if !sources.contains(&def.id) {
            sources.push(def.id.clone());
        }
    }
    sources
}
