//! Content validation tests for the shipped `content/*.json` pools.
//!
//! These tests load the real files and check:
//! 1. Schema validity: every file deserializes
//! 2. Range constraints: rates, probabilities and limits are sane
//! 3. Template integrity: placeholders and pools the generators rely on
//! 4. Playability: the assembled world has something to do

use intel_core::clock::{EPOCH_MS, HOUR_MS};
use intel_core::{assemble, Catalog, EntityType, ThreatLevel, TimeSpeed};
use intel_world::load_catalog;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

fn load_test_catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        load_catalog(&content_dir()).expect("load_catalog should succeed for shipped content")
    })
}

// =========================================================================
// 1. Schema validation
// =========================================================================

#[test]
fn content_loads_successfully() {
    let catalog = load_test_catalog();
    assert!(!catalog.content_version.is_empty());
}

#[test]
fn missing_directory_reports_the_file() {
    let err = load_catalog("/definitely/not/here").unwrap_err();
    assert!(format!("{err:#}").contains("constants.json"));
}

#[test]
fn loaded_catalog_matches_test_fixture() {
    let fixture = intel_core::test_fixtures::base_catalog();
    let loaded = load_test_catalog();
    assert_eq!(loaded.content_version, fixture.content_version);
    assert_eq!(loaded.names, fixture.names);
    assert_eq!(loaded.cities, fixture.cities);
    assert_eq!(loaded.sources.len(), fixture.sources.len());
}

// =========================================================================
// 2. Range constraints
// =========================================================================

#[test]
fn probabilities_are_in_unit_interval() {
    let c = &load_test_catalog().constants;
    for (name, value) in [
        ("spawn_skip_above", c.spawn_skip_above),
        ("event_skip_above", c.event_skip_above),
        ("base_connection_probability", c.base_connection_probability),
        ("shared_source_bonus", c.shared_source_bonus),
    ] {
        assert!((0.0..=1.0).contains(&value), "{name} = {value}");
    }
}

#[test]
fn base_population_is_twelve() {
    let c = &load_test_catalog().constants;
    assert_eq!(c.base_entity_seed, 42);
    assert_eq!(c.base_entity_types.len(), 12);
    assert_eq!(c.max_entities, 30);
}

#[test]
fn source_rates_are_positive_and_ids_unique() {
    let catalog = load_test_catalog();
    let mut ids = HashSet::new();
    for source in &catalog.sources {
        assert!(source.base_rate > 0.0, "source '{}' has no rate", source.id);
        assert!(ids.insert(source.id.clone()));
    }
    assert_eq!(catalog.sources.len(), 8);
}

#[test]
fn cities_have_valid_coordinates() {
    for city in &load_test_catalog().cities {
        assert!((-90.0..=90.0).contains(&city.lat), "{}", city.name);
        assert!((-180.0..=180.0).contains(&city.lng), "{}", city.name);
    }
}

// =========================================================================
// 3. Template integrity
// =========================================================================

#[test]
fn every_entity_kind_has_names_and_event_templates() {
    let catalog = load_test_catalog();
    for kind in [
        EntityType::Person,
        EntityType::Company,
        EntityType::Organization,
        EntityType::Location,
        EntityType::Financial,
        EntityType::Cyber,
        EntityType::Comms,
    ] {
        assert!(!catalog.name_pool(kind).is_empty(), "{}", kind.key());
        assert!(!catalog.event_templates(kind).is_empty(), "{}", kind.key());
        assert!(!catalog.descriptions(kind).is_empty(), "{}", kind.key());
    }
}

#[test]
fn event_templates_name_their_entity() {
    for (kind, templates) in &load_test_catalog().templates.event_templates {
        for template in templates {
            assert!(template.contains("{entity}"), "{kind}: {template}");
        }
    }
}

#[test]
fn interactive_bands_offer_three_responses() {
    let options = &load_test_catalog().templates.response_options;
    for band in ["critical", "high"] {
        let offered = options.get(band).map_or(0, Vec::len);
        assert_eq!(offered, 3, "{band}");
    }
}

// =========================================================================
// 4. Playability
// =========================================================================

#[test]
fn first_day_produces_threats_and_links() {
    let catalog = load_test_catalog();
    let state = assemble(catalog, EPOCH_MS + 24 * HOUR_MS, TimeSpeed::REALTIME);
    assert!(state.entities.len() > 12);
    assert!(!state.connections.is_empty());
    assert!(!state.events.is_empty());
    assert!(state
        .entities
        .iter()
        .any(|e| e.threat >= ThreatLevel::High));
    assert!(!state.objectives.is_empty());
}
