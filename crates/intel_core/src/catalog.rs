//! Static template pools and tunables that drive world generation.
//!
//! Loaded from `content/*.json` by `intel_world`; tests build one in code via
//! `test_fixtures`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EntityType, OperationPhase, PlayerResources, ResponseOption, SourceId};

/// Key of the fallback entry in keyed template tables.
pub const DEFAULT_KEY: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub content_version: String,
    pub constants: Constants,
    /// Name pools keyed by `EntityType::name_pool`.
    pub names: BTreeMap<String, Vec<String>>,
    pub cities: Vec<CityDef>,
    pub templates: TemplateTables,
    pub sources: Vec<SourceDef>,
    pub phases: Vec<OperationPhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub base_entity_seed: u32,
    pub base_entity_types: Vec<EntityType>,
    pub max_entities: usize,
    /// An hour spawns nothing when its first draw exceeds this.
    pub spawn_skip_above: f64,
    /// A minute produces no event when its first draw exceeds this.
    pub event_skip_above: f64,
    pub event_log_limit: usize,
    pub ticker_limit: usize,
    pub base_connection_probability: f64,
    pub shared_source_bonus: f64,
    pub starting_resources: PlayerResources,
    pub budget_regen: u32,
    pub agent_regen: u32,
    pub credit_regen: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityDef {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDef {
    pub id: SourceId,
    pub name: String,
    pub kind: String,
    /// Records per second before jitter.
    pub base_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateTables {
    pub event_templates: BTreeMap<String, Vec<String>>,
    /// Relationship labels keyed by the sorted `typeA-typeB` pair.
    pub connection_types: BTreeMap<String, Vec<String>>,
    pub descriptions: BTreeMap<String, Vec<String>>,
    /// Response options offered on interactive `critical` and `high` events.
    #[serde(default)]
    pub response_options: BTreeMap<String, Vec<ResponseOption>>,
}

impl Catalog {
    pub fn name_pool(&self, kind: EntityType) -> &[String] {
        self.names
            .get(kind.name_pool())
            .or_else(|| self.names.get(EntityType::Person.name_pool()))
            .map_or(&[], Vec::as_slice)
    }

    pub fn descriptions(&self, kind: EntityType) -> &[String] {
        keyed_or_default(&self.templates.descriptions, kind.key())
    }

    pub fn event_templates(&self, kind: EntityType) -> &[String] {
        keyed_or_default(&self.templates.event_templates, kind.key())
    }

    /// Relationship labels for an unordered pair of entity types.
    pub fn connection_types(&self, a: EntityType, b: EntityType) -> &[String] {
        let (first, second) = if a.key() <= b.key() {
            (a.key(), b.key())
        } else {
            (b.key(), a.key())
        };
        keyed_or_default(
            &self.templates.connection_types,
            &format!("{first}-{second}"),
        )
    }

    pub fn source_ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id.clone()).collect()
    }
}

fn keyed_or_default<'a>(table: &'a BTreeMap<String, Vec<String>>, key: &str) -> &'a [String] {
    table
        .get(key)
        .filter(|pool| !pool.is_empty())
        .or_else(|| table.get(DEFAULT_KEY))
        .map_or(&[], Vec::as_slice)
}
