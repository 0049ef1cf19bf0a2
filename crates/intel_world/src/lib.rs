//! Content loading and file-backed player persistence shared between
//! intel_cli and intel_daemon.

use anyhow::{Context, Result};
use intel_core::catalog::{CityDef, Constants, SourceDef, TemplateTables, DEFAULT_KEY};
use intel_core::{Catalog, OperationPhase, PersistedState, PlayerStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct ConstantsFile {
    content_version: String,
    #[serde(flatten)]
    constants: Constants,
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let raw = std::fs::read_to_string(dir.join(name)).with_context(|| format!("reading {name}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {name}"))
}

/// Validates cross-references in a loaded catalog, panicking on any
/// authoring error.
///
/// Catches mistakes like a base entity type with no name pool, a keyed
/// template table without its `default` entry, or phases out of day order.
pub fn validate_catalog(catalog: &Catalog) {
    let c = &catalog.constants;

    for kind in &c.base_entity_types {
        assert!(
            !catalog.name_pool(*kind).is_empty(),
            "base entity type '{}' has no name pool",
            kind.key(),
        );
    }
    assert!(
        c.base_entity_types.len() <= c.max_entities,
        "{} base entities exceed max_entities {}",
        c.base_entity_types.len(),
        c.max_entities,
    );

    let keyed = [
        ("event_templates", &catalog.templates.event_templates),
        ("descriptions", &catalog.templates.descriptions),
        ("connection_types", &catalog.templates.connection_types),
    ];
    for (table, entries) in keyed {
        assert!(
            entries.contains_key(DEFAULT_KEY),
            "template table '{table}' has no '{DEFAULT_KEY}' entry",
        );
    }

    let mut source_ids = HashSet::new();
    for source in &catalog.sources {
        assert!(
            source_ids.insert(&source.id),
            "source id '{}' is not unique",
            source.id,
        );
        assert!(
            source.base_rate >= 0.0,
            "source '{}' has negative base rate",
            source.id,
        );
    }

    for pair in catalog.phases.windows(2) {
        assert!(
            pair[0].day <= pair[1].day,
            "phase '{}' (day {}) is listed after '{}' (day {})",
            pair[1].name,
            pair[1].day,
            pair[0].name,
            pair[0].day,
        );
    }

    let r = &c.starting_resources;
    assert!(
        r.budget <= r.max_budget && r.agents <= r.max_agents && r.data_credits <= r.max_data_credits,
        "starting resources exceed their maxima",
    );
}

pub fn load_catalog(content_dir: &str) -> Result<Catalog> {
    let dir = Path::new(content_dir);
    let constants_file: ConstantsFile = read_json(dir, "constants.json")?;
    let names: BTreeMap<String, Vec<String>> = read_json(dir, "names.json")?;
    let cities: Vec<CityDef> = read_json(dir, "cities.json")?;
    let templates: TemplateTables = read_json(dir, "templates.json")?;
    let sources: Vec<SourceDef> = read_json(dir, "sources.json")?;
    let phases: Vec<OperationPhase> = read_json(dir, "phases.json")?;
    let catalog = Catalog {
        content_version: constants_file.content_version,
        constants: constants_file.constants,
        names,
        cities,
        templates,
        sources,
        phases,
    };
    validate_catalog(&catalog);
    Ok(catalog)
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

const STATE_FILE: &str = "player_state.json";
const TUTORIAL_FILE: &str = "tutorial.json";

#[derive(Serialize, Deserialize)]
struct TutorialRecord {
    complete: bool,
}

/// `PlayerStore` backed by two JSON files in one directory. IO and parse
/// failures are logged and swallowed.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&self.dir, name).map(Some)
    }

    /// Write through a temp file so a crash never leaves half a record.
    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let json = serde_json::to_vec_pretty(value).with_context(|| format!("encoding {name}"))?;
        let tmp = self.dir.join(format!("{name}.tmp"));
        std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, self.dir.join(name)).with_context(|| format!("replacing {name}"))
    }
}

impl PlayerStore for JsonFileStore {
    fn load(&self) -> Option<PersistedState> {
        match self.read(STATE_FILE) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable player state");
                None
            }
        }
    }

    fn save(&mut self, state: &PersistedState) {
        if let Err(err) = self.write(STATE_FILE, state) {
            tracing::warn!(error = %err, "player state not saved");
        }
    }

    fn tutorial_complete(&self) -> bool {
        match self.read::<TutorialRecord>(TUTORIAL_FILE) {
            Ok(record) => record.is_some_and(|r| r.complete),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable tutorial flag");
                false
            }
        }
    }

    fn set_tutorial_complete(&mut self, complete: bool) {
        if let Err(err) = self.write(TUTORIAL_FILE, &TutorialRecord { complete }) {
            tracing::warn!(error = %err, "tutorial flag not saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intel_core::clock::{EPOCH_MS, HOUR_MS};
    use intel_core::test_fixtures::base_catalog;
    use intel_core::{Session, TimeSpeed};

    #[test]
    fn test_shipped_catalog_passes_validation() {
        validate_catalog(&base_catalog());
    }

    #[test]
    #[should_panic(expected = "has no 'default' entry")]
    fn test_missing_default_template_panics() {
        let mut catalog = base_catalog();
        catalog.templates.descriptions.remove(DEFAULT_KEY);
        validate_catalog(&catalog);
    }

    #[test]
    #[should_panic(expected = "is not unique")]
    fn test_duplicate_source_panics() {
        let mut catalog = base_catalog();
        let copy = catalog.sources[0].clone();
        catalog.sources.push(copy);
        validate_catalog(&catalog);
    }

    #[test]
    #[should_panic(expected = "is listed after")]
    fn test_unsorted_phases_panic() {
        let mut catalog = base_catalog();
        catalog.phases.reverse();
        validate_catalog(&catalog);
    }

    #[test]
    fn test_store_round_trips_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("player"));
        assert!(store.load().is_none());

        let session = Session::new(base_catalog(), EPOCH_MS + HOUR_MS, TimeSpeed::REALTIME, None);
        let persisted = session.capture(EPOCH_MS + HOUR_MS);
        store.save(&persisted);
        let loaded = store.load().unwrap();
        assert_eq!(loaded.player_resources, persisted.player_resources);
        assert_eq!(loaded.saved_at, persisted.saved_at);
        assert!(!dir.path().join("player").join("player_state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_state_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE), "{ not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_tutorial_flag_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path());
        assert!(!store.tutorial_complete());
        store.set_tutorial_complete(true);
        assert!(JsonFileStore::new(dir.path()).tutorial_complete());
        store.set_tutorial_complete(false);
        assert!(!store.tutorial_complete());
    }
}
