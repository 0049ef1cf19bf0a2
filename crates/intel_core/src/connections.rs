//! Edges between entities. Regenerated per hour bucket; shared collection
//! sources make a pair more likely to be linked.

use ahash::AHashSet;

use crate::rng::{wrap_seed, Mulberry32};
use crate::{pair_key, Catalog, Connection, Entity};

const LOW_ID_STRIDE: u64 = 997;
const HIGH_ID_STRIDE: u64 = 991;

pub fn generate_connections(
    catalog: &Catalog,
    entities: &[Entity],
    elapsed_hours: u64,
) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut seen = AHashSet::new();

    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            let (low, high) = pair_key(a.id, b.id);
            let seed = low
                .0
                .wrapping_mul(LOW_ID_STRIDE)
                .wrapping_add(high.0.wrapping_mul(HIGH_ID_STRIDE))
                .wrapping_add(elapsed_hours);
            let mut rng = Mulberry32::new(wrap_seed(seed));

            let shared = a.sources.iter().filter(|s| b.sources.contains(s)).count();
            let probability = catalog.constants.base_connection_probability
                + shared as f64 * catalog.constants.shared_source_bonus;
            if rng.next_f64() > probability {
                continue;
            }
            if !seen.insert((low, high)) {
                continue;
            }

            let kind = rng
                .pick(catalog.connection_types(a.kind, b.kind))
                .cloned()
                .unwrap_or_else(|| "linked_to".to_string());
            let strength = 0.2 + rng.next_f64() * 0.8;
            let evidence = rng.range(1, 20);

            connections.push(Connection {
                from: low,
                to: high,
                kind,
                strength,
                evidence,
                revealed: false,
                meta: None,
            });
        }
    }

    connections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{generate_base_entities, generate_spawned_entities};
    use crate::test_fixtures::base_catalog;
    use std::collections::BTreeMap;

    fn population() -> Vec<Entity> {
        let catalog = base_catalog();
        let mut entities = generate_base_entities(&catalog);
        entities.extend(generate_spawned_entities(&catalog, 72));
        entities
    }

    #[test]
    fn edges_are_normalised_and_unique() {
        let catalog = base_catalog();
        let entities = population();
        let connections = generate_connections(&catalog, &entities, 72);
        let mut keys = AHashSet::new();
        for connection in &connections {
            assert!(connection.from < connection.to);
            assert!(keys.insert(connection.key()));
            assert!((0.2..=1.0).contains(&connection.strength));
            assert!((1..=20).contains(&connection.evidence));
        }
    }

    #[test]
    fn reversed_input_yields_same_edge_set() {
        let catalog = base_catalog();
        let entities = population();
        let mut reversed = entities.clone();
        reversed.reverse();

        let by_key = |connections: Vec<Connection>| {
            connections
                .into_iter()
                .map(|c| (c.key(), (c.kind, c.evidence)))
                .collect::<BTreeMap<_, _>>()
        };
        assert_eq!(
            by_key(generate_connections(&catalog, &entities, 10)),
            by_key(generate_connections(&catalog, &reversed, 10)),
        );
    }

    #[test]
    fn same_hour_same_graph() {
        let catalog = base_catalog();
        let entities = population();
        assert_eq!(
            generate_connections(&catalog, &entities, 30),
            generate_connections(&catalog, &entities, 30)
        );
    }

    #[test]
    fn endpoints_reference_existing_entities() {
        let catalog = base_catalog();
        let entities = population();
        for connection in generate_connections(&catalog, &entities, 5) {
            assert!(entities.iter().any(|e| e.id == connection.from));
            assert!(entities.iter().any(|e| e.id == connection.to));
        }
    }

    #[test]
    fn empty_population_has_no_edges() {
        let catalog = base_catalog();
        assert!(generate_connections(&catalog, &[], 10).is_empty());
    }
}
