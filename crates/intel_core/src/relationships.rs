//! Living relationship model: strength decay, disruption and re-formation.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;

use crate::rng::{wrap_seed, Mulberry32};
use crate::{Connection, ConnectionClass, ConnectionMeta, Entity, EntityId};

const ACTIVITY_FLOOR: f64 = 10.0;
const ACTIVITY_DECAY: f64 = 0.05;
const REFORM_STEP: f64 = 0.5;
const REFORM_STRENGTH: f64 = 0.3;
const MIN_STRENGTH: f64 = 0.1;
const WEAK_LINK: f64 = 0.3;
const KEY_NODE_STRENGTH: f64 = 0.5;
const NEIGHBOUR_RISK: i64 = 5;

/// Keyword rules checked in order; the first hit wins.
const CLASS_KEYWORDS: [(ConnectionClass, &[&str]); 6] = [
    (ConnectionClass::Financial, &["financial", "transaction", "payment"]),
    (ConnectionClass::Digital, &["cyber", "digital", "communication", "email"]),
    (ConnectionClass::Business, &["business", "corporate", "partner"]),
    (ConnectionClass::Family, &["family", "relative", "spouse"]),
    (ConnectionClass::Criminal, &["criminal", "associate", "gang"]),
    (ConnectionClass::Organizational, &["organization", "member"]),
];

pub fn infer_connection_class(label: &str) -> ConnectionClass {
    let label = label.to_lowercase();
    CLASS_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| label.contains(word)))
        .map_or(ConnectionClass::Personal, |(class, _)| *class)
}

/// Attach relationship metadata. Initial activity is seeded by the pair so
/// a regenerated edge starts from the same point.
pub fn initialize_connection_meta(connection: &mut Connection, now_ms: i64) {
    let (low, high) = connection.key();
    let mut rng = Mulberry32::new(wrap_seed(low.0.wrapping_mul(31).wrapping_add(high.0)));
    connection.meta = Some(ConnectionMeta {
        class: infer_connection_class(&connection.kind),
        base_strength: connection.strength,
        activity: 50.0 + rng.next_f64() * 30.0,
        last_activity_ms: now_ms,
        disrupted: false,
        disrupted_at: None,
        can_reform: true,
        reform_progress: 0.0,
    });
}

/// Advance one connection by `delta_ms` of simulated time. A connection
/// without metadata is initialised and otherwise left alone.
pub fn update_connection_strength(connection: &mut Connection, delta_ms: i64, now_ms: i64) {
    if connection.meta.is_none() {
        initialize_connection_meta(connection, now_ms);
        return;
    }
    let Some(meta) = connection.meta.as_mut() else {
        return;
    };

    if meta.disrupted {
        if meta.can_reform {
            #[allow(clippy::cast_precision_loss)]
            let periods = delta_ms.max(0) as f64 / 30_000.0;
            meta.reform_progress = (meta.reform_progress + REFORM_STEP * periods).min(100.0);
            if meta.reform_progress >= 100.0 {
                meta.disrupted = false;
                meta.disrupted_at = None;
                meta.reform_progress = 0.0;
                connection.strength = meta.base_strength * REFORM_STRENGTH;
                return;
            }
        }
        connection.strength = 0.0;
        return;
    }

    meta.activity = (meta.activity - ACTIVITY_DECAY).max(ACTIVITY_FLOOR);
    let target = meta.base_strength * meta.activity / 100.0;
    #[allow(clippy::cast_precision_loss)]
    let rate = meta.class.volatility() * (delta_ms as f64 / 30_000.0) * 0.001;
    let strength = if connection.strength < target {
        (connection.strength + rate).min(target)
    } else {
        (connection.strength - rate).max(target)
    };
    connection.strength = strength.clamp(MIN_STRENGTH, 1.0);
}

pub fn update_all_connections(connections: &mut [Connection], delta_ms: i64, now_ms: i64) {
    for connection in connections {
        update_connection_strength(connection, delta_ms, now_ms);
    }
}

pub fn disrupt_connection(connection: &mut Connection, permanent: bool, now_ms: i64) {
    if connection.meta.is_none() {
        initialize_connection_meta(connection, now_ms);
    }
    if let Some(meta) = connection.meta.as_mut() {
        meta.disrupted = true;
        meta.disrupted_at = Some(now_ms);
        meta.can_reform = !permanent;
        meta.reform_progress = 0.0;
    }
    connection.strength = 0.0;
}

/// Cut links count in full and weak links (strength below 0.3) count half,
/// as a rounded percentage of all links, capped at 100.
pub fn network_fragmentation(connections: &[Connection]) -> u32 {
    if connections.is_empty() {
        return 0;
    }
    let weak = connections.iter().filter(|c| c.strength < WEAK_LINK).count();
    let disrupted = connections.iter().filter(|c| c.is_disrupted()).count();
    #[allow(clippy::cast_precision_loss)]
    let share = (disrupted as f64 + weak as f64 * 0.5) / connections.len() as f64 * 100.0;
    crate::floor_to_u64(share.round().min(100.0))
        .try_into()
        .unwrap_or(100)
}

/// Entities with the most strong, intact links, busiest first.
pub fn find_key_nodes<'a>(
    entities: &'a [Entity],
    connections: &[Connection],
    top_n: usize,
) -> Vec<&'a Entity> {
    let mut degree: AHashMap<EntityId, usize> = AHashMap::new();
    for connection in connections
        .iter()
        .filter(|c| c.strength >= KEY_NODE_STRENGTH && !c.is_disrupted())
    {
        *degree.entry(connection.from).or_default() += 1;
        *degree.entry(connection.to).or_default() += 1;
    }

    let mut ranked: Vec<(&Entity, usize)> = entities
        .iter()
        .filter_map(|entity| degree.get(&entity.id).map(|&count| (entity, count)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.id.cmp(&b.0.id)));
    ranked.into_iter().take(top_n).map(|(entity, _)| entity).collect()
}

/// Cut every direct link of `node`, weaken the neighbours' other links and
/// raise the neighbours' risk. Returns human-readable effect lines; empty
/// when the node had no intact link.
pub fn apply_network_effects(
    node: EntityId,
    entities: &mut [Entity],
    connections: &mut [Connection],
    now_ms: i64,
) -> Vec<String> {
    let neighbours: AHashSet<EntityId> = connections
        .iter()
        .filter(|c| !c.is_disrupted())
        .filter_map(|c| c.other(node))
        .collect();
    if neighbours.is_empty() {
        return Vec::new();
    }

    let mut effects = vec![format!(
        "{} connections affected by node disruption",
        neighbours.len()
    )];

    for connection in connections.iter_mut().filter(|c| !c.is_disrupted()) {
        if connection.touches(node) {
            disrupt_connection(connection, false, now_ms);
            effects.push(format!("Connection disrupted: {}", connection.kind));
        } else if neighbours.contains(&connection.from) || neighbours.contains(&connection.to) {
            connection.strength = (connection.strength * 0.7).max(MIN_STRENGTH);
            if let Some(meta) = connection.meta.as_mut() {
                meta.activity *= 0.8;
            }
        }
    }

    for entity in entities.iter_mut().filter(|e| neighbours.contains(&e.id)) {
        let risk = i64::from(entity.risk);
        entity.shift_risk(risk + NEIGHBOUR_RISK);
    }
    effects.push(format!("{} entities' networks weakened", neighbours.len()));
    effects
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionHealth {
    Strong,
    Moderate,
    Weak,
    Disrupted,
}

pub fn connection_health(connection: &Connection) -> ConnectionHealth {
    if connection.is_disrupted() {
        ConnectionHealth::Disrupted
    } else if connection.strength >= 0.7 {
        ConnectionHealth::Strong
    } else if connection.strength >= 0.4 {
        ConnectionHealth::Moderate
    } else {
        ConnectionHealth::Weak
    }
}
