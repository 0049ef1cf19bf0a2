//! Effects of investigations and alert responses on the world.
//!
//! Each function takes the records it needs and returns only the changed
//! records; the caller writes them back by index.

use crate::rng::{wrap_seed, Mulberry32};
use crate::{
    ConsequenceKind, ConsequenceLog, Connection, Entity, EntityId, ResponseKind, ThreatLevel,
    TimelineEvent,
};

const MAX_REVEALED: usize = 2;
const DEEP_INVESTIGATION_REDUCTION: i64 = 30;
const MONITOR_REDUCTION: i64 = 5;
const DISMISS_ESCALATION: i64 = 10;
const REVEALED_TYPES: [&str; 5] = [
    "Financial Transfer",
    "Communication",
    "Associate",
    "Meeting",
    "Shared Location",
];

#[derive(Debug, Clone, PartialEq)]
pub struct InvestigationOutcome {
    pub entity: Entity,
    pub new_connections: Vec<Connection>,
    pub log: Option<ConsequenceLog>,
}

/// Consequences of reaching investigation `level` on `entity`.
///
/// Level 2 reveals up to two links to entities not yet connected. Level 3
/// cuts risk by 30. Other levels change nothing.
pub fn apply_investigation_consequences(
    entity: &Entity,
    entities: &[Entity],
    connections: &[Connection],
    level: u8,
    now_ms: i64,
) -> InvestigationOutcome {
    let mut outcome = InvestigationOutcome {
        entity: entity.clone(),
        new_connections: Vec::new(),
        log: None,
    };
    let seed = entity.id.0.wrapping_mul(u64::from(level)).wrapping_mul(1000);
    let mut rng = Mulberry32::new(wrap_seed(seed));
    let log_id = format!("consequence_inv_{}_{now_ms}", entity.id);

    match level {
        2 => {
            let mut candidates: Vec<EntityId> = entities
                .iter()
                .map(|other| other.id)
                .filter(|&other| {
                    other != entity.id
                        && !connections
                            .iter()
                            .any(|c| c.touches(entity.id) && c.touches(other))
                })
                .collect();
            if candidates.is_empty() {
                return outcome;
            }

            let reveal = MAX_REVEALED.min(candidates.len());
            for _ in 0..reveal {
                let target = candidates.remove(rng.index(candidates.len()));
                let kind = rng
                    .pick(&REVEALED_TYPES)
                    .map_or("Associate", |kind| kind)
                    .to_string();
                let (from, to) = crate::pair_key(entity.id, target);
                outcome.new_connections.push(Connection {
                    from,
                    to,
                    kind,
                    strength: 0.3 + rng.next_f64() * 0.4,
                    evidence: rng.range(1, 5),
                    revealed: true,
                    meta: None,
                });
            }
            outcome.log = Some(ConsequenceLog {
                id: log_id,
                timestamp: now_ms,
                kind: ConsequenceKind::Investigation,
                entity_id: Some(entity.id),
                message: format!(
                    "Investigation revealed {reveal} hidden connection(s) to {}",
                    entity.name
                ),
                effects: Vec::new(),
            });
        }
        3 => {
            let before = outcome.entity.risk;
            outcome
                .entity
                .shift_risk(i64::from(before) - DEEP_INVESTIGATION_REDUCTION);
            outcome.log = Some(ConsequenceLog {
                id: log_id,
                timestamp: now_ms,
                kind: ConsequenceKind::Investigation,
                entity_id: Some(entity.id),
                message: format!(
                    "Deep investigation reduced {} threat level from {before} to {}",
                    entity.name, outcome.entity.risk
                ),
                effects: Vec::new(),
            });
        }
        _ => {}
    }

    outcome
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutcome {
    pub entity: Entity,
    pub log: ConsequenceLog,
}

/// Consequences of answering an interactive alert with `option`.
/// Returns `None` when the event's entity no longer exists.
pub fn apply_alert_response_consequences(
    event: &TimelineEvent,
    option: ResponseKind,
    entities: &[Entity],
    now_ms: i64,
) -> Option<AlertOutcome> {
    let mut entity = entities.iter().find(|e| e.id == event.entity)?.clone();
    let risk = i64::from(entity.risk);

    let message = match option {
        ResponseKind::Investigate => {
            let seed = event.id.0.wrapping_mul(31).wrapping_add(entity.id.0);
            let roll = Mulberry32::new(wrap_seed(seed)).next_f64();
            // 20..=40 after rounding; bounded, so the cast cannot truncate.
            #[allow(clippy::cast_possible_truncation)]
            let reduction = (20.0 + roll * 20.0).round() as i64;
            entity.shift_risk(risk - reduction);
            format!(
                "Alert response: Full investigation neutralized {} threat by {reduction}%",
                entity.name
            )
        }
        ResponseKind::Monitor => {
            entity.shift_risk(risk - MONITOR_REDUCTION);
            format!(
                "Alert response: Enhanced monitoring stabilized {} threat level",
                entity.name
            )
        }
        ResponseKind::Dismiss => {
            entity.shift_risk(risk + DISMISS_ESCALATION);
            entity.threat = ThreatLevel::escalated(entity.risk);
            format!("Alert dismissed: {} threat escalated by 10%", entity.name)
        }
    };

    Some(AlertOutcome {
        log: ConsequenceLog {
            id: format!("consequence_alert_{}_{now_ms}", event.id),
            timestamp: now_ms,
            kind: ConsequenceKind::AlertResponse,
            entity_id: Some(entity.id),
            message,
            effects: Vec::new(),
        },
        entity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{entity_at, interactive_event};
    use crate::EventId;

    #[test]
    fn deep_investigation_cuts_thirty_points() {
        let entity = entity_at(4, 82);
        let outcome = apply_investigation_consequences(&entity, &[entity.clone()], &[], 3, 1000);
        assert_eq!(outcome.entity.risk, 52);
        assert_eq!(outcome.entity.threat, ThreatLevel::Medium);
        assert_eq!(outcome.entity.risk_adjustment, -30);
        let log = outcome.log.expect("level 3 always logs");
        assert_eq!(log.kind, ConsequenceKind::Investigation);
        assert_eq!(log.entity_id, Some(entity.id));
        assert!(log.message.contains("from 82 to 52"));
        assert!(outcome.new_connections.is_empty());
    }

    #[test]
    fn deep_investigation_floors_at_zero() {
        let entity = entity_at(4, 12);
        let outcome = apply_investigation_consequences(&entity, &[], &[], 3, 0);
        assert_eq!(outcome.entity.risk, 0);
        assert_eq!(outcome.entity.threat, ThreatLevel::Low);
    }

    #[test]
    fn level_two_reveals_links_to_unconnected_entities() {
        let entities: Vec<Entity> = (1..=5).map(|id| entity_at(id, 50)).collect();
        let existing = vec![Connection {
            from: EntityId(1),
            to: EntityId(2),
            kind: "associate".to_string(),
            strength: 0.5,
            evidence: 3,
            revealed: false,
            meta: None,
        }];
        let outcome = apply_investigation_consequences(&entities[0], &entities, &existing, 2, 7);
        assert_eq!(outcome.new_connections.len(), 2);
        for connection in &outcome.new_connections {
            assert!(connection.touches(EntityId(1)));
            assert!(!connection.touches(EntityId(2)));
            assert!(connection.revealed);
            assert!((0.3..0.7).contains(&connection.strength));
            assert!((1..=5).contains(&connection.evidence));
        }
        assert_ne!(
            outcome.new_connections[0].key(),
            outcome.new_connections[1].key()
        );
        assert!(outcome.log.unwrap().message.starts_with("Investigation revealed 2"));
    }

    #[test]
    fn level_two_without_candidates_is_silent() {
        let entity = entity_at(1, 50);
        let outcome = apply_investigation_consequences(&entity, &[entity.clone()], &[], 2, 0);
        assert!(outcome.log.is_none());
        assert!(outcome.new_connections.is_empty());
        assert_eq!(outcome.entity, entity);
    }

    #[test]
    fn level_one_changes_nothing() {
        let entity = entity_at(1, 50);
        let outcome = apply_investigation_consequences(&entity, &[entity.clone()], &[], 1, 0);
        assert!(outcome.log.is_none());
        assert_eq!(outcome.entity, entity);
    }

    #[test]
    fn dismiss_escalates_to_critical() {
        let entities = vec![entity_at(9, 70)];
        let event = interactive_event(EventId(3), EntityId(9));
        let outcome =
            apply_alert_response_consequences(&event, ResponseKind::Dismiss, &entities, 5)
                .unwrap();
        assert_eq!(outcome.entity.risk, 80);
        assert_eq!(outcome.entity.threat, ThreatLevel::Critical);
        assert_eq!(outcome.log.kind, ConsequenceKind::AlertResponse);
    }

    #[test]
    fn dismiss_caps_risk_at_hundred() {
        let entities = vec![entity_at(9, 96)];
        let event = interactive_event(EventId(3), EntityId(9));
        let outcome =
            apply_alert_response_consequences(&event, ResponseKind::Dismiss, &entities, 5)
                .unwrap();
        assert_eq!(outcome.entity.risk, 100);
    }

    #[test]
    fn investigate_reduces_between_twenty_and_forty() {
        for event_id in 0..50 {
            let entities = vec![entity_at(9, 90)];
            let event = interactive_event(EventId(event_id), EntityId(9));
            let outcome =
                apply_alert_response_consequences(&event, ResponseKind::Investigate, &entities, 0)
                    .unwrap();
            assert!((50..=70).contains(&outcome.entity.risk));
            assert_eq!(outcome.entity.threat, ThreatLevel::from_risk(outcome.entity.risk));
        }
    }

    #[test]
    fn monitor_trims_five() {
        let entities = vec![entity_at(9, 61)];
        let event = interactive_event(EventId(3), EntityId(9));
        let outcome =
            apply_alert_response_consequences(&event, ResponseKind::Monitor, &entities, 0)
                .unwrap();
        assert_eq!(outcome.entity.risk, 56);
        assert_eq!(outcome.entity.threat, ThreatLevel::Medium);
    }

    #[test]
    fn missing_entity_is_a_no_op() {
        let event = interactive_event(EventId(3), EntityId(404));
        assert!(apply_alert_response_consequences(
            &event,
            ResponseKind::Dismiss,
            &[entity_at(1, 50)],
            0
        )
        .is_none());
    }
}
