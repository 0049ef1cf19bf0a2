//! Timeline events (one roll per simulated minute) and the alert ticker.

use chrono::{DateTime, Duration, Utc};

use crate::clock::minute_time;
use crate::rng::{wrap_seed, Mulberry32};
use crate::{
    Alert, AlertId, Catalog, Entity, EntityType, EventId, ResponseOption, Severity, SourceId,
    ThreatLevel, TimelineEvent,
};

const EVENT_SEED_STRIDE: u64 = 4201;
const CRITICAL_RESPONSE_CHANCE: f64 = 0.8;
const HIGH_RESPONSE_CHANCE: f64 = 0.3;
const CRITICAL_DEADLINE_MS: i64 = 180_000;
const HIGH_DEADLINE_MS: i64 = 240_000;
const FALLBACK_SOURCE: &str = "SIGINT";
const HIGH_TICKER_CANDIDATES: usize = 3;
const MEDIUM_ALERT_BASE_ID: u64 = 10_000;

/// Events for every minute before `elapsed_minutes`, oldest first, keeping
/// only the newest `event_log_limit`.
///
/// Minutes roll independently, so the walk runs backwards from the newest
/// minute and stops once the log is full.
pub fn generate_events(
    catalog: &Catalog,
    entities: &[Entity],
    elapsed_minutes: u64,
) -> Vec<TimelineEvent> {
    let limit = catalog.constants.event_log_limit;
    if entities.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut events = Vec::with_capacity(limit);
    for minute in (0..elapsed_minutes).rev() {
        if let Some(event) = event_for_minute(catalog, entities, minute) {
            events.push(event);
            if events.len() == limit {
                break;
            }
        }
    }
    events.reverse();
    events
}

fn event_for_minute(catalog: &Catalog, entities: &[Entity], minute: u64) -> Option<TimelineEvent> {
    let mut rng = Mulberry32::new(wrap_seed(minute.wrapping_mul(EVENT_SEED_STRIDE)));
    if rng.next_f64() > catalog.constants.event_skip_above {
        return None;
    }

    let entity = rng.pick(entities)?;
    let severity = pick_severity(&mut rng);
    let source = rng
        .pick(&entity.sources)
        .cloned()
        .unwrap_or_else(|| SourceId::new(FALLBACK_SOURCE));
    let time = minute_time(minute);
    let label = render_template(catalog, entity.kind, &mut rng, &entity.name);

    let mut event = TimelineEvent {
        id: EventId(minute),
        time,
        label,
        entity: entity.id,
        severity,
        source,
        requires_response: false,
        response_options: Vec::new(),
        response_deadline: None,
        player_response: None,
    };

    let interactive = match severity {
        ThreatLevel::Critical if rng.next_f64() < CRITICAL_RESPONSE_CHANCE => {
            Some(CRITICAL_DEADLINE_MS)
        }
        ThreatLevel::High if rng.next_f64() < HIGH_RESPONSE_CHANCE => Some(HIGH_DEADLINE_MS),
        _ => None,
    };
    if let Some(deadline_ms) = interactive {
        let options = response_options(catalog, severity);
        if !options.is_empty() {
            event.requires_response = true;
            event.response_options = options.to_vec();
            event.response_deadline = Some(time + Duration::milliseconds(deadline_ms));
        }
    }

    Some(event)
}

fn response_options(catalog: &Catalog, severity: Severity) -> &[ResponseOption] {
    catalog
        .templates
        .response_options
        .get(&severity.to_string())
        .map_or(&[], Vec::as_slice)
}

fn pick_severity(rng: &mut Mulberry32) -> Severity {
    let roll = rng.next_f64();
    if roll < 0.05 {
        ThreatLevel::Critical
    } else if roll < 0.20 {
        ThreatLevel::High
    } else if roll < 0.50 {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

/// Fill an event template for `kind`. Always consumes the amount and count
/// draws so the stream position does not depend on the template chosen.
pub fn render_template(
    catalog: &Catalog,
    kind: EntityType,
    rng: &mut Mulberry32,
    entity_name: &str,
) -> String {
    let template = rng
        .pick(catalog.event_templates(kind))
        .cloned()
        .unwrap_or_else(|| "New intelligence collected on {entity}".to_string());
    let amount = format!("{}K", rng.range(100, 900));
    let count = rng.range(5, 20).to_string();
    template
        .replacen("{entity}", entity_name, 1)
        .replacen("{amount}", &amount, 1)
        .replacen("{n}", &count, 1)
}

/// Ticker lines for the current minute: every critical entity, a coin flip
/// for up to three high entities, and a few routine station reports.
pub fn generate_alerts(
    catalog: &Catalog,
    entities: &[Entity],
    elapsed_minutes: u64,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if entities.is_empty() {
        return alerts;
    }
    let mut rng = Mulberry32::new(wrap_seed(elapsed_minutes));

    for entity in entities.iter().filter(|e| e.threat == ThreatLevel::Critical) {
        alerts.push(Alert {
            id: AlertId(entity.id.0.wrapping_mul(1000)),
            message: format!(
                "CRITICAL: {} threat level escalated — immediate attention required",
                entity.name
            ),
            severity: ThreatLevel::Critical,
            time: now,
            entity_id: entity.id,
        });
    }

    let high = entities.iter().filter(|e| e.threat == ThreatLevel::High);
    for entity in high.take(HIGH_TICKER_CANDIDATES) {
        if rng.next_f64() > 0.5 {
            let detail = render_template(catalog, entity.kind, &mut rng, &entity.name);
            alerts.push(Alert {
                id: AlertId(entity.id.0.wrapping_mul(1000) + 1),
                message: format!("HIGH: New intelligence on {} — {detail}", entity.name),
                severity: ThreatLevel::High,
                time: now,
                entity_id: entity.id,
            });
        }
    }

    let routine = rng.range(2, 3);
    for i in 0..routine {
        let Some(entity) = rng.pick(entities) else {
            break;
        };
        let source = entity
            .sources
            .first()
            .map_or(FALLBACK_SOURCE, |source| source.0.as_str());
        alerts.push(Alert {
            id: AlertId(MEDIUM_ALERT_BASE_ID + u64::from(i)),
            message: format!(
                "{source}: Update on {} — {} station reporting",
                entity.name, entity.city
            ),
            severity: ThreatLevel::Medium,
            time: now,
            entity_id: entity.id,
        });
    }

    alerts.truncate(catalog.constants.ticker_limit);
    alerts
}
