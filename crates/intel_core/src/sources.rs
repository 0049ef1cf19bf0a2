//! Collection-source throughput and reliability.

use serde::{Deserialize, Serialize};

use crate::rng::{wrap_seed, Mulberry32};
use crate::{floor_to_u64, Catalog, DataSource, SourceStatus};

const DEGRADED_CHANCE: f64 = 0.05;

/// Source states for `elapsed_minutes`, seeded by the minute.
pub fn generate_data_sources(catalog: &Catalog, elapsed_minutes: u64) -> Vec<DataSource> {
    let mut rng = Mulberry32::new(wrap_seed(elapsed_minutes));

    catalog
        .sources
        .iter()
        .map(|def| {
            let variance = rng.next_f64() * 0.4 + 0.8;
            let rate = round2(def.base_rate * variance);
            let records = floor_to_u64(elapsed_minutes as f64 * rate * 60.0)
                + u64::from(rng.range(0, 1000));
            let status = if rng.next_f64() < DEGRADED_CHANCE {
                SourceStatus::Degraded
            } else {
                SourceStatus::Active
            };
            let confidence = match status {
                SourceStatus::Active => 0.85 + rng.next_f64() * 0.15,
                _ => 0.5 + rng.next_f64() * 0.2,
            };
            DataSource {
                id: def.id.clone(),
                name: def.name.clone(),
                kind: def.kind.clone(),
                records,
                rate,
                status,
                confidence,
            }
        })
        .collect()
}

/// Accrue `floor(rate × delta_seconds)` records on every source.
pub fn update_source_counters(sources: &mut [DataSource], delta_seconds: f64) {
    for source in sources {
        source.records += floor_to_u64(source.rate * delta_seconds);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub total_events_per_sec: f64,
    pub average_confidence: f64,
    pub active_sources: u32,
}

/// Aggregate throughput and confidence, both rounded to two decimals.
pub fn source_stats<'a>(sources: impl IntoIterator<Item = &'a DataSource>) -> SourceStats {
    let mut total_rate = 0.0;
    let mut total_confidence = 0.0;
    let mut count = 0_u32;
    let mut active = 0_u32;
    for source in sources {
        total_rate += source.rate;
        total_confidence += source.confidence;
        count += 1;
        if source.status == SourceStatus::Active {
            active += 1;
        }
    }
    let average = if count > 0 {
        total_confidence / f64::from(count)
    } else {
        0.0
    };
    SourceStats {
        total_events_per_sec: round2(total_rate),
        average_confidence: round2(average),
        active_sources: active,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
