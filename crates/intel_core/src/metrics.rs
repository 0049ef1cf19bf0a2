//! Read-only projections and time-series metrics over a `SimulationState`.
//!
//! `compute_projections` feeds dashboards; `compute_metrics` samples one flat
//! row for CSV export. No state mutation here; only `MetricsFileWriter` does IO.

use std::io::Write;

use serde::Serialize;

use crate::investigation::{evidence_quality, max_investigation_level, threat_reduction};
use crate::relationships::{connection_health, find_key_nodes, network_fragmentation, ConnectionHealth};
use crate::sources::{source_stats, SourceStats};
use crate::{EntityId, ObjectiveCounts, SimulationState, SourceId, ThreatLevel};

/// Current schema version. Bump when columns are added, removed or reordered.
const METRICS_VERSION: u32 = 1;
const KEY_NODE_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThreatCounts {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthCounts {
    pub strong: u32,
    pub moderate: u32,
    pub weak: u32,
    pub disrupted: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestigationSummary {
    pub entity_id: EntityId,
    pub max_level: u8,
    pub evidence_quality: u32,
    pub threat_reduction: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projections {
    pub source_stats: SourceStats,
    pub threat_counts: ThreatCounts,
    pub connection_health: HealthCounts,
    pub fragmentation: u32,
    pub key_nodes: Vec<EntityId>,
    pub investigations: Vec<InvestigationSummary>,
    pub objectives: ObjectiveCounts,
}

fn threat_counts(state: &SimulationState) -> ThreatCounts {
    let mut counts = ThreatCounts::default();
    for entity in &state.entities {
        match entity.threat {
            ThreatLevel::Low => counts.low += 1,
            ThreatLevel::Medium => counts.medium += 1,
            ThreatLevel::High => counts.high += 1,
            ThreatLevel::Critical => counts.critical += 1,
        }
    }
    counts
}

fn health_counts(state: &SimulationState) -> HealthCounts {
    let mut counts = HealthCounts::default();
    for connection in &state.connections {
        match connection_health(connection) {
            ConnectionHealth::Strong => counts.strong += 1,
            ConnectionHealth::Moderate => counts.moderate += 1,
            ConnectionHealth::Weak => counts.weak += 1,
            ConnectionHealth::Disrupted => counts.disrupted += 1,
        }
    }
    counts
}

/// Dashboard aggregates. Source stats cover only the sources for which
/// `enabled` holds.
pub fn compute_projections(
    state: &SimulationState,
    enabled: impl Fn(&SourceId) -> bool,
) -> Projections {
    let investigations = state
        .entities
        .iter()
        .filter(|e| !e.branches.is_empty())
        .map(|e| InvestigationSummary {
            entity_id: e.id,
            max_level: max_investigation_level(&e.branches),
            evidence_quality: evidence_quality(&e.branches),
            threat_reduction: threat_reduction(&e.branches),
        })
        .collect();

    Projections {
        source_stats: source_stats(state.sources.iter().filter(|s| enabled(&s.id))),
        threat_counts: threat_counts(state),
        connection_health: health_counts(state),
        fragmentation: network_fragmentation(&state.connections),
        key_nodes: find_key_nodes(&state.entities, &state.connections, KEY_NODE_COUNT)
            .into_iter()
            .map(|e| e.id)
            .collect(),
        investigations,
        objectives: state.objective_counts(),
    }
}

// ---------------------------------------------------------------------------
// Metrics snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub elapsed_minutes: u64,
    pub metrics_version: u32,

    // Population
    pub entity_count: u32,
    pub threats: ThreatCounts,
    pub avg_risk: f32,

    // Network
    pub connection_count: u32,
    pub disrupted_links: u32,
    pub fragmentation_pct: u32,

    // Feed
    pub events_logged: u32,
    pub pending_alerts: u32,
    pub records_total: u64,
    pub events_per_sec: f64,

    // Player
    pub budget: u32,
    pub agents: u32,
    pub data_credits: u32,
    pub influence: u32,
    pub objectives: ObjectiveCounts,
    pub achievements_unlocked: u32,
    pub score: u32,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub fn compute_metrics(state: &SimulationState) -> MetricsSnapshot {
    let sim_now = state.sim_now();
    let total_risk: u64 = state.entities.iter().map(|e| u64::from(e.risk)).sum();
    #[allow(clippy::cast_possible_truncation)]
    let avg_risk = if state.entities.is_empty() {
        0.0
    } else {
        (total_risk as f64 / state.entities.len() as f64) as f32
    };

    MetricsSnapshot {
        elapsed_minutes: state.elapsed.minutes,
        metrics_version: METRICS_VERSION,
        entity_count: count(state.entities.len()),
        threats: threat_counts(state),
        avg_risk,
        connection_count: count(state.connections.len()),
        disrupted_links: count(state.connections.iter().filter(|c| c.is_disrupted()).count()),
        fragmentation_pct: network_fragmentation(&state.connections),
        events_logged: count(state.events.len()),
        pending_alerts: count(state.events.iter().filter(|e| e.is_pending(sim_now)).count()),
        records_total: state.sources.iter().map(|s| s.records).sum(),
        events_per_sec: source_stats(&state.sources).total_events_per_sec,
        budget: state.resources.budget,
        agents: state.resources.agents,
        data_credits: state.resources.data_credits,
        influence: state.resources.influence,
        objectives: state.objective_counts(),
        achievements_unlocked: count(state.achievements.iter().filter(|a| a.unlocked).count()),
        score: state.score,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "elapsed_minutes,metrics_version,\
         entity_count,low_count,medium_count,high_count,critical_count,avg_risk,\
         connection_count,disrupted_links,fragmentation_pct,\
         events_logged,pending_alerts,records_total,events_per_sec,\
         budget,agents,data_credits,influence,\
         objectives_total,objectives_completed,objectives_failed,\
         achievements_unlocked,score"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(writer: &mut impl Write, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{:.2},{},{},{},{},{},{},{:.2},{},{},{},{},{},{},{},{},{}",
        snapshot.elapsed_minutes,
        snapshot.metrics_version,
        snapshot.entity_count,
        snapshot.threats.low,
        snapshot.threats.medium,
        snapshot.threats.high,
        snapshot.threats.critical,
        snapshot.avg_risk,
        snapshot.connection_count,
        snapshot.disrupted_links,
        snapshot.fragmentation_pct,
        snapshot.events_logged,
        snapshot.pending_alerts,
        snapshot.records_total,
        snapshot.events_per_sec,
        snapshot.budget,
        snapshot.agents,
        snapshot.data_credits,
        snapshot.influence,
        snapshot.objectives.total,
        snapshot.objectives.completed,
        snapshot.objectives.failed,
        snapshot.achievements_unlocked,
        snapshot.score,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Streams snapshots to `metrics_000.csv`, `metrics_001.csv`, … in `run_dir`.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}
