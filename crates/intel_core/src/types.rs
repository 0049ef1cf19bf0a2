//! Type definitions for `intel_core`.
//!
//! All public snapshot types, enums, and ID newtypes used by the world
//! assembler, the player-command layer, and the session scheduler.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

macro_rules! numeric_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(SourceId);
string_id!(ObjectiveId);
string_id!(ChainId);
string_id!(AchievementId);

numeric_id!(EntityId);
numeric_id!(EventId);
numeric_id!(AlertId);

/// Source ids carried by a single entity (one to three in practice).
pub type SourceList = SmallVec<[SourceId; 3]>;

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Company,
    Organization,
    Location,
    Financial,
    Cyber,
    Comms,
}

impl EntityType {
    /// Key used for keyed template tables (`descriptions`, `event_templates`).
    pub fn key(self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Company => "company",
            EntityType::Organization => "organization",
            EntityType::Location => "location",
            EntityType::Financial => "financial",
            EntityType::Cyber => "cyber",
            EntityType::Comms => "comms",
        }
    }

    /// Name pool an entity of this type draws from. Organizations share the
    /// company pool.
    pub fn name_pool(self) -> &'static str {
        match self {
            EntityType::Organization => "company",
            other => other.key(),
        }
    }

    pub fn is_financial(self) -> bool {
        matches!(self, EntityType::Financial | EntityType::Company)
    }
}

/// Threat band derived from a 0–100 risk score. Also used as event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

pub type Severity = ThreatLevel;

impl ThreatLevel {
    /// Standard step function: ≥85 critical, ≥60 high, ≥35 medium, else low.
    pub fn from_risk(risk: u32) -> Self {
        match risk {
            85.. => ThreatLevel::Critical,
            60..=84 => ThreatLevel::High,
            35..=59 => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }

    /// Band after an ignored alert: ≥75 reads as critical, ≥50 as high.
    /// Never lower than the standard band.
    pub fn escalated(risk: u32) -> Self {
        let escalation = match risk {
            75.. => ThreatLevel::Critical,
            50..=74 => ThreatLevel::High,
            _ => ThreatLevel::Low,
        };
        escalation.max(ThreatLevel::from_risk(risk))
    }

    pub fn is_elevated(self) -> bool {
        self >= ThreatLevel::High
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Investigate,
    Monitor,
    Dismiss,
}

impl std::str::FromStr for ResponseKind {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "investigate" => Ok(ResponseKind::Investigate),
            "monitor" => Ok(ResponseKind::Monitor),
            "dismiss" => Ok(ResponseKind::Dismiss),
            other => Err(ParseError::UnknownResponse(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("time speed {0} is not one of 1, 2, 5, 10, 20, 50")]
    InvalidTimeSpeed(u32),
    #[error("unknown alert response `{0}`")]
    UnknownResponse(String),
    #[error("unknown investigation path `{0}`")]
    UnknownPath(String),
}

/// Simulation speed multiplier. Only a fixed set of values is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeSpeed(u32);

impl TimeSpeed {
    pub const ALLOWED: [u32; 6] = [1, 2, 5, 10, 20, 50];
    pub const REALTIME: TimeSpeed = TimeSpeed(1);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for TimeSpeed {
    fn default() -> Self {
        Self::REALTIME
    }
}

impl TryFrom<u32> for TimeSpeed {
    type Error = ParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&value) {
            Ok(TimeSpeed(value))
        } else {
            Err(ParseError::InvalidTimeSpeed(value))
        }
    }
}

impl From<TimeSpeed> for u32 {
    fn from(speed: TimeSpeed) -> Self {
        speed.0
    }
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCost {
    #[serde(default)]
    pub budget: u32,
    #[serde(default)]
    pub agents: u32,
    #[serde(default)]
    pub data_credits: u32,
}

impl ResourceCost {
    pub const FREE: ResourceCost = ResourceCost {
        budget: 0,
        agents: 0,
        data_credits: 0,
    };
}

fn default_max_data_credits() -> u32 {
    20
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResources {
    pub budget: u32,
    pub max_budget: u32,
    pub agents: u32,
    pub max_agents: u32,
    pub data_credits: u32,
    #[serde(default = "default_max_data_credits")]
    pub max_data_credits: u32,
    pub influence: u32,
}

impl PlayerResources {
    pub fn can_afford(&self, cost: &ResourceCost) -> bool {
        self.budget >= cost.budget
            && self.agents >= cost.agents
            && self.data_credits >= cost.data_credits
    }

    /// Deducts `cost` if affordable. Returns false and leaves the pool
    /// untouched otherwise.
    pub fn spend(&mut self, cost: &ResourceCost) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.budget -= cost.budget;
        self.agents -= cost.agents;
        self.data_credits -= cost.data_credits;
        true
    }

    pub fn add_budget(&mut self, amount: u32) {
        self.budget = self.budget.saturating_add(amount).min(self.max_budget);
    }

    pub fn add_agents(&mut self, amount: u32) {
        self.agents = self.agents.saturating_add(amount).min(self.max_agents);
    }

    pub fn add_data_credits(&mut self, amount: u32) {
        self.data_credits = self
            .data_credits
            .saturating_add(amount)
            .min(self.max_data_credits);
    }

    /// Clamp every capped pool to its maximum.
    pub fn clamp(&mut self) {
        self.budget = self.budget.min(self.max_budget);
        self.agents = self.agents.min(self.max_agents);
        self.data_credits = self.data_credits.min(self.max_data_credits);
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerFlags {
    #[serde(default)]
    pub priority: bool,
    #[serde(default)]
    pub watchlist: bool,
    #[serde(default)]
    pub investigated: bool,
    #[serde(default)]
    pub resolved: bool,
}

impl PlayerFlags {
    pub fn any(&self) -> bool {
        self.priority || self.watchlist || self.investigated || self.resolved
    }

    pub fn handled(&self) -> bool {
        self.investigated || self.resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub threat: ThreatLevel,
    pub risk: u32,
    pub x: u32,
    pub y: u32,
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub desc: String,
    pub sources: SourceList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_at: Option<u64>,
    #[serde(default)]
    pub investigation_level: u8,
    #[serde(default)]
    pub flags: PlayerFlags,
    /// Net risk change applied by player-driven consequences. Re-applied on
    /// top of the regenerated risk so drift never erases it.
    #[serde(default)]
    pub risk_adjustment: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<InvestigationBranch>,
}

impl Entity {
    /// Set risk to `risk` (clamped to 0–100), keep `risk_adjustment` in sync and
    /// recompute the standard threat band.
    pub fn shift_risk(&mut self, risk: i64) {
        let clamped = clamp_risk(risk);
        self.risk_adjustment += i32::try_from(i64::from(clamped) - i64::from(self.risk))
            .unwrap_or_default();
        self.risk = clamped;
        self.threat = ThreatLevel::from_risk(clamped);
    }

    pub fn branch(&self, path: InvestigationPath) -> Option<&InvestigationBranch> {
        self.branches.iter().find(|branch| branch.path == path)
    }

    pub fn max_branch_level(&self) -> u8 {
        self.branches.iter().map(|b| b.level).max().unwrap_or(0)
    }
}

pub fn clamp_risk(risk: i64) -> u32 {
    u32::try_from(risk.clamp(0, 100)).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Investigation branches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationPath {
    Financial,
    Cyber,
    Humint,
}

impl InvestigationPath {
    pub const ALL: [InvestigationPath; 3] = [
        InvestigationPath::Financial,
        InvestigationPath::Cyber,
        InvestigationPath::Humint,
    ];

    pub fn key(self) -> &'static str {
        match self {
            InvestigationPath::Financial => "financial",
            InvestigationPath::Cyber => "cyber",
            InvestigationPath::Humint => "humint",
        }
    }
}

impl std::str::FromStr for InvestigationPath {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        InvestigationPath::ALL
            .into_iter()
            .find(|path| path.key() == value)
            .ok_or_else(|| ParseError::UnknownPath(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub quality: EvidenceQuality,
    pub impact: u32,
    pub discovered_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationBranch {
    pub path: InvestigationPath,
    pub level: u8,
    pub unlocked: bool,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Behavioural class of a relationship; drives how fast strength moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionClass {
    Family,
    Business,
    Organizational,
    Personal,
    Financial,
    Digital,
    Criminal,
}

impl ConnectionClass {
    pub fn volatility(self) -> f64 {
        match self {
            ConnectionClass::Family => 0.2,
            ConnectionClass::Business => 0.4,
            ConnectionClass::Organizational => 0.5,
            ConnectionClass::Personal => 0.8,
            ConnectionClass::Financial => 1.2,
            ConnectionClass::Digital => 1.5,
            ConnectionClass::Criminal => 1.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionMeta {
    pub class: ConnectionClass,
    pub base_strength: f64,
    /// 0–100.
    pub activity: f64,
    pub last_activity_ms: i64,
    pub disrupted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disrupted_at: Option<i64>,
    pub can_reform: bool,
    /// 0–100; a disrupted link re-forms when this reaches 100.
    pub reform_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Lower entity id of the pair.
    pub from: EntityId,
    /// Higher entity id of the pair.
    pub to: EntityId,
    #[serde(rename = "type")]
    pub kind: String,
    pub strength: f64,
    pub evidence: u32,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ConnectionMeta>,
}

impl Connection {
    pub fn key(&self) -> (EntityId, EntityId) {
        pair_key(self.from, self.to)
    }

    pub fn touches(&self, id: EntityId) -> bool {
        self.from == id || self.to == id
    }

    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.from == id {
            Some(self.to)
        } else if self.to == id {
            Some(self.from)
        } else {
            None
        }
    }

    pub fn is_disrupted(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.disrupted)
    }
}

/// Unordered pair normalised to `(low, high)`.
pub fn pair_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ---------------------------------------------------------------------------
// Events, alerts and sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOption {
    pub id: ResponseKind,
    pub label: String,
    #[serde(default)]
    pub cost: ResourceCost,
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: EventId,
    pub time: DateTime<Utc>,
    pub label: String,
    pub entity: EntityId,
    pub severity: Severity,
    pub source: SourceId,
    #[serde(default)]
    pub requires_response: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_options: Vec<ResponseOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_deadline: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_response: Option<ResponseKind>,
}

impl TimelineEvent {
    pub fn option(&self, kind: ResponseKind) -> Option<&ResponseOption> {
        self.response_options.iter().find(|option| option.id == kind)
    }

    /// Interactive, unanswered and still inside its response window.
    pub fn is_pending(&self, sim_now: DateTime<Utc>) -> bool {
        self.requires_response
            && self.player_response.is_none()
            && self.response_deadline.is_some_and(|deadline| deadline > sim_now)
    }
}

/// Ticker line shown in the alert feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    pub severity: Severity,
    pub time: DateTime<Utc>,
    pub entity_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: SourceId,
    pub name: String,
    pub kind: String,
    pub records: u64,
    /// Records per second.
    pub rate: f64,
    pub status: SourceStatus,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPhase {
    pub name: String,
    pub description: String,
    pub day: u64,
    pub alert_level: String,
}

// ---------------------------------------------------------------------------
// Objectives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Prevent,
    Investigate,
    Resolve,
    Maintain,
    Discover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Active,
    Completed,
    Failed,
}

impl ObjectiveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ObjectiveStatus::Active)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Simulated minutes after issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveReward {
    #[serde(default)]
    pub influence: u32,
    #[serde(default)]
    pub budget: u32,
}

/// How an objective measures progress. Attached when the objective is built,
/// so evaluation never dispatches on the id string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ObjectiveRule {
    /// Every critical entity investigated or resolved.
    HandleAllCritical,
    /// `count` entities at `threat` flagged resolved.
    ResolveAtThreat { threat: ThreatLevel, count: u32 },
    /// Budget held at or above `floor` until the time limit.
    HoldBudget { floor: u32 },
    /// `count` entities at investigation level 3.
    DeepInvestigations { count: u32 },
    /// Every critical/high entity in `city` investigated or resolved.
    SecureCity { city: String },
    /// A single entity investigated or resolved.
    HandleEntity { entity_id: EntityId },
    /// Every entity of `kind` investigated or resolved.
    HandleAllOfType { kind: EntityType },
    /// `count` priority-flagged entities.
    FlagPriority { count: u32 },
    /// `count` priority entities at investigation level ≥ `level`.
    PriorityAtLevel { level: u8, count: u32 },
    /// `count` priority entities resolved.
    ResolvePriority { count: u32 },
    /// `count` financial or company entities investigated.
    InvestigateFinancial { count: u32 },
    /// `count` entities with a financial branch opened.
    FinancialBranches { count: u32 },
    /// `count` objectives completed with none failed.
    FlawlessCompletions { count: u32 },
    /// `count` objectives completed within the time limit.
    RapidCompletions { count: u32 },
    /// `count` entities with any branch at level 3.
    MaxedBranches { count: u32 },
    /// `count` disrupted connections.
    DisruptedLinks { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameObjective {
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub kind: ObjectiveType,
    pub title: String,
    pub description: String,
    pub target: ObjectiveTarget,
    /// 0–100.
    pub progress: u32,
    pub status: ObjectiveStatus,
    #[serde(default)]
    pub reward: ObjectiveReward,
    pub rule: ObjectiveRule,
    /// Simulated minute the objective was issued; time limits count from here.
    #[serde(default)]
    pub issued_minute: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum ChainUnlock {
    Always,
    AfterStep { chain: ChainId, step: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveChain {
    pub id: ChainId,
    pub name: String,
    pub description: String,
    pub steps: Vec<GameObjective>,
    /// Index of the live step; equals `steps.len()` once the chain is done.
    pub current_step: usize,
    pub unlocked: bool,
    pub unlock: ChainUnlock,
}

impl ObjectiveChain {
    pub fn is_complete(&self) -> bool {
        self.current_step >= self.steps.len()
    }

    pub fn current(&self) -> Option<&GameObjective> {
        self.steps.get(self.current_step)
    }
}

/// Data-only discovery predicate for hidden objectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum DiscoveryCondition {
    CompletedWithoutFailure { min_completed: u32 },
    EarlyCompletion { within_minutes: u64, min_completed: u32 },
    MaxedBranches { min_entities: u32 },
    DisruptedLinks { min_links: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenObjective {
    pub objective: GameObjective,
    pub discovered: bool,
    pub condition: DiscoveryCondition,
}

// ---------------------------------------------------------------------------
// Achievements and consequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Investigation,
    Strategy,
    Speed,
    Mastery,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub title: String,
    pub description: String,
    pub category: AchievementCategory,
    pub tier: AchievementTier,
    pub points: u32,
    pub unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_progress: Option<u32>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsequenceKind {
    Investigation,
    AlertResponse,
    Objective,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsequenceLog {
    pub id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: ConsequenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Simulated time since the operation epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elapsed {
    pub millis: i64,
    pub minutes: u64,
    pub hours: u64,
    pub days: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub elapsed: Elapsed,
    pub time_speed: TimeSpeed,
    pub entities: Vec<Entity>,
    pub connections: Vec<Connection>,
    pub events: Vec<TimelineEvent>,
    pub alerts: Vec<Alert>,
    pub sources: Vec<DataSource>,
    pub phase: OperationPhase,
    pub resources: PlayerResources,
    pub objectives: Vec<GameObjective>,
    pub objective_chains: Vec<ObjectiveChain>,
    pub hidden_objectives: Vec<HiddenObjective>,
    pub achievements: Vec<Achievement>,
    pub consequence_logs: Vec<ConsequenceLog>,
    pub score: u32,
}

impl SimulationState {
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn entity_index(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id == id)
    }

    pub fn event(&self, id: EventId) -> Option<&TimelineEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Current simulated wall time.
    pub fn sim_now(&self) -> DateTime<Utc> {
        crate::clock::sim_time(self.elapsed.millis)
    }

    pub fn objective_counts(&self) -> ObjectiveCounts {
        let mut counts = ObjectiveCounts::default();
        let all = self
            .objectives
            .iter()
            .chain(self.objective_chains.iter().flat_map(|chain| chain.steps.iter()))
            .chain(
                self.hidden_objectives
                    .iter()
                    .filter(|hidden| hidden.discovered)
                    .map(|hidden| &hidden.objective),
            );
        for objective in all {
            counts.total += 1;
            match objective.status {
                ObjectiveStatus::Completed => counts.completed += 1,
                ObjectiveStatus::Failed => counts.failed += 1,
                ObjectiveStatus::Active => {}
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveCounts {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
}

/// Per-id lookup of objective statuses across standalone, chain and hidden
/// objectives.
pub type ObjectiveStates = BTreeMap<ObjectiveId, ObjectiveStatus>;
