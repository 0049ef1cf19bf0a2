//! Multi-path investigations: branch levels, evidence and insights.

use crate::{
    Connection, Entity, EntityId, Evidence, EvidenceQuality, InvestigationBranch,
    InvestigationPath,
};

pub const MAX_BRANCH_LEVEL: u8 = 3;
const MAX_THREAT_REDUCTION: u32 = 40;

struct EvidenceTemplate {
    kind: &'static str,
    title: &'static str,
    description: &'static str,
}

const fn template(
    kind: &'static str,
    title: &'static str,
    description: &'static str,
) -> EvidenceTemplate {
    EvidenceTemplate {
        kind,
        title,
        description,
    }
}

const FINANCIAL_EVIDENCE: [EvidenceTemplate; 4] = [
    template("transaction", "Wire Transfer Records", "Suspicious wire transfers from {name} to offshore accounts"),
    template("document", "Bank Statements", "Financial records showing unusual activity patterns for {name}"),
    template("transaction", "Cryptocurrency Movements", "Digital currency transactions linked to {name}"),
    template("document", "Asset Registry", "Hidden assets and properties registered under {name}"),
];

const CYBER_EVIDENCE: [EvidenceTemplate; 4] = [
    template("communication", "Encrypted Messages", "Intercepted encrypted communications involving {name}"),
    template("document", "Server Logs", "Digital footprint and access patterns for {name}"),
    template("communication", "Email Metadata", "Communication network analysis for {name}"),
    template("document", "Dark Web Activity", "Underground forum posts and transactions linked to {name}"),
];

const HUMINT_EVIDENCE: [EvidenceTemplate; 4] = [
    template("witness", "Witness Statement", "Confidential source reports on activities of {name}"),
    template("recording", "Surveillance Footage", "Visual confirmation of {name} at key locations"),
    template("witness", "Informant Report", "Inside information about {name} from trusted source"),
    template("recording", "Audio Recording", "Recorded conversations mentioning {name}"),
];

fn evidence_templates(path: InvestigationPath) -> &'static [EvidenceTemplate] {
    match path {
        InvestigationPath::Financial => &FINANCIAL_EVIDENCE,
        InvestigationPath::Cyber => &CYBER_EVIDENCE,
        InvestigationPath::Humint => &HUMINT_EVIDENCE,
    }
}

pub fn initial_branches() -> Vec<InvestigationBranch> {
    InvestigationPath::ALL
        .into_iter()
        .map(|path| InvestigationBranch {
            path,
            level: 0,
            unlocked: false,
            evidence: Vec::new(),
            insights: Vec::new(),
        })
        .collect()
}

/// One evidence item. Quality improves with `level`; the template, quality
/// roll and impact all derive from `seed`.
pub fn generate_evidence(
    entity: &Entity,
    path: InvestigationPath,
    level: u8,
    seed: u64,
    now_ms: i64,
) -> Evidence {
    let templates = evidence_templates(path);
    let template = &templates[usize::try_from(seed % 4).unwrap_or_default()];

    let roll = seed.wrapping_mul(7919) % 100;
    let quality = match level {
        3 if roll < 70 => EvidenceQuality::High,
        3 => EvidenceQuality::Medium,
        2 if roll < 50 => EvidenceQuality::Medium,
        _ if level != 2 && roll < 30 => EvidenceQuality::Medium,
        _ => EvidenceQuality::Low,
    };
    let impact = match quality {
        EvidenceQuality::High => 80 + seed % 20,
        EvidenceQuality::Medium => 50 + seed % 30,
        EvidenceQuality::Low => 20 + seed % 30,
    };

    Evidence {
        id: format!("{}-{}-{level}-{seed}", entity.id, path.key()),
        kind: template.kind.to_string(),
        title: template.title.to_string(),
        description: template.description.replace("{name}", &entity.name),
        quality,
        impact: u32::try_from(impact).unwrap_or_default(),
        discovered_at: now_ms,
    }
}

/// All insights unlocked at `level`, one per level reached.
pub fn generate_insights(
    entity: &Entity,
    path: InvestigationPath,
    level: u8,
    evidence: &[Evidence],
) -> Vec<String> {
    let name = &entity.name;
    let mut insights = Vec::with_capacity(usize::from(level));

    if level >= 1 {
        insights.push(match path {
            InvestigationPath::Financial => format!(
                "Initial financial analysis reveals {name} has significant undisclosed assets"
            ),
            InvestigationPath::Cyber => format!(
                "Digital trace analysis shows {name} uses advanced encryption and anonymization"
            ),
            InvestigationPath::Humint => format!(
                "Field reports indicate {name} maintains multiple residences and aliases"
            ),
        });
    }
    if level >= 2 {
        let confirmed = evidence
            .iter()
            .filter(|e| e.quality == EvidenceQuality::High)
            .count();
        insights.push(match path {
            InvestigationPath::Financial => format!(
                "Money trail leads to offshore shell companies - {confirmed} confirmed transactions"
            ),
            InvestigationPath::Cyber => format!(
                "Network analysis reveals {name} communicates with {} other entities in the network",
                confirmed + 3
            ),
            InvestigationPath::Humint => format!(
                "Behavioral analysis suggests {name} follows predictable patterns - {confirmed} confirmed sightings"
            ),
        });
    }
    if level >= 3 {
        let quality = mean_impact(evidence.iter());
        insights.push(match path {
            InvestigationPath::Financial => format!(
                "Complete financial profile reconstructed - evidence quality {quality}%. Key vulnerabilities identified in asset structure"
            ),
            InvestigationPath::Cyber => format!(
                "Full digital footprint mapped - evidence quality {quality}%. Critical communication nodes identified for disruption"
            ),
            InvestigationPath::Humint => format!(
                "Comprehensive behavioral profile complete - evidence quality {quality}%. Predictive movement patterns established"
            ),
        });
    }
    insights
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathAdvance {
    pub path: InvestigationPath,
    pub level: u8,
    pub new_evidence: Vec<Evidence>,
    pub new_insights: Vec<String>,
    /// Level 2 and above can expose hidden links.
    pub unlocks_connections: bool,
}

/// Advance `path` on `entity` by one level, generating `level` new evidence
/// items seeded by entity, path, level and simulated minute. Returns `None`
/// and changes nothing when the branch is already at the top level.
pub fn investigate_path(
    entity: &mut Entity,
    path: InvestigationPath,
    minute: u64,
    now_ms: i64,
) -> Option<PathAdvance> {
    if entity.branches.is_empty() {
        entity.branches = initial_branches();
    }
    let snapshot = entity.clone();
    let branch = entity.branches.iter_mut().find(|b| b.path == path)?;
    if branch.level >= MAX_BRANCH_LEVEL {
        return None;
    }

    let previous = branch.level;
    let level = previous + 1;
    branch.unlocked = true;
    branch.level = level;

    let path_index: u64 = match path {
        InvestigationPath::Financial => 0,
        InvestigationPath::Cyber => 1,
        InvestigationPath::Humint => 2,
    };
    let seed = snapshot
        .id
        .0
        .wrapping_mul(1000)
        .wrapping_add(minute.wrapping_mul(10))
        .wrapping_add(path_index * 3 + u64::from(level));

    let new_evidence: Vec<Evidence> = (0..u64::from(level))
        .map(|i| generate_evidence(&snapshot, path, level, seed.wrapping_add(i), now_ms))
        .collect();
    branch.evidence.extend(new_evidence.iter().cloned());

    let insights = generate_insights(&snapshot, path, level, &branch.evidence);
    let new_insights = insights[usize::from(previous).min(insights.len())..].to_vec();
    branch.insights = insights;

    Some(PathAdvance {
        path,
        level,
        new_evidence,
        new_insights,
        unlocks_connections: level >= 2,
    })
}

fn mean_impact<'a>(evidence: impl Iterator<Item = &'a Evidence>) -> u32 {
    let (total, count) = evidence.fold((0u64, 0u64), |(total, count), e| {
        (total + u64::from(e.impact), count + 1)
    });
    if count == 0 {
        0
    } else {
        u32::try_from(total / count).unwrap_or_default()
    }
}

/// Mean impact across every branch's evidence; 0 with no evidence.
pub fn evidence_quality(branches: &[InvestigationBranch]) -> u32 {
    mean_impact(branches.iter().flat_map(|b| b.evidence.iter()))
}

pub fn max_investigation_level(branches: &[InvestigationBranch]) -> u8 {
    branches.iter().map(|b| b.level).max().unwrap_or(0)
}

pub fn threat_reduction(branches: &[InvestigationBranch]) -> u32 {
    let quality = evidence_quality(branches);
    let bonus = if quality >= 80 {
        10
    } else if quality >= 60 {
        5
    } else {
        0
    };
    (u32::from(max_investigation_level(branches)) * 10 + bonus).min(MAX_THREAT_REDUCTION)
}

/// Neighbours whose link type matches a branch at level 2 or above:
/// financial/transaction links for the financial path, cyber/communication
/// for cyber, personal/associate for humint.
pub fn revealed_neighbours(entity: &Entity, connections: &[Connection]) -> Vec<EntityId> {
    if max_investigation_level(&entity.branches) < 2 {
        return Vec::new();
    }
    let deep = |path| entity.branch(path).is_some_and(|b| b.level >= 2);
    let rules: [(InvestigationPath, [&str; 2]); 3] = [
        (InvestigationPath::Financial, ["financial", "transaction"]),
        (InvestigationPath::Cyber, ["cyber", "communication"]),
        (InvestigationPath::Humint, ["personal", "associate"]),
    ];

    let mut revealed: Vec<EntityId> = Vec::new();
    for connection in connections {
        let Some(other) = connection.other(entity.id) else {
            continue;
        };
        let kind = connection.kind.to_lowercase();
        let matched = rules
            .iter()
            .any(|(path, words)| deep(*path) && words.iter().any(|w| kind.contains(w)));
        if matched && !revealed.contains(&other) {
            revealed.push(other);
        }
    }
    revealed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::entity_at;

    #[test]
    fn branches_start_locked_at_zero() {
        let branches = initial_branches();
        assert_eq!(branches.len(), 3);
        assert!(branches.iter().all(|b| b.level == 0 && !b.unlocked));
    }

    #[test]
    fn evidence_quality_tracks_level() {
        let entity = entity_at(7, 60);
        // roll = seed * 7919 % 100
        let seed = 10; // roll 90
        assert_eq!(
            generate_evidence(&entity, InvestigationPath::Cyber, 3, seed, 0).quality,
            EvidenceQuality::Medium
        );
        let seed = 1; // roll 19
        assert_eq!(
            generate_evidence(&entity, InvestigationPath::Cyber, 3, seed, 0).quality,
            EvidenceQuality::High
        );
        assert_eq!(
            generate_evidence(&entity, InvestigationPath::Cyber, 2, seed, 0).quality,
            EvidenceQuality::Medium
        );
        assert_eq!(
            generate_evidence(&entity, InvestigationPath::Cyber, 1, seed, 0).quality,
            EvidenceQuality::Medium
        );
        let seed = 4; // roll 76
        assert_eq!(
            generate_evidence(&entity, InvestigationPath::Cyber, 1, seed, 0).quality,
            EvidenceQuality::Low
        );
    }

    #[test]
    fn evidence_text_names_the_entity() {
        let entity = entity_at(7, 60);
        let evidence = generate_evidence(&entity, InvestigationPath::Financial, 1, 8, 42);
        assert_eq!(evidence.title, "Wire Transfer Records");
        assert!(evidence.description.contains(&entity.name));
        assert_eq!(evidence.id, "7-financial-1-8");
        assert_eq!(evidence.discovered_at, 42);
    }

    #[test]
    fn impact_stays_in_quality_band() {
        let entity = entity_at(7, 60);
        for seed in 0..200 {
            for level in 1..=3 {
                let e = generate_evidence(&entity, InvestigationPath::Humint, level, seed, 0);
                let band = match e.quality {
                    EvidenceQuality::High => 80..=99,
                    EvidenceQuality::Medium => 50..=79,
                    EvidenceQuality::Low => 20..=49,
                };
                assert!(band.contains(&e.impact));
            }
        }
    }

    #[test]
    fn advancing_accumulates_evidence_and_insights() {
        let mut entity = entity_at(3, 70);
        let first = investigate_path(&mut entity, InvestigationPath::Financial, 10, 0).unwrap();
        assert_eq!(first.level, 1);
        assert_eq!(first.new_evidence.len(), 1);
        assert_eq!(first.new_insights.len(), 1);
        assert!(!first.unlocks_connections);

        let second = investigate_path(&mut entity, InvestigationPath::Financial, 11, 0).unwrap();
        assert_eq!(second.new_evidence.len(), 2);
        assert_eq!(second.new_insights.len(), 1);
        assert!(second.unlocks_connections);

        investigate_path(&mut entity, InvestigationPath::Financial, 12, 0).unwrap();
        let branch = entity.branch(InvestigationPath::Financial).unwrap();
        assert_eq!(branch.level, 3);
        assert_eq!(branch.evidence.len(), 6);
        assert_eq!(branch.insights.len(), 3);
        assert!(branch.unlocked);
        assert!(!entity.branch(InvestigationPath::Cyber).unwrap().unlocked);
    }

    #[test]
    fn maxed_branch_is_left_untouched() {
        let mut entity = entity_at(3, 70);
        for minute in 0..3 {
            investigate_path(&mut entity, InvestigationPath::Humint, minute, 0).unwrap();
        }
        let before = entity.clone();
        assert!(investigate_path(&mut entity, InvestigationPath::Humint, 9, 0).is_none());
        assert_eq!(entity, before);
    }

    #[test]
    fn same_inputs_same_evidence() {
        let mut a = entity_at(3, 70);
        let mut b = entity_at(3, 70);
        let ra = investigate_path(&mut a, InvestigationPath::Cyber, 77, 0).unwrap();
        let rb = investigate_path(&mut b, InvestigationPath::Cyber, 77, 0).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn threat_reduction_is_capped() {
        assert_eq!(threat_reduction(&[]), 0);
        let mut entity = entity_at(3, 70);
        for minute in 0..3 {
            investigate_path(&mut entity, InvestigationPath::Financial, minute, 0);
        }
        let reduction = threat_reduction(&entity.branches);
        assert!((30..=40).contains(&reduction));
        let quality = evidence_quality(&entity.branches);
        assert!((20..=99).contains(&quality));
    }

    #[test]
    fn deep_branch_reveals_matching_links() {
        let mut entity = entity_at(1, 70);
        let links: Vec<Connection> = [(2, "Financial Transfer"), (3, "Meeting"), (4, "Communication")]
            .into_iter()
            .map(|(to, kind)| Connection {
                from: EntityId(1),
                to: EntityId(to),
                kind: kind.to_string(),
                strength: 0.5,
                evidence: 1,
                revealed: false,
                meta: None,
            })
            .collect();
        assert!(revealed_neighbours(&entity, &links).is_empty());
        investigate_path(&mut entity, InvestigationPath::Financial, 0, 0);
        investigate_path(&mut entity, InvestigationPath::Financial, 1, 0);
        assert_eq!(revealed_neighbours(&entity, &links), vec![EntityId(2)]);
    }
}
