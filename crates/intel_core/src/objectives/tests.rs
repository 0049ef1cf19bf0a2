use super::*;
use crate::test_fixtures::{base_resources, entity_at};
use crate::{
    ConnectionClass, ConnectionMeta, DiscoveryCondition, EntityId, InvestigationBranch,
    InvestigationPath,
};

fn ctx<'a>(
    entities: &'a [Entity],
    connections: &'a [Connection],
    resources: &'a PlayerResources,
) -> ObjectiveContext<'a> {
    ObjectiveContext {
        entities,
        connections,
        resources,
        counts: ObjectiveCounts::default(),
        elapsed_minutes: 100,
        session_minutes: 5,
    }
}

fn by_id<'a>(objectives: &'a [GameObjective], id: &str) -> Option<&'a GameObjective> {
    objectives.iter().find(|o| o.id.0 == id)
}

#[test]
fn starter_set_depends_on_threat_mix() {
    let calm = vec![entity_at(1, 40), entity_at(2, 30)];
    let ids: Vec<String> = generate_objectives(&calm, 0)
        .into_iter()
        .map(|o| o.id.0)
        .collect();
    assert_eq!(ids, ["obj_maintain_budget", "obj_investigate_deep"]);

    let hot = vec![
        entity_at(1, 90),
        entity_at(2, 70),
        entity_at(3, 65),
        entity_at(4, 61),
    ];
    let objectives = generate_objectives(&hot, 0);
    let prevent = by_id(&objectives, "obj_prevent_critical").unwrap();
    assert_eq!(prevent.target.count, Some(1));
    assert_eq!(prevent.target.time_limit, Some(60));
    assert!(by_id(&objectives, "obj_resolve_high").is_some());
    assert_eq!(by_id(&objectives, "obj_maintain_budget").unwrap().progress, 100);
}

#[test]
fn prevent_completes_when_every_critical_is_handled() {
    let mut entities = vec![entity_at(1, 90), entity_at(2, 88), entity_at(3, 20)];
    let resources = base_resources();
    let mut objective = generate_objectives(&entities, 100).remove(0);
    assert_eq!(objective.id.0, "obj_prevent_critical");

    entities[0].flags.investigated = true;
    assert_eq!(
        update_objective(&mut objective, &ctx(&entities, &[], &resources), 1),
        None
    );
    assert_eq!(objective.progress, 50);

    entities[1].flags.resolved = true;
    assert_eq!(
        update_objective(&mut objective, &ctx(&entities, &[], &resources), 2),
        Some(ObjectiveStatus::Completed)
    );
    assert_eq!(objective.progress, 100);
    assert_eq!(objective.resolved_at_ms, Some(2));
}

#[test]
fn terminal_objectives_never_change() {
    let entities = vec![entity_at(1, 90)];
    let resources = base_resources();
    let mut objective = generate_objectives(&entities, 0).remove(0);
    objective.status = ObjectiveStatus::Failed;
    objective.progress = 12;

    let mut handled = entities.clone();
    handled[0].flags.resolved = true;
    assert_eq!(
        update_objective(&mut objective, &ctx(&handled, &[], &resources), 9),
        None
    );
    assert_eq!(objective.status, ObjectiveStatus::Failed);
    assert_eq!(objective.progress, 12);
}

#[test]
fn deadline_counts_from_issue_minute() {
    let entities = vec![entity_at(1, 90)];
    let resources = base_resources();
    let mut objective = generate_objectives(&entities, 50).remove(0);

    let mut context = ctx(&entities, &[], &resources);
    context.elapsed_minutes = 109;
    assert_eq!(update_objective(&mut objective, &context, 0), None);
    context.elapsed_minutes = 110;
    assert_eq!(
        update_objective(&mut objective, &context, 0),
        Some(ObjectiveStatus::Failed)
    );
}

#[test]
fn budget_hold_fails_on_violation_and_completes_at_deadline() {
    let entities = vec![entity_at(1, 40)];
    let objectives = generate_objectives(&entities, 0);
    let template = by_id(&objectives, "obj_maintain_budget").unwrap().clone();

    let mut resources = base_resources();
    let mut held = template.clone();
    let mut context = ctx(&entities, &[], &resources);
    context.elapsed_minutes = 10;
    assert_eq!(update_objective(&mut held, &context, 0), None);
    context.elapsed_minutes = 30;
    assert_eq!(
        update_objective(&mut held, &context, 0),
        Some(ObjectiveStatus::Completed)
    );

    resources.budget = 2500;
    let mut broken = template;
    let mut context = ctx(&entities, &[], &resources);
    context.elapsed_minutes = 1;
    assert_eq!(
        update_objective(&mut broken, &context, 0),
        Some(ObjectiveStatus::Failed)
    );
    assert_eq!(broken.progress, 50);
}

#[test]
fn rewards_are_capped_at_max_budget() {
    let mut resources = base_resources();
    resources.budget = 9_500;
    apply_reward(
        &mut resources,
        &ObjectiveReward {
            influence: 100,
            budget: 2000,
        },
    );
    assert_eq!(resources.budget, 10_000);
    assert_eq!(resources.influence, 150);
}

#[test]
fn failed_prevent_raises_elevated_entities() {
    let mut entities = vec![entity_at(1, 90), entity_at(2, 70), entity_at(3, 20)];
    let mut objective = generate_objectives(&entities, 0).remove(0);
    objective.status = ObjectiveStatus::Failed;
    let log = apply_failure_consequences(&objective, &mut entities, 77);
    assert_eq!(entities[0].risk, 100);
    assert_eq!(entities[1].risk, 85);
    assert_eq!(entities[1].threat, ThreatLevel::Critical);
    assert_eq!(entities[2].risk, 20);
    assert_eq!(log.kind, ConsequenceKind::Objective);
    assert_eq!(log.effects.len(), 2);
    assert_eq!(entities[1].risk_adjustment, 15);
}

#[test]
fn procedural_objectives_are_seeded_and_bounded() {
    let entities: Vec<Entity> = (1..=12)
        .map(|id| entity_at(id, if id % 2 == 0 { 70 } else { 40 }))
        .collect();
    for minute in 0..50 {
        let first = generate_procedural_objectives(&entities, minute);
        let second = generate_procedural_objectives(&entities, minute);
        assert_eq!(first, second);
        assert!(first.len() <= 3);
        assert!(first.iter().all(|o| o.id.0.starts_with("obj_proc_")));
    }
}

#[test]
fn chains_advance_one_step_at_a_time() {
    let mut chains = create_objective_chains(0);
    let mut entities: Vec<Entity> = (1..=4).map(|id| entity_at(id, 50)).collect();
    let resources = base_resources();

    for entity in entities.iter_mut().take(3) {
        entity.flags.priority = true;
    }
    let transitions = update_chains(&mut chains, &ctx(&entities, &[], &resources), 10);
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].0.id.0, "chain_takedown_1");
    assert_eq!(chains[0].current_step, 1);
    assert!(!chains[1].unlocked);

    // Next pass unlocks the money trail; step two is not yet satisfied.
    let transitions = update_chains(&mut chains, &ctx(&entities, &[], &resources), 11);
    assert!(transitions.is_empty());
    assert!(chains[1].unlocked);
    assert_eq!(chains[0].steps[1].progress, 0);

    for entity in entities.iter_mut().take(3) {
        entity.investigation_level = 2;
        entity.flags.resolved = true;
    }
    update_chains(&mut chains, &ctx(&entities, &[], &resources), 12);
    update_chains(&mut chains, &ctx(&entities, &[], &resources), 13);
    assert!(chains[0].is_complete());
    assert!(chains[0].current().is_none());
}

#[test]
fn hidden_objectives_reveal_on_their_condition() {
    let mut hidden = generate_hidden_objectives(0);
    let entities = vec![entity_at(1, 50)];
    let resources = base_resources();
    let mut connections: Vec<Connection> = (0..3)
        .map(|i| Connection {
            from: EntityId(1),
            to: EntityId(10 + i),
            kind: "linked_to".to_string(),
            strength: 0.0,
            evidence: 1,
            revealed: false,
            meta: Some(ConnectionMeta {
                class: ConnectionClass::Criminal,
                base_strength: 0.5,
                activity: 50.0,
                last_activity_ms: 0,
                disrupted: true,
                disrupted_at: Some(0),
                can_reform: false,
                reform_progress: 0.0,
            }),
        })
        .collect();

    let update = update_hidden_objectives(
        &mut hidden,
        &ctx(&entities, &connections, &resources),
        1,
    );
    assert_eq!(update.discovered, [ObjectiveId::new("hidden_network_breaker")]);
    assert_eq!(hidden[3].objective.progress, 30);

    connections.truncate(1);
    let update = update_hidden_objectives(
        &mut hidden,
        &ctx(&entities, &connections, &resources),
        2,
    );
    assert!(update.discovered.is_empty());
    assert!(hidden[3].discovered);
}

#[test]
fn master_investigator_counts_maxed_branches() {
    let mut entities: Vec<Entity> = (1..=2).map(|id| entity_at(id, 50)).collect();
    for entity in &mut entities {
        entity.branches.push(InvestigationBranch {
            path: InvestigationPath::Cyber,
            level: 3,
            unlocked: true,
            evidence: Vec::new(),
            insights: Vec::new(),
        });
    }
    let resources = base_resources();
    let context = ctx(&entities, &[], &resources);
    assert!(discovery_met(
        &DiscoveryCondition::MaxedBranches { min_entities: 2 },
        &context
    ));
    assert!(!discovery_met(
        &DiscoveryCondition::MaxedBranches { min_entities: 3 },
        &context
    ));
}
