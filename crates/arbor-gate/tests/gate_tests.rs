//! End-to-end gate decisions

use arbor_gate::{
    Conflict, GateOptions, GateStage, IntegrationGate, IntegrationRules, Rejection, Violation,
};
use arbor_graph::{build_graph, DependencyGraph};
use arbor_harness::ProbeRunner;
use arbor_spec::Specification;
use arbor_test_utils::{flat_spec, minimal_spec, spec_from_yaml, ScriptedProbe, AUTH_SPEC};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn gate(probe: ScriptedProbe) -> IntegrationGate {
    IntegrationGate::new(ProbeRunner::new(Arc::new(probe)))
}

fn users_graph() -> DependencyGraph {
    let users = spec_from_yaml(
        "id: users\nname: Users\nversion: '1'\ndescription: Users\nchildren:\n  - id: user_store\n    name: User Store\n    description: Accounts\n",
    );
    build_graph([&users])
}

async fn analyze(candidate: &Specification, graph: &DependencyGraph) -> Result<arbor_gate::Approval, Rejection> {
    gate(ScriptedProbe::new())
        .analyze(
            candidate,
            &GateOptions::default(),
            graph,
            &IntegrationRules::default(),
        )
        .await
}

#[tokio::test]
async fn approves_and_is_idempotent() {
    let candidate = spec_from_yaml(AUTH_SPEC);
    let graph = users_graph();

    let first = analyze(&candidate, &graph).await.unwrap();
    let second = analyze(&candidate, &graph).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.tested_leaves, 3);
    assert!((first.quality_score - 100.0).abs() < f64::EPSILON);
    assert!((first.coverage - 100.0).abs() < f64::EPSILON);
    assert!(first
        .recommendations
        .iter()
        .any(|r| r.contains("session_cache")));
}

#[tokio::test]
async fn unresolved_dependency_rejects_first_stage() {
    let candidate = spec_from_yaml(AUTH_SPEC);
    let err = analyze(&candidate, &DependencyGraph::default()).await.unwrap_err();

    assert_eq!(err.stage, GateStage::SpecValidation);
    assert_eq!(
        err.violations,
        [Violation::UnresolvedDependencies(vec!["user_store".into()])]
    );
    assert_eq!(err.checklist, GateStage::SpecValidation.checklist());
}

#[tokio::test]
async fn extra_required_field() {
    let candidate = spec_from_yaml(&minimal_spec("solo"));
    let rules = IntegrationRules::default().with_required_field("owner");
    let err = gate(ScriptedProbe::new())
        .analyze(&candidate, &GateOptions::default(), &DependencyGraph::default(), &rules)
        .await
        .unwrap_err();
    assert_eq!(
        err.violations,
        [Violation::MissingRequiredFields(vec!["owner".into()])]
    );
}

#[tokio::test]
async fn failing_leaf_rejects() {
    let candidate = spec_from_yaml(AUTH_SPEC);
    let err = gate(ScriptedProbe::new().fail("session_reaper", "crash on start"))
        .analyze(
            &candidate,
            &GateOptions::default(),
            &users_graph(),
            &IntegrationRules::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.stage, GateStage::HierarchicalTesting);
    let Violation::LeafTestsFailed(failures) = &err.violations[0] else {
        panic!("unexpected violation {:?}", err.violations[0]);
    };
    assert_eq!(failures[0].component_id, "session_reaper");
    assert_eq!(failures[0].message, "crash on start");
}

#[tokio::test]
async fn declared_coverage_below_threshold_rejects() {
    let candidate = spec_from_yaml(&format!("{AUTH_SPEC}testing:\n  coverage: 90\n"));
    let err = analyze(&candidate, &users_graph()).await.unwrap_err();

    assert_eq!(err.stage, GateStage::QualityGates);
    assert_eq!(
        err.violations,
        [Violation::InsufficientCoverage {
            coverage: 90.0,
            min: 95.0
        }]
    );
}

#[tokio::test]
async fn relaxed_rules_cannot_lower_the_coverage_floor() {
    let candidate = spec_from_yaml(&format!("{AUTH_SPEC}testing:\n  coverage: 94.9\n"));
    let err = gate(ScriptedProbe::new())
        .analyze(
            &candidate,
            &GateOptions::default(),
            &users_graph(),
            &IntegrationRules::default().with_min_coverage(50.0),
        )
        .await
        .unwrap_err();

    assert_eq!(err.stage, GateStage::QualityGates);
    assert_eq!(
        err.violations,
        [Violation::InsufficientCoverage {
            coverage: 94.9,
            min: 95.0
        }]
    );
}

#[tokio::test]
async fn exactly_ninety_five_percent_is_admitted() {
    let candidate = spec_from_yaml(&format!("{AUTH_SPEC}testing:\n  coverage: 95\n"));
    let approval = analyze(&candidate, &users_graph()).await.unwrap();
    assert!((approval.coverage - 95.0).abs() < f64::EPSILON);
    assert!((approval.quality_score - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn skipped_leaf_lowers_quality() {
    let yaml = format!("{}    testing:\n      skip: true\n", flat_spec("big", 20));
    let candidate = spec_from_yaml(&yaml);
    let approval = analyze(&candidate, &DependencyGraph::default()).await.unwrap();

    assert_eq!(approval.skipped_leaves, ["big_c20"]);
    assert_eq!(approval.tested_leaves, 19);
    assert!((approval.coverage - 95.0).abs() < 1e-9);
    assert!((approval.quality_score - 95.0).abs() < 1e-9);
}

#[tokio::test]
async fn undocumented_and_insecure_candidate() {
    let candidate = spec_from_yaml(
        "id: leaky\nname: Leaky\nversion: '1'\nmetadata:\n  api_key: abcd1234efgh\n",
    );
    let err = analyze(&candidate, &DependencyGraph::default()).await.unwrap_err();

    assert_eq!(err.stage, GateStage::QualityGates);
    assert!(err
        .violations
        .contains(&Violation::MissingDocumentation(vec!["leaky".into()])));
    assert!(err
        .violations
        .iter()
        .any(|v| matches!(v, Violation::SecurityFindings(f) if f[0].rule_id == "hardcoded_credential")));
}

#[tokio::test]
async fn id_collision_with_running_system() {
    let candidate = spec_from_yaml(
        "id: shadow\nname: Shadow\nversion: '1'\ndescription: Shadow\nchildren:\n  - id: user_store\n    name: Duplicate\n    description: Duplicate store\n",
    );
    let err = analyze(&candidate, &users_graph()).await.unwrap_err();

    assert_eq!(err.stage, GateStage::Compatibility);
    assert_eq!(
        err.violations,
        [Violation::Conflict(Conflict::IdCollision {
            id: "user_store".into(),
            existing_spec: "users".into()
        })]
    );
}
