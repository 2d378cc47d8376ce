//! Tree tester and debug engine against shared fixtures

use arbor_harness::debug::{HealthStatus, IsolationMethod, Strategy};
use arbor_harness::tree::CheckStatus;
use arbor_harness::{
    DebugEngine, DebugOptions, FailureContext, FailureType, Measurements, ProbeMode, ProbeRunner,
    TreeFailure, TreeStage, TreeTestOptions, TreeTester,
};
use arbor_test_utils::{flat_spec, spec_from_yaml, ScriptedProbe, AUTH_SPEC};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn tester(probe: ScriptedProbe) -> (TreeTester, Arc<ScriptedProbe>) {
    let probe = Arc::new(probe);
    (TreeTester::new(ProbeRunner::new(probe.clone())), probe)
}

#[tokio::test]
async fn clean_tree_scores_full_quality() {
    let spec = spec_from_yaml(AUTH_SPEC);
    let (tester, probe) = tester(ScriptedProbe::new().measure(
        "token_issuer",
        Measurements {
            latency_ms: Some(30.0),
            ..Measurements::default()
        },
    ));

    let results = tester.run(&spec, &TreeTestOptions::default()).await.unwrap();

    assert_eq!(results.summary.total_nodes, 5);
    assert_eq!(results.summary.depth, 2);
    assert_eq!(results.coverage.passed, 5);
    assert!(results.mocks.is_empty());
    assert!(results.isolations.is_empty());
    assert_eq!(results.performance.checks.len(), 1);
    assert_eq!(results.performance.checks[0].status, CheckStatus::Passed);
    assert!((results.quality_score - 100.0).abs() < 1e-9);

    // Level order: root, then both children, then grandchildren
    let order: Vec<String> = probe.calls().into_iter().map(|(id, _)| id).collect();
    assert_eq!(order[0], "auth");
    let mut deepest = order[3..].to_vec();
    deepest.sort();
    assert_eq!(deepest, ["session_cache", "session_reaper"]);
}

#[tokio::test]
async fn eleven_of_twelve_passing_proceeds() {
    let spec = spec_from_yaml(&flat_spec("svc", 11));
    let (tester, _) = tester(ScriptedProbe::new().fail("svc_c3", "database not found"));

    let results = tester.run(&spec, &TreeTestOptions::default()).await.unwrap();

    assert_eq!(results.coverage.tested, 12);
    assert_eq!(results.coverage.passed, 11);
    assert!((results.coverage.coverage - 11.0 / 12.0).abs() < 1e-9);
    assert_eq!(results.isolations.len(), 1);
    assert_eq!(results.isolations[0].failure_type, FailureType::Dependency);
    assert!(results.mocks[0].mock_test_passed);
}

#[tokio::test]
async fn one_failure_in_five_exceeds_ceiling() {
    let spec = spec_from_yaml(AUTH_SPEC);
    let (tester, _) = tester(ScriptedProbe::new().fail("session_reaper", "crashed"));

    let err = tester
        .run(&spec, &TreeTestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.stage, TreeStage::BreadthFirst);
    assert!(matches!(err.failure, TreeFailure::ExcessiveFailureRate { failed: 1, tested: 5, .. }));
    assert_eq!(err.partial.summary.as_ref().unwrap().total_nodes, 5);
}

#[tokio::test]
async fn latency_bound_exceeded() {
    let spec = spec_from_yaml(AUTH_SPEC);
    let (tester, _) = tester(ScriptedProbe::new().measure(
        "token_issuer",
        Measurements {
            latency_ms: Some(80.0),
            ..Measurements::default()
        },
    ));

    let err = tester
        .run(&spec, &TreeTestOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.stage, TreeStage::Performance);
    let violation = err.partial.performance.as_ref().unwrap().violations().next().cloned();
    assert_eq!(violation.unwrap().component_id, "token_issuer");
}

#[tokio::test(start_paused = true)]
async fn hanging_component_is_a_timeout_failure() {
    let spec = spec_from_yaml(AUTH_SPEC);
    let probe = Arc::new(ScriptedProbe::new().delay("session_reaper", Duration::from_secs(30)));
    let tester =
        TreeTester::new(ProbeRunner::new(probe).with_timeout(Duration::from_millis(100)));
    let options = TreeTestOptions {
        max_failure_rate: 0.5,
        ..TreeTestOptions::default()
    };

    let results = tester.run(&spec, &options).await.unwrap();
    let iso = &results.isolations[0];
    assert_eq!(iso.minimal_failing_unit, "session_reaper");
    assert_eq!(iso.failure_type, FailureType::Timeout);
    // start and stop are both mockable
    assert!((results.mocks[0].mock_coverage - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn hybrid_debug_falls_back_to_breadth_first() {
    let spec = spec_from_yaml(AUTH_SPEC);
    let probe = Arc::new(ScriptedProbe::new().fail_in(
        "session_cache",
        "get_session",
        "session table permission denied",
    ));
    let engine = DebugEngine::new(ProbeRunner::new(probe.clone()));

    let results = engine
        .run(
            "session_lookup_denied",
            &FailureContext::new("permission denied reading sessions"),
            &spec,
            &DebugOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.classification.failure_type, FailureType::Permission);
    assert_eq!(results.classification.strategy, Strategy::Hybrid);
    assert_eq!(results.isolation.method, IsolationMethod::BreadthFirst);
    assert_eq!(results.isolation.path, ["auth", "session_manager", "session_cache"]);
    assert!(results.root_cause.dependency_health.is_empty());
    assert!(results.mock_validation.hypothesis_confirmed);
    assert!(results.mock_validation.gaps.is_empty());
    assert!(probe
        .calls()
        .iter()
        .any(|(id, mode)| id == "session_manager" && *mode == ProbeMode::Regression));
}

#[tokio::test]
async fn debug_reports_unhealthy_dependency() {
    let yaml = r"
id: billing
name: Billing
version: '1'
children:
  - id: invoicer
    name: Invoicer
    metadata:
      dependencies: [ledger]
  - id: ledger
    name: Ledger
";
    let spec = spec_from_yaml(yaml);
    let probe = ScriptedProbe::new()
        .fail("invoicer", "ledger not found")
        .fail("ledger", "disk full");
    let engine = DebugEngine::new(ProbeRunner::new(Arc::new(probe)));

    let results = engine
        .run(
            "invoice_run",
            &FailureContext::new("ledger not found").with_component("invoicer"),
            &spec,
            &DebugOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.isolation.method, IsolationMethod::ContextHint);
    assert_eq!(
        results.root_cause.dependency_health[0].status,
        HealthStatus::Unhealthy
    );
    assert!(results
        .remediation
        .immediate()
        .any(|s| s.action.contains("ledger")));
}
