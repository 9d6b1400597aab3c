//! End-to-end pipeline runs over the default lifecycle

use std::sync::Arc;

use slate_core::{LifecycleError, RunParams, RunStage, StageDefinition, StageLifecycle, StageStatus};
use slate_quality::QualityProfile;
use slate_ssr::HookRecord;
use slate_stages::*;

fn params(autopilot: bool) -> RunParams {
    RunParams::new("run-ssr-test", "tenant-test", "https://example.com/listing").autopilot(autopilot)
}

fn pipeline(profile: &QualityProfile, source: Arc<dyn ContentSource>) -> StageLifecycle<PipelineRuntime> {
    let mut lifecycle = StageLifecycle::with_default_lifecycle();
    register_pipeline(&mut lifecycle, profile, source).unwrap();
    lifecycle
}

fn body<'a>(runtime: &'a PipelineRuntime, artifact_type: &str) -> &'a str {
    &runtime
        .artifact(artifact_type)
        .unwrap_or_else(|| panic!("missing artifact {}", artifact_type))
        .body
}

#[tokio::test]
async fn test_full_run_writes_ssr_artifacts_and_passes_gates() {
    let profile = QualityProfile::standard();
    let lifecycle = pipeline(&profile, Arc::new(FixtureSource::default()));
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(4242);

    lifecycle.start(&mut context, &mut runtime).await.unwrap();

    assert_eq!(context.current_stage(), RunStage::Done);
    assert!(context
        .stages()
        .iter()
        .all(|progress| progress.status == StageStatus::Completed));

    let config: serde_json::Value = serde_json::from_str(body(&runtime, "ssr_config")).unwrap();
    assert_eq!(config["embedding_model"], "text-embedding-3-small");
    assert_eq!(config["sets"], 6);
    assert_eq!(config["anchor_sets_version"], "andronoma-sim-v1");

    let responses: Vec<&str> = body(&runtime, "ssr_responses").lines().collect();
    assert!(!responses.is_empty());
    for line in &responses {
        let record: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(record["derived_seed"].as_str().unwrap().len(), 32);
    }

    let thresholds = profile.ssr;
    let csv: Vec<&str> = body(&runtime, "ks_entropy").lines().collect();
    assert_eq!(csv[0], "persona_id,hook_id,ks,entropy");
    assert_eq!(csv.len(), 1 + 4);
    for row in &csv[1..] {
        let cells: Vec<&str> = row.split(',').collect();
        assert!(!cells[0].is_empty() && !cells[1].is_empty());
        assert!(cells[2].parse::<f64>().unwrap() >= thresholds.ks_min);
        assert!(cells[3].parse::<f64>().unwrap() >= thresholds.entropy_min);
    }

    assert!(runtime.artifact("ssr_pmf").is_some());
    assert!(runtime.artifact("separation").is_some());
    assert!(runtime.artifact("failure").is_none());

    let audit = runtime.ssr.as_ref().unwrap();
    assert!(audit.passed());
    assert_eq!(audit.evaluations.len(), 4);
    let total: f64 = audit.aggregate_pmf.iter().sum();
    assert!((total - 1.0).abs() < 1e-5);

    let manifest: serde_json::Value = serde_json::from_str(body(&runtime, "export_manifest")).unwrap();
    assert_eq!(manifest["seed"], 4242);
    assert_eq!(manifest["evaluations"], 4);
}

#[tokio::test]
async fn test_failed_ssr_gate_fails_run_with_audit() {
    let mut profile = QualityProfile::standard();
    profile.ssr.relevance_mean_min = 4.6;
    let lifecycle = pipeline(&profile, Arc::new(FixtureSource::default()));
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(4242);

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();

    let reason = err.handler_reason().unwrap().to_string();
    assert!(reason.starts_with("GATE/ssr:"), "{}", reason);
    assert!(reason.contains("Relevance mean"));
    assert!(matches!(err, LifecycleError::HandlerFailure { stage: RunStage::Ssr, .. }));

    assert_eq!(context.current_stage(), RunStage::Failed);
    assert_eq!(context.status_of(RunStage::Ssr), Some(StageStatus::Failed));
    assert_eq!(context.status_of(RunStage::Qa), Some(StageStatus::Pending));
    assert_eq!(context.status_of(RunStage::Hooks), Some(StageStatus::Completed));

    let failure: serde_json::Value = serde_json::from_str(body(&runtime, "failure")).unwrap();
    assert_eq!(failure["violations"].as_array().unwrap().len(), 4);
    assert!(runtime.artifact("ssr_gates").is_some());
    assert!(runtime.artifact("export_manifest").is_none());
    assert!(!runtime.ssr.as_ref().unwrap().passed());
}

#[tokio::test]
async fn test_one_stale_hook_fails_stage_but_keeps_passing_audit() {
    let fixture = FixtureSource::default();
    let seed_context = pipeline(&QualityProfile::standard(), Arc::new(fixture.clone()))
        .initialize_context(params(false));
    let personas = fixture.personas(&seed_context).unwrap();
    let sharp = fixture.hooks(&seed_context, &personas).unwrap().remove(0);
    let stale = HookRecord {
        hook_id: "hook-stale".to_string(),
        hook_text: "Scheduling software for field crews".to_string(),
        novelty: 0.20,
        min_distance: 0.78,
        ..sharp.clone()
    };
    let source = StaticSource {
        personas,
        hooks: vec![sharp.clone(), stale],
        coverage: 0.9,
    };

    let lifecycle = pipeline(&QualityProfile::standard(), Arc::new(source));
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(4242);

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();
    let reason = err.handler_reason().unwrap().to_string();
    assert!(reason.starts_with("GATE/ssr:"), "{}", reason);
    assert!(reason.contains("hook-stale"));
    assert!(!reason.contains(&sharp.hook_id));
    assert_eq!(context.status_of(RunStage::Ssr), Some(StageStatus::Failed));

    let failure: serde_json::Value = serde_json::from_str(body(&runtime, "failure")).unwrap();
    let violations = failure["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 2);
    assert!(violations
        .iter()
        .all(|v| v.as_str().unwrap().contains(":hook-stale ")));

    let gates: Vec<SsrEvaluation> = serde_json::from_str(body(&runtime, "ssr_gates")).unwrap();
    assert_eq!(gates.len(), 4);
    for evaluation in &gates {
        let is_sharp = evaluation.id.ends_with(&format!(":{}", sharp.hook_id));
        assert_eq!(evaluation.ok, is_sharp, "{} {:?}", evaluation.id, evaluation.reason);
    }
    assert_eq!(runtime.ssr.as_ref().unwrap().failures().count(), 2);
}

#[tokio::test]
async fn test_fast_track_tier_fails_standard_content() {
    let profile = QualityProfile::standard();
    let lifecycle = pipeline(&profile, Arc::new(FixtureSource::default()));
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(4242);
    runtime.fast_track = true;

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();
    assert!(err.handler_reason().unwrap().contains("Fast-track entropy"));
}

#[tokio::test]
async fn test_hook_too_close_to_corpus_fails_hooks_stage() {
    let fixture = FixtureSource::default();
    let scout = pipeline(&QualityProfile::standard(), Arc::new(fixture.clone()));
    let fixture_context = scout.initialize_context(params(false));

    let mut hooks = fixture.hooks(&fixture_context, &[]).unwrap();
    hooks[1].min_distance = 0.9;
    let source = StaticSource {
        personas: fixture.personas(&fixture_context).unwrap(),
        hooks,
        coverage: 0.9,
    };

    let lifecycle = pipeline(&QualityProfile::standard(), Arc::new(source));
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(1);

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();
    assert!(err.handler_reason().unwrap().contains("Hook too similar to existing corpus"));
    assert_eq!(context.status_of(RunStage::Hooks), Some(StageStatus::Failed));
    assert!(runtime.ssr.is_none());
}

#[tokio::test]
async fn test_low_coverage_fails_qa_stage() {
    let lifecycle = pipeline(
        &QualityProfile::standard(),
        Arc::new(FixtureSource { coverage: 0.6 }),
    );
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(9);

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();
    assert_eq!(
        err.handler_reason(),
        Some("GATE/qa: Coverage 0.60 below target 0.8")
    );
    assert_eq!(context.status_of(RunStage::Ssr), Some(StageStatus::Completed));
    assert_eq!(context.status_of(RunStage::Pack), Some(StageStatus::Pending));
    assert_eq!(runtime.coverage, Some(0.6));
    assert!(runtime.artifact("qa_report").is_some());
}

#[tokio::test]
async fn test_pack_refuses_without_ssr_audit() {
    let mut lifecycle = StageLifecycle::new(vec![StageDefinition::new(RunStage::Pack)]).unwrap();
    lifecycle
        .register_handler(RunStage::Pack, PackStage::new(&QualityProfile::standard()))
        .unwrap();
    let mut context = lifecycle.initialize_context(params(false));
    let mut runtime = PipelineRuntime::new(0);

    let err = lifecycle.start(&mut context, &mut runtime).await.unwrap_err();
    assert!(err.handler_reason().unwrap().starts_with("PACK/MISSING_AUDIT"));
}

#[tokio::test]
async fn test_autopilot_run_needs_three_resumes() {
    let lifecycle = pipeline(&QualityProfile::standard(), Arc::new(FixtureSource::default()));
    let mut context = lifecycle.initialize_context(params(true));
    let mut runtime = PipelineRuntime::new(77);

    lifecycle.start(&mut context, &mut runtime).await.unwrap();
    assert_eq!(context.blocked_stage(), Some(RunStage::Segments));
    assert!(runtime.artifact("personas").is_some());

    for gate in [RunStage::Segments, RunStage::Ssr, RunStage::Qa] {
        assert_eq!(context.blocked_stage(), Some(gate));
        lifecycle
            .resume_from_blocked(&mut context, gate, &mut runtime)
            .await
            .unwrap();
    }

    assert_eq!(context.current_stage(), RunStage::Done);
    assert!(runtime.artifact("export_manifest").is_some());
}

#[tokio::test]
async fn test_same_seed_reproduces_artifacts() {
    let profile = QualityProfile::standard();
    let mut bodies = Vec::new();
    for _ in 0..2 {
        let lifecycle = pipeline(&profile, Arc::new(FixtureSource::default()));
        let mut context = lifecycle.initialize_context(params(false));
        let mut runtime = PipelineRuntime::new(1234);
        lifecycle.start(&mut context, &mut runtime).await.unwrap();
        bodies.push((
            body(&runtime, "ssr_pmf").to_string(),
            body(&runtime, "ssr_responses").to_string(),
        ));
    }
    assert_eq!(bodies[0], bodies[1]);
}
