//! Plan execution against a real workspace with scripted agents.

use std::fs;

use quill::core::plan_state::PlanState;
use quill::core::types::{Edit, MutationRequest};
use quill::engine::{EngineOptions, MutationEngine};
use quill::error::ErrorKind;
use quill::plan::{PlanEvent, PlanRunner};
use quill::test_support::{ScriptedInterpreter, ScriptedPlanner, create};

fn steps(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn second_step_failure_skips_the_third() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut engine = MutationEngine::new(temp.path(), EngineOptions::default()).expect("engine");
    let planner = ScriptedPlanner::new(vec![Ok(steps(&[
        "write the readme",
        "patch the readme",
        "add a changelog",
    ]))]);
    let mut runner = PlanRunner::new();
    let plan_id = runner
        .create_plan(&planner, "document the project", "src/")
        .expect("plan")
        .id;

    let interpreter = ScriptedInterpreter::new(vec![
        Ok(vec![create("README.md", "# Project\n")]),
        Ok(vec![
            MutationRequest::Edit {
                path: "README.md".to_string(),
                edit: Edit::append("More text."),
            },
            MutationRequest::Edit {
                path: "README.md".to_string(),
                edit: Edit::find_replace("Nonexistent", "x"),
            },
            create("never.txt", "x"),
        ]),
        Ok(vec![create("CHANGELOG.md", "")]),
    ]);

    let mut started = Vec::new();
    let run = runner
        .run_plan(plan_id, &interpreter, &mut engine, |event| {
            if let PlanEvent::StepStarted { index, .. } = event {
                started.push(index);
            }
        })
        .expect("run");

    assert_eq!(run.state, PlanState::Failed);
    assert_eq!(run.steps_completed, 1);
    assert_eq!(run.total_steps, 3);
    assert_eq!(started, vec![0, 1]);
    assert_eq!(interpreter.calls(), steps(&["write the readme", "patch the readme"]));

    // Partial results include the failing mutation and stop there.
    assert_eq!(run.results.len(), 3);
    assert!(run.results[1].success);
    assert_eq!(run.results[2].error_kind(), Some(ErrorKind::PatternNotFound));
    let failure = run.failure.expect("failure");
    assert_eq!(failure.step_index, 1);
    assert_eq!(failure.kind, ErrorKind::PatternNotFound);

    // No rollback: step 1 and the first mutation of step 2 stay applied.
    assert_eq!(
        fs::read_to_string(temp.path().join("README.md")).expect("read"),
        "# Project\nMore text."
    );
    assert!(!temp.path().join("never.txt").exists());
    assert!(!temp.path().join("CHANGELOG.md").exists());

    // Explicit undo walks them back.
    engine.undo().expect("undo append");
    engine.undo().expect("undo create");
    assert!(!temp.path().join("README.md").exists());
}

#[test]
fn interpreter_sees_plan_context() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut engine = MutationEngine::new(temp.path(), EngineOptions::default()).expect("engine");
    let mut runner = PlanRunner::new();
    let plan = runner
        .register("tidy", steps(&["a", "b"]), "Cargo.toml", String::new())
        .clone();
    let interpreter = ScriptedInterpreter::new(vec![Ok(Vec::new()), Ok(Vec::new())]);

    let run = runner
        .run_plan(plan.id, &interpreter, &mut engine, |_| {})
        .expect("run");
    assert!(run.succeeded());
    assert!(run.results.is_empty());

    let contexts = interpreter.contexts();
    assert_eq!(contexts.len(), 2);
    assert_eq!(contexts[1].plan_id, plan.id);
    assert_eq!(contexts[1].step_index, 1);
    assert_eq!(contexts[1].total_steps, 2);
    assert_eq!(contexts[1].task, "tidy");
    assert_eq!(contexts[1].context, "Cargo.toml");
}

#[test]
fn sandbox_rejection_fails_the_step() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut engine = MutationEngine::new(temp.path(), EngineOptions::default()).expect("engine");
    let mut runner = PlanRunner::new();
    let id = runner.register("t", steps(&["escape"]), "", String::new()).id;
    let interpreter = ScriptedInterpreter::new(vec![Ok(vec![create("../../etc/owned", "x")])]);

    let run = runner
        .run_plan(id, &interpreter, &mut engine, |_| {})
        .expect("run");
    assert_eq!(run.state, PlanState::Failed);
    assert_eq!(run.steps_completed, 0);
    assert_eq!(
        run.failure.map(|f| f.kind),
        Some(ErrorKind::OutOfWorkspace)
    );
}

#[test]
fn planner_failure_registers_nothing() {
    let planner = ScriptedPlanner::new(vec![Err("rate limited".to_string())]);
    let mut runner = PlanRunner::new();
    let err = runner.create_plan(&planner, "task", "").unwrap_err();
    assert!(format!("{err:#}").contains("rate limited"));
    assert_eq!(runner.plans().count(), 0);
}
