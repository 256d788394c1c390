//! Plan registry and fail-fast plan execution.
//!
//! A plan is an immutable, ordered list of step descriptions. Running a plan
//! interprets each step into mutation requests and applies them through the
//! [`MutationEngine`], strictly in order. The first failure (interpreter or
//! mutation) stops the run; mutations from earlier steps stay applied and are
//! recoverable only through explicit undo.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::plan_state::{PlanProgress, PlanState};
use crate::core::types::{MutationResult, PlanId, StepContext};
use crate::engine::MutationEngine;
use crate::error::{EngineError, ErrorKind};
use crate::io::agent::{Planner, StepInterpreter};

/// An immutable plan, retained in memory for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: PlanId,
    pub task: String,
    pub steps: Vec<String>,
    /// Workspace context captured at creation and handed to every step.
    pub context: String,
    /// Raw planner response the steps were extracted from.
    pub planner_output: String,
    pub created_at: DateTime<Utc>,
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// 0-based index of the failing step.
    pub step_index: usize,
    pub kind: ErrorKind,
    pub message: String,
    /// Offending path, when a mutation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StepFailure {
    fn from_interpreter(step_index: usize, err: &anyhow::Error) -> Self {
        let kind = err
            .downcast_ref::<EngineError>()
            .map_or(ErrorKind::InterpreterFailure, EngineError::kind);
        Self {
            step_index,
            kind,
            message: format!("{err:#}"),
            path: None,
        }
    }

    fn from_result(step_index: usize, result: &MutationResult) -> Self {
        let (kind, message) = result.error.as_ref().map_or_else(
            || (ErrorKind::FilesystemFailure, "mutation failed".to_string()),
            |err| (err.kind, err.message.clone()),
        );
        Self {
            step_index,
            kind,
            message,
            path: Some(result.path.clone()),
        }
    }
}

/// Outcome of running a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanRun {
    pub plan_id: PlanId,
    pub state: PlanState,
    pub steps_completed: usize,
    pub total_steps: usize,
    /// Every mutation result produced, in application order, including the failing one.
    pub results: Vec<MutationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl PlanRun {
    pub fn succeeded(&self) -> bool {
        self.state == PlanState::Completed
    }
}

/// Progress notifications emitted while a plan runs.
#[derive(Debug, Clone, Copy)]
pub enum PlanEvent<'a> {
    StepStarted {
        index: usize,
        total: usize,
        step: &'a str,
    },
    MutationApplied {
        index: usize,
        result: &'a MutationResult,
    },
    StepCompleted {
        index: usize,
        mutations: usize,
    },
    StepFailed {
        failure: &'a StepFailure,
    },
}

/// Owns the plan registry and drives plan execution.
#[derive(Debug, Default)]
pub struct PlanRunner {
    plans: BTreeMap<PlanId, Plan>,
    last_id: u64,
}

impl PlanRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the planner for steps and register the resulting plan.
    #[instrument(skip_all)]
    pub fn create_plan<P: Planner + ?Sized>(
        &mut self,
        planner: &P,
        task: &str,
        context: &str,
    ) -> Result<&Plan> {
        let output = planner
            .plan(task, context)
            .with_context(|| format!("plan task {task:?}"))?;
        Ok(self.register(task, output.steps, context, output.raw))
    }

    /// Register a plan from already-known steps.
    pub fn register(
        &mut self,
        task: &str,
        steps: Vec<String>,
        context: &str,
        planner_output: String,
    ) -> &Plan {
        let id = self.next_id();
        info!(plan = %id, steps = steps.len(), "registered plan");
        let plan = Plan {
            id,
            task: task.to_string(),
            steps,
            context: context.to_string(),
            planner_output,
            created_at: Utc::now(),
        };
        self.plans.entry(id).or_insert(plan)
    }

    pub fn plan(&self, id: PlanId) -> Option<&Plan> {
        self.plans.get(&id)
    }

    /// Plans in creation order.
    pub fn plans(&self) -> impl Iterator<Item = &Plan> {
        self.plans.values()
    }

    /// Execute a registered plan against `engine`.
    ///
    /// Errors only when `id` is unknown; step failures are reported in the
    /// returned [`PlanRun`].
    pub fn run_plan<I, F>(
        &self,
        id: PlanId,
        interpreter: &I,
        engine: &mut MutationEngine,
        on_event: F,
    ) -> Result<PlanRun>
    where
        I: StepInterpreter + ?Sized,
        F: FnMut(PlanEvent<'_>),
    {
        let plan = self.plan(id).ok_or_else(|| anyhow!("unknown plan {id}"))?;
        execute_plan(plan, interpreter, engine, on_event)
    }

    // Creation timestamps in milliseconds, bumped to stay strictly increasing.
    fn next_id(&mut self) -> PlanId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        PlanId(id)
    }
}

/// Run every step of `plan` in order, stopping at the first failure.
#[instrument(skip_all, fields(plan = %plan.id, steps = plan.steps.len()))]
pub fn execute_plan<I, F>(
    plan: &Plan,
    interpreter: &I,
    engine: &mut MutationEngine,
    mut on_event: F,
) -> Result<PlanRun>
where
    I: StepInterpreter + ?Sized,
    F: FnMut(PlanEvent<'_>),
{
    let total_steps = plan.steps.len();
    let mut progress = PlanProgress::new(total_steps);
    progress.start().map_err(|err| anyhow!(err))?;

    let mut results = Vec::new();
    let mut failure = None;

    while let Some(index) = progress.current_step() {
        let step = &plan.steps[index];
        on_event(PlanEvent::StepStarted {
            index,
            total: total_steps,
            step,
        });
        let context = StepContext {
            plan_id: plan.id,
            step_index: index,
            total_steps,
            task: plan.task.clone(),
            context: plan.context.clone(),
        };

        let requests = match interpreter.interpret(step, &context) {
            Ok(requests) => requests,
            Err(err) => {
                failure = Some(StepFailure::from_interpreter(index, &err));
                break;
            }
        };

        for request in &requests {
            let result = engine.apply(request);
            on_event(PlanEvent::MutationApplied {
                index,
                result: &result,
            });
            if !result.success {
                failure = Some(StepFailure::from_result(index, &result));
            }
            results.push(result);
            if failure.is_some() {
                break;
            }
        }
        if failure.is_some() {
            break;
        }

        progress.complete_step().map_err(|err| anyhow!(err))?;
        on_event(PlanEvent::StepCompleted {
            index,
            mutations: requests.len(),
        });
    }

    match &failure {
        Some(failed) => {
            progress.fail().map_err(|err| anyhow!(err))?;
            warn!(
                step = failed.step_index + 1,
                kind = failed.kind.as_str(),
                completed = progress.steps_completed(),
                "plan failed"
            );
            on_event(PlanEvent::StepFailed { failure: failed });
        }
        None => {
            progress.finish().map_err(|err| anyhow!(err))?;
            info!(completed = progress.steps_completed(), "plan completed");
        }
    }

    Ok(PlanRun {
        plan_id: plan.id,
        state: progress.state(),
        steps_completed: progress.steps_completed(),
        total_steps,
        results,
        failure,
    })
}
