//! Test-only doubles for the planner and step interpreter seams.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::types::{MutationRequest, StepContext};
use crate::io::agent::{Planner, PlannerOutput, StepInterpreter};

/// Interpreter that replays scripted responses, one per call.
///
/// An `Err(message)` entry becomes an interpreter failure. Calls past the end
/// of the script fail.
pub struct ScriptedInterpreter {
    responses: RefCell<VecDeque<Result<Vec<MutationRequest>, String>>>,
    calls: RefCell<Vec<(String, StepContext)>>,
}

impl ScriptedInterpreter {
    pub fn new(responses: Vec<Result<Vec<MutationRequest>, String>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Step texts received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(step, _)| step.clone()).collect()
    }

    pub fn contexts(&self) -> Vec<StepContext> {
        self.calls.borrow().iter().map(|(_, ctx)| ctx.clone()).collect()
    }
}

impl StepInterpreter for ScriptedInterpreter {
    fn interpret(&self, step: &str, context: &StepContext) -> Result<Vec<MutationRequest>> {
        self.calls
            .borrow_mut()
            .push((step.to_string(), context.clone()));
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(requests)) => Ok(requests),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted interpreter exhausted at {step:?}")),
        }
    }
}

/// Planner that replays scripted step lists; the raw output is the steps joined by newlines.
pub struct ScriptedPlanner {
    responses: RefCell<VecDeque<Result<Vec<String>, String>>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedPlanner {
    pub fn new(responses: Vec<Result<Vec<String>, String>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Tasks received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl Planner for ScriptedPlanner {
    fn plan(&self, task: &str, _workspace_context: &str) -> Result<PlannerOutput> {
        self.calls.borrow_mut().push(task.to_string());
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(steps)) => Ok(PlannerOutput {
                raw: steps.join("\n"),
                steps,
            }),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted planner exhausted")),
        }
    }
}

/// A create request that refuses to overwrite.
pub fn create(path: &str, content: &str) -> MutationRequest {
    MutationRequest::Create {
        path: path.to_string(),
        content: content.to_string(),
        overwrite: false,
    }
}
