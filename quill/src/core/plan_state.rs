//! Plan execution state machine: `Idle -> Running -> {Completed, Failed}`.
//!
//! Transitions are validated here so the runner cannot skip a step, complete
//! early, or resume after a terminal state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl PlanState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanState::Completed | PlanState::Failed)
    }
}

/// Progress through a plan of `total_steps` steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanProgress {
    state: PlanState,
    total_steps: usize,
    completed: usize,
}

impl PlanProgress {
    pub fn new(total_steps: usize) -> Self {
        Self {
            state: PlanState::Idle,
            total_steps,
            completed: 0,
        }
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn steps_completed(&self) -> usize {
        self.completed
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Index of the step to run next, while running.
    pub fn current_step(&self) -> Option<usize> {
        (self.state == PlanState::Running && self.completed < self.total_steps)
            .then_some(self.completed)
    }

    pub fn start(&mut self) -> Result<(), String> {
        if self.state != PlanState::Idle {
            return Err(format!("cannot start plan in state {:?}", self.state));
        }
        self.state = PlanState::Running;
        Ok(())
    }

    /// Mark the current step complete.
    pub fn complete_step(&mut self) -> Result<(), String> {
        if self.current_step().is_none() {
            return Err(format!(
                "no step to complete (state {:?}, {}/{})",
                self.state, self.completed, self.total_steps
            ));
        }
        self.completed += 1;
        Ok(())
    }

    /// Transition to `Completed`; only valid once every step is complete.
    pub fn finish(&mut self) -> Result<(), String> {
        if self.state != PlanState::Running {
            return Err(format!("cannot finish plan in state {:?}", self.state));
        }
        if self.completed != self.total_steps {
            return Err(format!(
                "cannot finish plan with {}/{} steps completed",
                self.completed, self.total_steps
            ));
        }
        self.state = PlanState::Completed;
        Ok(())
    }

    pub fn fail(&mut self) -> Result<(), String> {
        if self.state != PlanState::Running {
            return Err(format!("cannot fail plan in state {:?}", self.state));
        }
        self.state = PlanState::Failed;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_to_completion() {
        let mut progress = PlanProgress::new(2);
        assert_eq!(progress.state(), PlanState::Idle);
        progress.start().expect("start");
        assert_eq!(progress.current_step(), Some(0));
        progress.complete_step().expect("step 0");
        progress.complete_step().expect("step 1");
        assert_eq!(progress.current_step(), None);
        progress.finish().expect("finish");
        assert_eq!(progress.state(), PlanState::Completed);
        assert!(progress.state().is_terminal());
    }

    #[test]
    fn cannot_finish_early() {
        let mut progress = PlanProgress::new(3);
        progress.start().expect("start");
        progress.complete_step().expect("step 0");
        assert!(progress.finish().is_err());
        assert_eq!(progress.state(), PlanState::Running);
    }

    #[test]
    fn failure_keeps_completed_count() {
        let mut progress = PlanProgress::new(3);
        progress.start().expect("start");
        progress.complete_step().expect("step 0");
        progress.fail().expect("fail");
        assert_eq!(progress.state(), PlanState::Failed);
        assert_eq!(progress.steps_completed(), 1);
        assert!(progress.complete_step().is_err());
        assert!(progress.start().is_err());
    }

    #[test]
    fn empty_plan_completes_immediately() {
        let mut progress = PlanProgress::new(0);
        progress.start().expect("start");
        assert_eq!(progress.current_step(), None);
        progress.finish().expect("finish");
    }
}
