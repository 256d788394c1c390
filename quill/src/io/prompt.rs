//! Prompt rendering for the planner and step interpreter agents.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::types::StepContext;

const PLANNER_TEMPLATE: &str = include_str!("../prompts/planner.md");
const INTERPRETER_TEMPLATE: &str = include_str!("../prompts/interpreter.md");

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("interpreter", INTERPRETER_TEMPLATE)
            .expect("interpreter template should be valid");
        Self { env }
    }

    pub fn render_planner(&self, task: &str, workspace_context: &str) -> Result<String> {
        let template = self.env.get_template("planner")?;
        let rendered = template.render(context! {
            task => task.trim(),
            context => (!workspace_context.trim().is_empty()).then(|| workspace_context.trim()),
        })?;
        Ok(rendered)
    }

    pub fn render_interpreter(&self, step: &str, ctx: &StepContext) -> Result<String> {
        let template = self.env.get_template("interpreter")?;
        let rendered = template.render(context! {
            step => step.trim(),
            step_number => ctx.step_index + 1,
            total_steps => ctx.total_steps,
            plan_id => ctx.plan_id.to_string(),
            task => ctx.task.trim(),
            context => (!ctx.context.trim().is_empty()).then(|| ctx.context.trim()),
        })?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlanId;

    #[test]
    fn planner_prompt_includes_task_and_optional_context() {
        let engine = PromptEngine::new();
        let with_context = engine
            .render_planner("add a README", "src/\nCargo.toml")
            .expect("render");
        assert!(with_context.contains("add a README"));
        assert!(with_context.contains("Workspace context:\nsrc/"));

        let without = engine.render_planner("add a README", "  ").expect("render");
        assert!(!without.contains("Workspace context"));
    }

    #[test]
    fn interpreter_prompt_numbers_steps_from_one() {
        let engine = PromptEngine::new();
        let ctx = StepContext {
            plan_id: PlanId(7),
            step_index: 1,
            total_steps: 3,
            task: "scaffold docs".to_string(),
            context: String::new(),
        };
        let rendered = engine
            .render_interpreter("create docs/index.md", &ctx)
            .expect("render");
        assert!(rendered.contains("step 2 of 3 in plan plan-7"));
        assert!(rendered.contains("create docs/index.md"));
    }
}
