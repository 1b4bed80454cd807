//! Step plan: the loop's working state for one run.
//!
//! Holds the user's requirement, the observations folded in from tool
//! results, the ordered step list produced by planning, and a cursor into
//! that list. The rendered form is what the model sees every round.

use std::fmt;

/// Step delimiter the planning prompt asks the model to use.
pub const STEP_DELIMITER: char = '。';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    requirement: String,
    observations: Vec<String>,
    steps: Vec<String>,
    /// `None` until a non-empty plan is set
    cursor: Option<usize>,
}

/// Returned by [`StepPlan::update_step`] for an index outside the plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("计划步骤索引超出范围 (index {index}, {len} steps)")]
pub struct StepIndexOutOfRange {
    pub index: usize,
    pub len: usize,
}

impl StepPlan {
    pub fn new(requirement: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            observations: Vec::new(),
            steps: Vec::new(),
            cursor: None,
        }
    }

    pub fn requirement(&self) -> &str {
        &self.requirement
    }

    pub fn observations(&self) -> &[String] {
        &self.observations
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse a planning reply such as `"查天气。查景点。"`.
    ///
    /// Never fails: text without usable steps yields an empty plan.
    pub fn set_plan_from_text(&mut self, text: &str) {
        let steps = text
            .split(STEP_DELIMITER)
            .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == STEP_DELIMITER))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self.set_steps(steps);
    }

    /// Replace the whole step list and reset the cursor.
    pub fn set_steps(&mut self, steps: Vec<String>) {
        self.cursor = if steps.is_empty() { None } else { Some(0) };
        self.steps = steps;
    }

    pub fn update_step(
        &mut self,
        index: usize,
        step: impl Into<String>,
    ) -> Result<(), StepIndexOutOfRange> {
        let len = self.steps.len();
        let slot = self
            .steps
            .get_mut(index)
            .ok_or(StepIndexOutOfRange { index, len })?;
        *slot = step.into();
        Ok(())
    }

    pub fn current_step(&self) -> Option<&str> {
        self.cursor
            .and_then(|i| self.steps.get(i))
            .map(String::as_str)
    }

    pub fn add_observation(&mut self, text: impl Into<String>) {
        self.observations.push(text.into());
    }

    /// Move to the next step. Returns `false` (and changes nothing) when the
    /// current step is the last one or no plan is set.
    pub fn advance(&mut self) -> bool {
        match self.cursor {
            Some(i) if i + 1 < self.steps.len() => {
                self.cursor = Some(i + 1);
                true
            }
            _ => false,
        }
    }

    /// Context block sent to the model each round.
    pub fn render(&self) -> String {
        let mut out = format!("用户需求：{}\n已有信息：\n", self.requirement);
        if self.observations.is_empty() {
            out.push_str("   （无）\n");
        } else {
            for observation in &self.observations {
                out.push_str("   - ");
                out.push_str(observation);
                out.push('\n');
            }
        }
        out.push_str("下一步操作：");
        out.push_str(self.current_step().unwrap_or("（未设置）"));
        out
    }
}

impl fmt::Display for StepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_from_delimited_text() {
        let mut plan = StepPlan::new("上海天气和景点");
        plan.set_plan_from_text("查天气。查景点。");
        assert_eq!(plan.steps(), ["查天气", "查景点"]);
        assert_eq!(plan.cursor(), Some(0));
        assert_eq!(plan.current_step(), Some("查天气"));
    }

    #[test]
    fn empty_text_gives_empty_plan() {
        let mut plan = StepPlan::new("x");
        plan.set_plan_from_text("");
        assert!(plan.is_empty());
        assert_eq!(plan.cursor(), None);
        assert_eq!(plan.current_step(), None);
    }

    #[test]
    fn whitespace_and_residue_are_dropped() {
        let mut plan = StepPlan::new("x");
        plan.set_plan_from_text("\n 第一步 。。\n\n。  第二步\n。 \t ");
        assert_eq!(plan.steps(), ["第一步", "第二步"]);
        assert!(plan.steps().iter().all(|s| !s.trim().is_empty()));
    }

    #[test]
    fn text_without_delimiter_is_one_step() {
        let mut plan = StepPlan::new("x");
        plan.set_plan_from_text("调用maps_weather查询上海天气");
        assert_eq!(plan.steps().len(), 1);
    }

    #[test]
    fn advance_is_sticky_false_at_the_end() {
        let mut plan = StepPlan::new("x");
        plan.set_steps(vec!["a".into(), "b".into()]);
        assert!(plan.advance());
        assert_eq!(plan.current_step(), Some("b"));
        assert!(!plan.advance());
        assert!(!plan.advance());
        assert_eq!(plan.cursor(), Some(1));

        plan.set_steps(vec!["c".into()]);
        assert_eq!(plan.cursor(), Some(0));
    }

    #[test]
    fn advance_without_plan_is_false() {
        let mut plan = StepPlan::new("x");
        assert!(!plan.advance());
        assert_eq!(plan.cursor(), None);
    }

    #[test]
    fn update_step_bounds() {
        let mut plan = StepPlan::new("x");
        plan.set_steps(vec!["a".into()]);
        plan.update_step(0, "b").unwrap();
        assert_eq!(plan.current_step(), Some("b"));
        let err = plan.update_step(1, "c").unwrap_err();
        assert_eq!(err, StepIndexOutOfRange { index: 1, len: 1 });
    }

    #[test]
    fn render_without_observations() {
        let mut plan = StepPlan::new("上海天气");
        assert_eq!(
            plan.render(),
            "用户需求：上海天气\n已有信息：\n   （无）\n下一步操作：（未设置）"
        );
        plan.set_plan_from_text("查天气。");
        assert!(plan.render().ends_with("下一步操作：查天气"));
    }

    #[test]
    fn render_lists_every_observation_in_order() {
        let mut plan = StepPlan::new("r");
        plan.set_steps(vec!["s".into()]);
        plan.add_observation("上海：晴");
        plan.add_observation("外滩");
        assert_eq!(
            plan.render(),
            "用户需求：r\n已有信息：\n   - 上海：晴\n   - 外滩\n下一步操作：s"
        );
        assert_eq!(plan.to_string(), plan.render());
    }
}
